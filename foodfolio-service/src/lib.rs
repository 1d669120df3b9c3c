//! Household inventory and receipt-matching service: commands, queries,
//! Postgres repositories, the OCR/fuzzy-match pipeline, and a representative
//! HTTP surface (spec §3, §4.2–§4.4, §4.7, §4.9, §6).

#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod events;
pub mod fuzzy;
pub mod handlers;
pub mod model;
pub mod ocr;
pub mod postgres;
pub mod queries;
pub mod repository;
pub mod router;

pub use config::FoodfolioServiceConfig;
pub use model::{Item, ItemDetail, ItemVariant, Receipt, ReceiptItem, Shoppinglist, ShoppinglistItem};
