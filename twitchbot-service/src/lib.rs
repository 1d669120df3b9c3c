//! Chat-ingestion bot service: commands, queries, Postgres repositories,
//! the persistent chat session, three background reconcilers, and a
//! representative HTTP surface (spec §3, §4.4–§4.5, §4.8–§4.9, §6–§7).

#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chat;
pub mod commands;
pub mod config;
pub mod events;
pub mod handlers;
pub mod model;
pub mod platform;
pub mod postgres;
pub mod queries;
pub mod reconcile;
pub mod repository;
pub mod router;

pub use config::{ChatConfig, TwitchbotServiceConfig};
pub use model::{ChannelViewer, ChatCommand, Clip, Message, Stream, Viewer};
