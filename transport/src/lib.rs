//! Axum HTTP integration shared by every service in this platform.
//!
//! This crate bridges the command/query bus in `composable-rust-core` to
//! HTTP: [`error::AppError`] renders [`composable_rust_core::CoreError`] as
//! the status/JSON shape spec'd for every service's API, `extractors` and
//! `middleware` carry request correlation across the stack, and
//! `handlers::health` provides the liveness/readiness endpoints every
//! service mounts under `/health`.
//!
//! Each service defines its own router and `AppState`; this crate has no
//! opinion on either, since the command/query bus and repositories differ
//! by service.
//!
//! # Example
//!
//! ```ignore
//! use composable_rust_transport::{AppError, TransportResult};
//! use axum::{Router, routing::get, Json};
//!
//! async fn handler() -> TransportResult<Json<Data>> {
//!     let data = bus.dispatch(&ctx, &query).await?; // CoreError -> AppError via `?`
//!     Ok(Json(data))
//! }
//!
//! let app = Router::new()
//!     .route("/api/v1/links/:code", get(handler))
//!     .layer(composable_rust_transport::middleware::correlation_id_layer());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::{ClientIp, CorrelationId, UserAgent};
pub use middleware::{correlation_id_layer, CorrelationIdExt, CORRELATION_ID_HEADER};

/// Result type alias for HTTP handlers.
pub type TransportResult<T> = Result<T, AppError>;
