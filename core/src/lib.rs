//! # Composable Rust Core
//!
//! Core traits and types for the command/query dispatch spine shared by
//! every service in this platform.
//!
//! ## Core concepts
//!
//! - **Command / Query**: typed payloads dispatched through [`bus::CommandBus`]
//!   / [`bus::QueryBus`] to exactly one registered handler per concrete type.
//! - **`RequestContext`**: the request- or worker-scoped context (identity,
//!   cancellation, trace id) threaded through every handler and reconciler.
//! - **`CoreError`**: the seven-kind error taxonomy every handler reports
//!   through, translated to transport status codes at the edge.
//! - **`Event` / `EventBus` / `EventPublisher`**: domain events, the
//!   broker abstraction they're published through, and the best-effort
//!   publisher that swallows broker failures so handlers never fail on a
//!   publish error.
//! - **`Patch<T>`**: explicit-presence update inputs (unset / set / set-null).
//! - **`Reconciler`**: a background periodic sweep that detects state
//!   transitions foreground handlers did not already apply.
//! - **`Delivery`**: the reusable webhook-style retry state machine backing
//!   the delivery retry loop reconciler.
//!
//! ## Architecture principles
//!
//! - One aggregate, one repository port, one set of command/query handlers.
//! - Handlers never fail because an event failed to publish.
//! - Every aggregate is soft-deleted, never hard-deleted.
//! - Reconcilers are idempotent: re-running after a partial failure must
//!   converge without duplicating side effects.

pub mod bus;
pub mod command;
pub mod config;
pub mod context;
pub mod delivery;
pub mod environment;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod model;
pub mod pagination;
pub mod patch;
pub mod publisher;
pub mod query;
pub mod reconciler;

pub use bus::{CommandBus, QueryBus};
pub use command::{Command, CommandHandler};
pub use context::RequestContext;
pub use error::{CoreError, Result};
pub use event::{Event, EventError, SerializedEvent};
pub use event_bus::{EventBus, EventBusError, EventStream};
pub use pagination::{Page, Paginated};
pub use patch::Patch;
pub use publisher::EventPublisher;
pub use query::{Query, QueryHandler};
pub use reconciler::{ReconcileReport, Reconciler};

// Re-export commonly used third-party types so downstream crates pin one
// version of each through this crate's dependency.
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
