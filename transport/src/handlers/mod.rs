//! HTTP request handlers shared across services.
//!
//! Per-domain handlers (links, chat, inventory) live in each service's own
//! crate; this module only holds the liveness/readiness endpoints every
//! service mounts the same way.

pub mod health;

pub use health::{health_check, readiness_check};
