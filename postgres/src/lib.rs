//! `PostgreSQL` infrastructure shared by every service in this platform.
//!
//! Each service owns its own aggregate repositories (e.g.
//! `link_service::postgres::PostgresLinkRepository`), following the same
//! `PgPool` + `sqlx::migrate!` shape this crate establishes. What lives
//! here is the cross-cutting piece every service shares unmodified: the
//! webhook [`DeliveryStore`] backing the delivery retry loop reconciler
//! (spec §4.6).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod delivery;

pub use delivery::{DeliveryStore, DeliveryStoreError};
