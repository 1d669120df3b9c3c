//! Dependency-injection traits for time.
//!
//! All external dependencies handlers need (repositories, the event
//! publisher, HTTP clients) are injected directly as constructor
//! arguments on each service's handler structs; [`Clock`] is the one
//! dependency that is shared platform-wide and worth a trait, since
//! reconcilers and expiry checks must be deterministically testable.

use chrono::{DateTime, Utc};

/// Abstracts time so expiry/cooldown logic is deterministic in tests.
///
/// # Examples
///
/// ```
/// use composable_rust_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let now = clock.now();
/// assert!(now.timestamp() > 0);
/// ```
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
