//! # Composable Rust Testing
//!
//! Shared test doubles for every service in this platform: a deterministic
//! [`mocks::FixedClock`], and an in-memory [`mocks::InMemoryEventBus`] so
//! command-handler and reconciler tests can assert on published events
//! without a broker. Per-aggregate repository fakes live next to their
//! trait definitions in each service's own `repository` module instead of
//! here, since their shape is aggregate-specific.
//!
//! ## Example
//!
//! ```
//! use composable_rust_testing::test_clock;
//! use composable_rust_core::environment::Clock;
//!
//! let clock = test_clock();
//! let now = clock.now();
//! assert_eq!(now.to_rfc3339(), "2025-01-01T00:00:00+00:00");
//! ```

use chrono::{DateTime, Utc};
use composable_rust_core::environment::Clock;

/// Mock implementations of core traits shared across every service's tests.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use composable_rust_core::event_bus::{EventBus, EventBusError, EventStream};
    use composable_rust_core::event::SerializedEvent;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_rust_testing::mocks::FixedClock;
    /// use composable_rust_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// In-memory [`EventBus`] that records every published event instead of
    /// delivering it anywhere. Lets command-handler and reconciler tests
    /// assert on "was this event published" without a Redpanda broker.
    ///
    /// `subscribe` always errors: nothing in this platform consumes its own
    /// published events in-process, so no test needs it to work.
    #[derive(Debug, Default)]
    pub struct InMemoryEventBus {
        published: Mutex<Vec<(String, SerializedEvent)>>,
    }

    impl InMemoryEventBus {
        /// Create an empty event bus.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of every event published so far, oldest first.
        ///
        /// # Panics
        ///
        /// Panics if the internal mutex is poisoned (a prior publish panicked
        /// while holding the lock), which should never happen in practice.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn published(&self) -> Vec<(String, SerializedEvent)> {
            self.published.lock().expect("mutex should not be poisoned").clone()
        }
    }

    impl EventBus for InMemoryEventBus {
        fn publish(
            &self,
            topic: &str,
            event: &SerializedEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
            let topic = topic.to_string();
            let event = event.clone();
            Box::pin(async move {
                self.published
                    .lock()
                    .map_err(|_| EventBusError::Other("mutex poisoned".into()))?
                    .push((topic, event));
                Ok(())
            })
        }

        fn subscribe(
            &self,
            _topics: &[&str],
        ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
            Box::pin(async move {
                Err(EventBusError::Other(
                    "InMemoryEventBus does not support subscribe".into(),
                ))
            })
        }
    }
}

/// Assertion helpers shared across every service's handler tests.
pub mod helpers {
    use composable_rust_core::pagination::Paginated;
    use std::fmt::Debug;

    /// Assert a [`Paginated`] page has exactly `expected_total` items total
    /// and that its `items` matches `expected_items` in order. Panics with
    /// a diff-friendly message on mismatch, which is what a test assertion
    /// failure should read like.
    ///
    /// # Panics
    ///
    /// Panics (via `assert_eq!`) if either the total or the items differ
    /// from what was expected.
    pub fn assert_page<T: PartialEq + Debug>(page: &Paginated<T>, expected_total: i64, expected_items: &[T]) {
        assert_eq!(page.total, expected_total, "page total mismatch");
        assert_eq!(page.items, expected_items, "page items mismatch");
    }
}

/// proptest strategies for domain inputs shared across services, in
/// particular the fuzzy-match engine's free-text inputs (spec §5.8).
pub mod properties {
    use proptest::prelude::*;

    /// A short, printable-ASCII string standing in for a catalog item name
    /// or receipt line, for property tests of the fuzzy-match scorer that
    /// don't care about the specific text, only that scoring is symmetric
    /// and bounded.
    pub fn catalog_name() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{1,40}"
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, InMemoryEventBus};

#[cfg(test)]
mod tests {
    use super::*;
    use composable_rust_core::event::{Event, SerializedEvent};
    use composable_rust_core::event_bus::EventBus;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct Probe;
    impl Event for Probe {
        fn event_type(&self) -> &'static str {
            "Probe.v1"
        }
    }

    #[tokio::test]
    #[allow(clippy::expect_used)] // Panics: test will fail if serialization fails
    async fn in_memory_event_bus_records_published_events() {
        let bus = InMemoryEventBus::new();
        let event = SerializedEvent::from_event(&Probe, None).expect("serialization should succeed");
        bus.publish("probe.created", &event)
            .await
            .expect("publish should succeed");

        let published = bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "probe.created");
    }
}
