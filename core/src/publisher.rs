//! Event publisher (spec §4.7): typed event → topic mapping, best-effort
//! publish with local logging on failure.

use crate::event::{Event, SerializedEvent};
use crate::event_bus::EventBus;
use serde::Serialize;
use std::sync::Arc;

/// Builds the `<service>.<aggregate>.<verb>` topic string used across the
/// platform (e.g. `link.created`, `twitchbot.stream.started`,
/// `foodfolio.variant.stock.low`).
#[must_use]
pub fn topic_for(service: &str, aggregate: &str, verb: &str) -> String {
    format!("{service}.{aggregate}.{verb}")
}

/// Publishes domain events to the broker, best-effort.
///
/// Spec §4.7: "Publication is best-effort: on broker failure the publisher
/// logs a warning and returns success to the handler; handlers never fail
/// because of a publish failure." This type is the single place that
/// swallows [`crate::event_bus::EventBusError`] so no handler has to.
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    /// Wrap an event bus implementation (e.g. `RedpandaEventBus`, or
    /// `InMemoryEventBus` in tests).
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Publish a single typed event to `topic`, keyed by `aggregate_id`
    /// for partitioning. Stamps `published_at` into the event's metadata.
    ///
    /// Never returns an error: broker failures are logged at `warn!` and
    /// swallowed, per spec §4.7 and §7 ("Broker publish failure is logged
    /// and swallowed in handler paths").
    pub async fn publish<E>(&self, topic: &str, aggregate_id: &str, event: &E)
    where
        E: Event + Serialize,
    {
        let metadata = serde_json::json!({
            "aggregate_id": aggregate_id,
            "published_at": chrono::Utc::now().to_rfc3339(),
        });

        let serialized = match SerializedEvent::from_event(event, Some(metadata)) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%topic, %aggregate_id, error = %err, "failed to serialize event for publish");
                return;
            }
        };

        if let Err(err) = self.bus.publish(topic, &serialized).await {
            tracing::warn!(%topic, %aggregate_id, error = %err, "best-effort event publish failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::event::EventError;
    use crate::event_bus::{EventBusError, EventStream};
    use serde::Deserialize;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    enum FakeEvent {
        Created { id: String },
    }
    impl Event for FakeEvent {
        fn event_type(&self) -> &'static str {
            "Fake.Created.v1"
        }
    }

    #[derive(Default)]
    struct RecordingBus {
        published: Mutex<Vec<(String, SerializedEvent)>>,
    }
    impl EventBus for RecordingBus {
        fn publish(
            &self,
            topic: &str,
            event: &SerializedEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
            let topic = topic.to_string();
            let event = event.clone();
            Box::pin(async move {
                self.published.lock().unwrap().push((topic, event));
                Ok(())
            })
        }
        fn subscribe(
            &self,
            _topics: &[&str],
        ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
            Box::pin(async move { Err(EventBusError::Other("not implemented in test".into())) })
        }
    }

    struct AlwaysFailsBus;
    impl EventBus for AlwaysFailsBus {
        fn publish(
            &self,
            _topic: &str,
            _event: &SerializedEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
            Box::pin(async move {
                Err(EventBusError::PublishFailed {
                    topic: "x".into(),
                    reason: "boom".into(),
                })
            })
        }
        fn subscribe(
            &self,
            _topics: &[&str],
        ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
            Box::pin(async move { Err(EventBusError::Other("not implemented in test".into())) })
        }
    }

    #[test]
    fn topic_naming_follows_service_aggregate_verb() {
        assert_eq!(topic_for("link", "link", "created"), "link.created");
        assert_eq!(
            topic_for("foodfolio", "variant.stock", "low"),
            "foodfolio.variant.stock.low"
        );
    }

    #[tokio::test]
    async fn publish_delivers_event_with_aggregate_id_metadata() {
        let bus = Arc::new(RecordingBus::default());
        let publisher = EventPublisher::new(bus.clone());

        publisher
            .publish(
                "link.created",
                "link-1",
                &FakeEvent::Created {
                    id: "link-1".into(),
                },
            )
            .await;

        let published = bus.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "link.created");
        let metadata = published[0].1.metadata.clone().unwrap();
        assert_eq!(metadata["aggregate_id"], "link-1");
    }

    #[tokio::test]
    async fn publish_never_propagates_broker_failure() {
        let publisher = EventPublisher::new(Arc::new(AlwaysFailsBus));
        // Must not panic or return an error: best-effort delivery.
        publisher
            .publish("link.created", "link-1", &FakeEvent::Created { id: "link-1".into() })
            .await;
    }

    #[allow(dead_code)]
    fn silence_unused_error_variant(_: EventError) {}
}
