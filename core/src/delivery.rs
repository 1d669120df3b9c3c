//! Delivery state machine (spec §4.6): the reusable webhook-style retry
//! machinery backing the **delivery retry loop** reconciler.
//!
//! States: `Pending → InFlight → {Delivered | FailedRetry | FailedFinal}`,
//! with `FailedRetry` looping back to `InFlight` until `max_attempts` is
//! exhausted. Grounded on the Dead Letter Queue shape from the teacher
//! repository: a DLQ is exactly a ledger of deliveries that have not yet
//! succeeded, just generalized here to also track in-flight attempts
//! rather than only terminal failures.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Current state of a single delivery attempt chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Queued, not yet attempted.
    Pending,
    /// A worker has picked this delivery up and is attempting it now.
    InFlight,
    /// Delivered successfully (receiver returned 2xx). Terminal.
    Delivered,
    /// The last attempt failed retryably and another attempt is scheduled.
    FailedRetry,
    /// Permanently failed: either a non-retryable response, or
    /// `attempt_count >= max_attempts`. Terminal.
    FailedFinal,
}

impl DeliveryStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Delivered => "delivered",
            Self::FailedRetry => "failed_retry",
            Self::FailedFinal => "failed_final",
        }
    }

    /// Parse from the database string representation.
    ///
    /// # Errors
    ///
    /// Returns an error message if `s` does not match a known status.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_flight" => Ok(Self::InFlight),
            "delivered" => Ok(Self::Delivered),
            "failed_retry" => Ok(Self::FailedRetry),
            "failed_final" => Ok(Self::FailedFinal),
            other => Err(format!("invalid delivery status: {other}")),
        }
    }

    /// `true` once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::FailedFinal)
    }
}

/// One outbound delivery and its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Opaque delivery id.
    pub id: String,
    /// Where the payload is delivered to.
    pub target_url: String,
    /// Opaque payload bytes (already serialized by the caller).
    pub payload: Vec<u8>,
    /// Current lifecycle state.
    pub status: DeliveryStatus,
    /// Number of attempts made so far.
    pub attempt_count: u32,
    /// Attempts beyond this count move to `FailedFinal` instead of being
    /// rescheduled.
    pub max_attempts: u32,
    /// When the retry loop should next pick this delivery up. Only
    /// meaningful while `status == FailedRetry`.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// When this delivery was first queued.
    pub created_at: DateTime<Utc>,
    /// When this delivery's status last changed.
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Queue a new delivery.
    #[must_use]
    pub fn new(target_url: String, payload: Vec<u8>, max_attempts: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: crate::model::new_id(),
            target_url,
            payload,
            status: DeliveryStatus::Pending,
            attempt_count: 0,
            max_attempts,
            next_attempt_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition: worker picks up a pending or due failed-retry delivery.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.status = DeliveryStatus::InFlight;
        self.attempt_count += 1;
        self.updated_at = now;
    }

    /// Transition: receiver returned 2xx.
    pub fn mark_delivered(&mut self, now: DateTime<Utc>) {
        self.status = DeliveryStatus::Delivered;
        self.next_attempt_at = None;
        self.updated_at = now;
    }

    /// Transition: receiver returned a non-retryable 4xx.
    pub fn mark_failed_final(&mut self, now: DateTime<Utc>) {
        self.status = DeliveryStatus::FailedFinal;
        self.next_attempt_at = None;
        self.updated_at = now;
    }

    /// Transition: receiver returned 5xx/timeout. Schedules the next
    /// attempt using `backoff`, or moves to `FailedFinal` if
    /// `max_attempts` has been exhausted.
    pub fn mark_failed_retry(&mut self, backoff: Duration, now: DateTime<Utc>) {
        if self.attempt_count >= self.max_attempts {
            self.mark_failed_final(now);
            return;
        }
        self.status = DeliveryStatus::FailedRetry;
        self.next_attempt_at = Some(now + backoff);
        self.updated_at = now;
    }

    /// `true` if the retry loop should pick this delivery up now.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            DeliveryStatus::Pending => true,
            DeliveryStatus::FailedRetry => self.next_attempt_at.is_some_and(|at| at <= now),
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn status_round_trips_through_string() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::InFlight,
            DeliveryStatus::Delivered,
            DeliveryStatus::FailedRetry,
            DeliveryStatus::FailedFinal,
        ] {
            assert_eq!(DeliveryStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn pending_delivery_is_due_immediately() {
        let delivery = Delivery::new("https://x".into(), vec![], 5, now());
        assert!(delivery.is_due(now()));
    }

    #[test]
    fn failed_retry_exhausting_max_attempts_goes_final() {
        let mut delivery = Delivery::new("https://x".into(), vec![], 2, now());
        delivery.begin_attempt(now());
        delivery.mark_failed_retry(Duration::from_secs(1), now());
        assert_eq!(delivery.status, DeliveryStatus::FailedRetry);

        delivery.begin_attempt(now());
        delivery.mark_failed_retry(Duration::from_secs(1), now());
        assert_eq!(delivery.status, DeliveryStatus::FailedFinal);
        assert!(delivery.next_attempt_at.is_none());
    }

    #[test]
    fn delivered_is_terminal_and_not_due() {
        let mut delivery = Delivery::new("https://x".into(), vec![], 5, now());
        delivery.begin_attempt(now());
        delivery.mark_delivered(now());
        assert!(delivery.status.is_terminal());
        assert!(!delivery.is_due(now()));
    }

    #[test]
    fn failed_retry_not_due_until_scheduled_time() {
        let mut delivery = Delivery::new("https://x".into(), vec![], 5, now());
        delivery.begin_attempt(now());
        delivery.mark_failed_retry(Duration::from_secs(60), now());
        assert!(!delivery.is_due(now()));
        assert!(delivery.is_due(now() + chrono::Duration::seconds(61)));
    }
}
