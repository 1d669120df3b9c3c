//! Background reconciler driver (spec §4.5, §5).
//!
//! Every reconciler (expiration sweeper, stream poller, inactive-stream
//! closer, message-retention cleaner, delivery retry loop) runs on its own
//! ticker inside its own cooperative task, using the same command/query
//! buses as foreground requests, and must be idempotent.

use crate::context::RequestContext;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One sweep's outcome, logged by [`run_periodic`] at the end of every
/// tick (spec §7: "log counts of successes and failures per tick").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Candidates examined this tick.
    pub scanned: u64,
    /// Candidates successfully acted on.
    pub acted: u64,
    /// Candidates that failed and were skipped (spec §7: "Reconcilers
    /// treat per-item failures as skippable and continue the sweep").
    pub failed: u64,
}

impl ReconcileReport {
    /// Merge another report's counters into this one.
    pub fn add(&mut self, other: Self) {
        self.scanned += other.scanned;
        self.acted += other.acted;
        self.failed += other.failed;
    }
}

/// A periodic background sweep.
pub trait Reconciler: Send + Sync {
    /// Human-readable name used in log lines (e.g. `"expired-link-sweeper"`).
    fn name(&self) -> &'static str;

    /// Run one sweep to completion. Must be idempotent: re-running after a
    /// partial failure must converge without duplicating side effects.
    fn tick(
        &self,
        ctx: &RequestContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ReconcileReport> + Send + '_>>;
}

/// Drives a [`Reconciler`] on a fixed interval until `shutdown` fires.
///
/// Spec §5: "Shutdown is graceful: the process signals all reconcilers to
/// stop, waits for their current tick to finish (bounded), then closes the
/// bus." This loop waits for the in-flight tick to return before checking
/// `shutdown` again, giving exactly that behavior when the caller cancels
/// `shutdown` and then awaits this function's returned `JoinHandle`.
pub async fn run_periodic(reconciler: impl Reconciler, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                tracing::info!(reconciler = reconciler.name(), "reconciler shutting down");
                return;
            }
            _ = ticker.tick() => {
                let ctx = RequestContext::for_worker(&shutdown);
                let report = reconciler.tick(&ctx).await;
                tracing::info!(
                    reconciler = reconciler.name(),
                    scanned = report.scanned,
                    acted = report.acted,
                    failed = report.failed,
                    "reconciler tick complete"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct CountingReconciler {
        ticks: Arc<AtomicU64>,
    }

    impl Reconciler for CountingReconciler {
        fn name(&self) -> &'static str {
            "counting-reconciler"
        }

        fn tick(&self, _ctx: &RequestContext) -> Pin<Box<dyn Future<Output = ReconcileReport> + Send + '_>> {
            Box::pin(async move {
                self.ticks.fetch_add(1, Ordering::SeqCst);
                ReconcileReport {
                    scanned: 1,
                    acted: 1,
                    failed: 0,
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_periodic_stops_promptly_on_shutdown() {
        let ticks = Arc::new(AtomicU64::new(0));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_periodic(
            CountingReconciler { ticks: ticks.clone() },
            Duration::from_millis(10),
            shutdown.clone(),
        ));

        tokio::time::advance(Duration::from_millis(35)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn report_add_sums_counters() {
        let mut total = ReconcileReport::default();
        total.add(ReconcileReport { scanned: 3, acted: 2, failed: 1 });
        total.add(ReconcileReport { scanned: 2, acted: 2, failed: 0 });
        assert_eq!(total, ReconcileReport { scanned: 5, acted: 4, failed: 1 });
    }
}
