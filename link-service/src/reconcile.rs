//! Expiration sweeper reconciler (spec §4.5): default 1h interval, 1000-row
//! pages, a 10ms pause between deactivations so a large sweep doesn't starve
//! foreground request handling.

use crate::commands::DeactivateExpiredLink;
use crate::repository::ShortLinkRepository;
use composable_rust_core::bus::CommandBus;
use composable_rust_core::context::RequestContext;
use composable_rust_core::pagination::Page;
use composable_rust_core::reconciler::{ReconcileReport, Reconciler};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Page size used by one sweep tick (spec §4.5 default: 1000).
const SWEEP_PAGE_SIZE: i64 = 1000;

/// Pause between individual deactivations within a tick (spec §4.5
/// default: 10ms), so a large backlog doesn't monopolize the command bus.
const SWEEP_ITEM_PAUSE: Duration = Duration::from_millis(10);

/// Deactivates links whose `expires_at` has passed but are still
/// `is_active` (spec §4.5). Dispatches [`DeactivateExpiredLink`] through the
/// command bus rather than writing directly, so the same event-publication
/// path foreground handlers use also fires for sweeper-driven transitions.
pub struct ExpiredLinkSweeper {
    links: Arc<dyn ShortLinkRepository>,
    commands: Arc<CommandBus>,
}

impl ExpiredLinkSweeper {
    /// Build a new sweeper.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>, commands: Arc<CommandBus>) -> Self {
        Self { links, commands }
    }
}

impl Reconciler for ExpiredLinkSweeper {
    fn name(&self) -> &'static str {
        "expired-link-sweeper"
    }

    fn tick(&self, ctx: &RequestContext) -> Pin<Box<dyn Future<Output = ReconcileReport> + Send + '_>> {
        Box::pin(async move {
            let mut report = ReconcileReport::default();

            loop {
                if ctx.check_cancelled().is_err() {
                    break;
                }

                let page = Page::new(0, SWEEP_PAGE_SIZE);
                let expired = match self.links.list_active_page(ctx, page).await {
                    Ok(links) => links,
                    Err(err) => {
                        tracing::warn!(error = %err, "expired-link sweeper failed to list candidates");
                        report.failed += 1;
                        break;
                    }
                };

                if expired.is_empty() {
                    break;
                }

                for link in &expired {
                    report.scanned += 1;
                    let mut cmd = DeactivateExpiredLink { id: link.id.clone() };
                    match self.commands.dispatch(ctx, &mut cmd).await {
                        Ok(()) => report.acted += 1,
                        Err(err) => {
                            tracing::warn!(link_id = %link.id, error = %err, "failed to deactivate expired link");
                            report.failed += 1;
                        }
                    }
                    tokio::time::sleep(SWEEP_ITEM_PAUSE).await;
                }

                let fetched = i64::try_from(expired.len()).unwrap_or(i64::MAX);
                if fetched < SWEEP_PAGE_SIZE {
                    break;
                }
            }

            report
        })
    }
}
