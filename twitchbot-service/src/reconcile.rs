//! Background reconcilers (spec §4.5): stream poller, inactive-stream
//! closer, message-retention cleaner.

use crate::chat::ChannelRegistry;
use crate::commands::{CreateStream, EndStream, UpdateStream};
use crate::platform::PlatformClient;
use crate::repository::{MessageRepository, StreamRepository};
use chrono::Duration as ChronoDuration;
use composable_rust_core::bus::CommandBus;
use composable_rust_core::context::RequestContext;
use composable_rust_core::environment::{Clock, SystemClock};
use composable_rust_core::pagination::Page;
use composable_rust_core::patch::Patch;
use composable_rust_core::reconciler::{ReconcileReport, Reconciler};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Default stream-poller interval (spec §4.5).
pub const STREAM_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Page size used by the inactive-stream closer and the retention cleaner
/// per tick (mirrors `link-service`'s sweep page convention).
const RECONCILE_PAGE_SIZE: i64 = 1000;

/// Pause between per-item command dispatches within a tick, so a large
/// backlog doesn't monopolize the command bus.
const RECONCILE_ITEM_PAUSE: Duration = Duration::from_millis(10);

/// Polls the platform's live-status endpoint for every joined chat channel
/// and reconciles the tracked [`Stream`](crate::model::Stream) aggregate
/// against it (spec §4.5):
///
/// - live, no real stream tracked yet: dispatch [`CreateStream`], attribute
///   the channel's future messages to the new stream id.
/// - live, already tracked: dispatch [`UpdateStream`] with the observed
///   viewer count.
/// - offline, a real stream was tracked: dispatch [`EndStream`], fall the
///   channel's attribution back to the chat-only sentinel.
pub struct StreamPoller {
    channels: Arc<ChannelRegistry>,
    streams: Arc<dyn StreamRepository>,
    platform: Arc<dyn PlatformClient>,
    commands: Arc<CommandBus>,
    access_token: Arc<dyn Fn() -> Pin<Box<dyn Future<Output = String> + Send>> + Send + Sync>,
}

impl StreamPoller {
    /// Build a new poller. `access_token` supplies the current bearer token
    /// on demand (e.g. `TokenManager::current_token`), so a refresh doesn't
    /// require rebuilding the reconciler.
    #[must_use]
    pub fn new(
        channels: Arc<ChannelRegistry>,
        streams: Arc<dyn StreamRepository>,
        platform: Arc<dyn PlatformClient>,
        commands: Arc<CommandBus>,
        access_token: Arc<dyn Fn() -> Pin<Box<dyn Future<Output = String> + Send>> + Send + Sync>,
    ) -> Self {
        Self { channels, streams, platform, commands, access_token }
    }

    async fn reconcile_channel(&self, ctx: &RequestContext, channel: &str, report: &mut ReconcileReport) {
        report.scanned += 1;
        let token = (self.access_token)().await;

        let live = match self.platform.get_stream_status(channel, &token).await {
            Ok(live) => live,
            Err(err) => {
                tracing::warn!(channel, error = %err, "stream poller failed to query platform");
                report.failed += 1;
                return;
            }
        };

        let tracked = match self.streams.get_active_for_channel(ctx, channel).await {
            Ok(tracked) => tracked,
            Err(err) => {
                tracing::warn!(channel, error = %err, "stream poller failed to look up tracked stream");
                report.failed += 1;
                return;
            }
        };

        match (live, tracked) {
            (Some(info), None) => {
                let mut cmd = CreateStream {
                    channel: channel.to_string(),
                    title: info.title,
                    game_name: info.game_name,
                    game_id: info.game_id,
                    initial_viewers: info.viewer_count,
                    ..Default::default()
                };
                match self.commands.dispatch(ctx, &mut cmd).await {
                    Ok(()) => {
                        if let Some(id) = cmd.aggregate_id {
                            self.channels.set_stream_id(channel, &id).await;
                        }
                        report.acted += 1;
                    }
                    Err(err) => {
                        tracing::warn!(channel, error = %err, "failed to create stream");
                        report.failed += 1;
                    }
                }
            }
            (Some(info), Some(stream)) => {
                let mut cmd = UpdateStream {
                    id: stream.id,
                    title: Patch::Set(info.title),
                    game_name: Patch::Set(info.game_name),
                    game_id: Patch::Set(info.game_id),
                    current_viewers: Some(info.viewer_count),
                };
                match self.commands.dispatch(ctx, &mut cmd).await {
                    Ok(()) => report.acted += 1,
                    Err(err) => {
                        tracing::warn!(channel, error = %err, "failed to update stream");
                        report.failed += 1;
                    }
                }
            }
            (None, Some(stream)) => {
                let mut cmd = EndStream { id: stream.id };
                match self.commands.dispatch(ctx, &mut cmd).await {
                    Ok(()) => {
                        self.channels.clear_stream_id(channel).await;
                        report.acted += 1;
                    }
                    Err(err) => {
                        tracing::warn!(channel, error = %err, "failed to end stream");
                        report.failed += 1;
                    }
                }
            }
            (None, None) => {}
        }
    }
}

impl Reconciler for StreamPoller {
    fn name(&self) -> &'static str {
        "stream-poller"
    }

    fn tick(&self, ctx: &RequestContext) -> Pin<Box<dyn Future<Output = ReconcileReport> + Send + '_>> {
        Box::pin(async move {
            let mut report = ReconcileReport::default();
            for channel in self.channels.joined_channels().await {
                if ctx.check_cancelled().is_err() {
                    break;
                }
                self.reconcile_channel(ctx, &channel, &mut report).await;
            }
            report
        })
    }
}

/// Ends streams that have gone quiet past `inactive_timeout` without the
/// poller ever observing the channel go offline (e.g. a missed poll or a
/// platform outage) (spec §4.5).
pub struct InactiveStreamCloser {
    streams: Arc<dyn StreamRepository>,
    messages: Arc<dyn MessageRepository>,
    commands: Arc<CommandBus>,
    inactive_timeout: ChronoDuration,
}

impl InactiveStreamCloser {
    /// Build a new closer. `inactive_timeout` is the quiet period
    /// (spec §4.5 default: 24h) after which a still-`is_active` stream with
    /// no recent chat activity is force-ended.
    #[must_use]
    pub fn new(
        streams: Arc<dyn StreamRepository>,
        messages: Arc<dyn MessageRepository>,
        commands: Arc<CommandBus>,
        inactive_timeout: ChronoDuration,
    ) -> Self {
        Self { streams, messages, commands, inactive_timeout }
    }
}

impl Reconciler for InactiveStreamCloser {
    fn name(&self) -> &'static str {
        "inactive-stream-closer"
    }

    fn tick(&self, ctx: &RequestContext) -> Pin<Box<dyn Future<Output = ReconcileReport> + Send + '_>> {
        Box::pin(async move {
            let mut report = ReconcileReport::default();
            let cutoff = SystemClock.now() - self.inactive_timeout;

            loop {
                if ctx.check_cancelled().is_err() {
                    break;
                }

                let page = Page::new(0, RECONCILE_PAGE_SIZE);
                let stale = match self.streams.list_active_stale(ctx, cutoff, page).await {
                    Ok(streams) => streams,
                    Err(err) => {
                        tracing::warn!(error = %err, "inactive-stream closer failed to list candidates");
                        report.failed += 1;
                        break;
                    }
                };

                if stale.is_empty() {
                    break;
                }

                for stream in &stale {
                    report.scanned += 1;

                    // Double-check: list_active_stale's cutoff is against
                    // messages.last_message_at or started_at; re-verify here
                    // in case a message landed between the list query and now.
                    let last_activity = match self.messages.last_message_at(ctx, &stream.id).await {
                        Ok(instant) => instant.unwrap_or(stream.started_at),
                        Err(err) => {
                            tracing::warn!(stream_id = %stream.id, error = %err, "failed to check last message time");
                            report.failed += 1;
                            continue;
                        }
                    };
                    if last_activity >= cutoff {
                        continue;
                    }

                    let mut cmd = EndStream { id: stream.id.clone() };
                    match self.commands.dispatch(ctx, &mut cmd).await {
                        Ok(()) => report.acted += 1,
                        Err(err) => {
                            tracing::warn!(stream_id = %stream.id, error = %err, "failed to force-end inactive stream");
                            report.failed += 1;
                        }
                    }
                    tokio::time::sleep(RECONCILE_ITEM_PAUSE).await;
                }

                let fetched = i64::try_from(stale.len()).unwrap_or(i64::MAX);
                if fetched < RECONCILE_PAGE_SIZE {
                    break;
                }
            }

            report
        })
    }
}

/// Soft-deletes chat messages older than a configured retention window
/// (spec §4.5 default: 90 days).
pub struct MessageRetentionCleaner {
    messages: Arc<dyn MessageRepository>,
    retention: ChronoDuration,
}

impl MessageRetentionCleaner {
    /// Build a new cleaner with the given retention window.
    #[must_use]
    pub fn new(messages: Arc<dyn MessageRepository>, retention: ChronoDuration) -> Self {
        Self { messages, retention }
    }
}

impl Reconciler for MessageRetentionCleaner {
    fn name(&self) -> &'static str {
        "message-retention-cleaner"
    }

    fn tick(&self, ctx: &RequestContext) -> Pin<Box<dyn Future<Output = ReconcileReport> + Send + '_>> {
        Box::pin(async move {
            let mut report = ReconcileReport::default();
            let cutoff = SystemClock.now() - self.retention;

            loop {
                if ctx.check_cancelled().is_err() {
                    break;
                }

                match self.messages.delete_older_than(ctx, cutoff, RECONCILE_PAGE_SIZE).await {
                    Ok(deleted) => {
                        let deleted_count = u64::try_from(deleted).unwrap_or(0);
                        report.scanned += deleted_count;
                        report.acted += deleted_count;
                        if deleted < RECONCILE_PAGE_SIZE {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "message retention cleaner failed to delete batch");
                        report.failed += 1;
                        break;
                    }
                }
            }

            report
        })
    }
}
