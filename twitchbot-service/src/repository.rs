//! Repository ports for the chat-ingestion aggregates (spec §4.3).
//!
//! Dyn-compatible by construction (explicit `Pin<Box<dyn Future>>` returns),
//! so handler structs can hold `Arc<dyn ...Repository>` and be swapped
//! between the Postgres implementation and in-memory fakes in unit tests.

use crate::model::{ChannelViewer, ChatCommand, Clip, Message, Stream, Viewer};
use chrono::{DateTime, Utc};
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::Result;
use composable_rust_core::pagination::{Page, Paginated};
use std::future::Future;
use std::pin::Pin;

/// Persistence port for [`Stream`] (spec §4.3, §4.5).
pub trait StreamRepository: Send + Sync {
    /// Insert a new stream.
    fn create<'a>(&'a self, ctx: &'a RequestContext, stream: Stream) -> Pin<Box<dyn Future<Output = Result<Stream>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Stream>>> + Send + 'a>>;

    /// The currently-active stream tracked for `channel`, if any.
    fn get_active_for_channel<'a>(&'a self, ctx: &'a RequestContext, channel: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Stream>>> + Send + 'a>>;

    /// Active streams whose `last_message_at` is older than `older_than`,
    /// for the inactive-stream closer (spec §4.5).
    fn list_active_stale<'a>(
        &'a self,
        ctx: &'a RequestContext,
        older_than: DateTime<Utc>,
        page: Page,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stream>>> + Send + 'a>>;

    /// Page through streams, most-recently-started first.
    fn list<'a>(&'a self, ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Stream>>> + Send + 'a>>;

    /// Persist a mutated stream (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, stream: Stream) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`Message`] (spec §4.3, §4.8).
pub trait MessageRepository: Send + Sync {
    /// Insert a new message.
    fn create<'a>(&'a self, ctx: &'a RequestContext, message: Message) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + 'a>>;

    /// Messages for `stream_id`, most-recent first.
    fn list_for_stream<'a>(&'a self, ctx: &'a RequestContext, stream_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Message>>> + Send + 'a>>;

    /// The instant of the most recent (non-deleted) message attributed to
    /// `stream_id`, used by the inactive-stream closer.
    fn last_message_at<'a>(&'a self, ctx: &'a RequestContext, stream_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<DateTime<Utc>>>> + Send + 'a>>;

    /// Soft-delete messages older than `older_than`, returning the count
    /// deleted, for the message-retention cleaner (spec §4.5).
    fn delete_older_than<'a>(&'a self, ctx: &'a RequestContext, older_than: DateTime<Utc>, page_size: i64) -> Pin<Box<dyn Future<Output = Result<i64>> + Send + 'a>>;
}

/// Persistence port for [`Viewer`] (spec §4.3, §4.4).
pub trait ViewerRepository: Send + Sync {
    /// Find a global viewer by platform user id.
    fn get_by_user_id<'a>(&'a self, ctx: &'a RequestContext, user_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Viewer>>> + Send + 'a>>;

    /// Insert a new global viewer.
    fn create<'a>(&'a self, ctx: &'a RequestContext, viewer: Viewer) -> Pin<Box<dyn Future<Output = Result<Viewer>> + Send + 'a>>;

    /// Persist a mutated viewer (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, viewer: Viewer) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`ChannelViewer`] (spec §4.3, §4.4, §4.8).
pub trait ChannelViewerRepository: Send + Sync {
    /// Find a per-channel presence row by viewer id and channel.
    fn get<'a>(&'a self, ctx: &'a RequestContext, viewer_id: &'a str, channel: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChannelViewer>>> + Send + 'a>>;

    /// Insert a new per-channel presence row.
    fn create<'a>(&'a self, ctx: &'a RequestContext, row: ChannelViewer) -> Pin<Box<dyn Future<Output = Result<ChannelViewer>> + Send + 'a>>;

    /// Persist a mutated presence row (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, row: ChannelViewer) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`Clip`] (spec §4.3).
pub trait ClipRepository: Send + Sync {
    /// Insert a new clip.
    fn create<'a>(&'a self, ctx: &'a RequestContext, clip: Clip) -> Pin<Box<dyn Future<Output = Result<Clip>> + Send + 'a>>;

    /// Clips for `stream_id`, most-recent first.
    fn list_for_stream<'a>(&'a self, ctx: &'a RequestContext, stream_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Clip>>> + Send + 'a>>;
}

/// Persistence port for [`ChatCommand`] (spec §4.3, §4.8, §4.9).
pub trait ChatCommandRepository: Send + Sync {
    /// Find by unique invocation name (without the leading `!`).
    fn get_by_name<'a>(&'a self, ctx: &'a RequestContext, name: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChatCommand>>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChatCommand>>> + Send + 'a>>;

    /// Insert a new chat command.
    fn create<'a>(&'a self, ctx: &'a RequestContext, command: ChatCommand) -> Pin<Box<dyn Future<Output = Result<ChatCommand>> + Send + 'a>>;

    /// Page through registered commands.
    fn list<'a>(&'a self, ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ChatCommand>>> + Send + 'a>>;

    /// Persist a mutated command (full-row overwrite), used both for admin
    /// edits and to record a successful invocation's `usage_count`/`last_used`.
    fn update<'a>(&'a self, ctx: &'a RequestContext, command: ChatCommand) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
