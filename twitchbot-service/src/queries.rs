//! Read-side queries for the chat-ingestion aggregates (spec §4.2, §6).

use crate::model::{ChatCommand, Clip, Message, Stream};
use composable_rust_core::pagination::{Page, Paginated};
use composable_rust_core::Query;

/// The currently-active (real, not sentinel) stream tracked for a channel.
/// Used both by the representative RPC surface (spec §6) and by chat
/// attribution lookups that prefer to hit the query bus over reading the
/// session's in-memory map directly.
#[derive(Debug, Default)]
pub struct GetActiveStream {
    /// The channel to look up.
    pub channel: String,
}

impl Query for GetActiveStream {
    type Output = Option<Stream>;

    fn query_name(&self) -> &'static str {
        "GetActiveStream"
    }
}

/// Page through streams, most-recently-started first.
#[derive(Debug, Default)]
pub struct ListStreams {
    /// Pagination window.
    pub page: Page,
}

impl Query for ListStreams {
    type Output = Paginated<Stream>;

    fn query_name(&self) -> &'static str {
        "ListStreams"
    }
}

/// Page through messages attributed to a stream, most-recent first.
#[derive(Debug, Default)]
pub struct ListMessagesForStream {
    /// The stream to list messages for.
    pub stream_id: String,
    /// Pagination window.
    pub page: Page,
}

impl Query for ListMessagesForStream {
    type Output = Paginated<Message>;

    fn query_name(&self) -> &'static str {
        "ListMessagesForStream"
    }
}

/// Page through clips recorded against a stream, most-recent first.
#[derive(Debug, Default)]
pub struct ListClipsForStream {
    /// The stream to list clips for.
    pub stream_id: String,
    /// Pagination window.
    pub page: Page,
}

impl Query for ListClipsForStream {
    type Output = Paginated<Clip>;

    fn query_name(&self) -> &'static str {
        "ListClipsForStream"
    }
}

/// Page through registered chat commands.
#[derive(Debug, Default)]
pub struct ListChatCommands {
    /// Pagination window.
    pub page: Page,
}

impl Query for ListChatCommands {
    type Output = Paginated<ChatCommand>;

    fn query_name(&self) -> &'static str {
        "ListChatCommands"
    }
}
