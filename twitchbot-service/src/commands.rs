//! Commands mutating chat-ingestion aggregates (spec §4.1, §4.4, §4.8, §4.9).

use crate::model::{Clip, Message, Stream};
use chrono::{DateTime, Utc};
use composable_rust_core::error::Result;
use composable_rust_core::patch::Patch;
use composable_rust_core::{Command, CoreError};

/// Create a new stream aggregate, dispatched by the stream poller when a
/// joined channel transitions to live (spec §4.5).
#[derive(Debug, Default)]
pub struct CreateStream {
    /// The channel this stream belongs to.
    pub channel: String,
    /// Stream title at poll time.
    pub title: String,
    /// Platform game name at poll time.
    pub game_name: String,
    /// Platform game id at poll time.
    pub game_id: String,
    /// Viewer count at poll time; seeds both peak and rolling average.
    pub initial_viewers: i64,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created stream, written back by the handler on success.
    pub created: Option<Stream>,
}

impl Command for CreateStream {
    fn command_name(&self) -> &'static str {
        "CreateStream"
    }

    fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(CoreError::invalid("channel must not be empty"));
        }
        if self.initial_viewers < 0 {
            return Err(CoreError::invalid("initial_viewers must be non-negative"));
        }
        Ok(())
    }
}

/// Update a live stream's descriptive fields and/or viewer metrics
/// (spec §4.5: peak = `max(old, current)`, rolling average =
/// `(old + current) / 2`).
#[derive(Debug, Default)]
pub struct UpdateStream {
    /// The stream to update.
    pub id: String,
    /// New title, or leave/clear.
    pub title: Patch<String>,
    /// New game name, or leave/clear.
    pub game_name: Patch<String>,
    /// New game id, or leave/clear.
    pub game_id: Patch<String>,
    /// Current observed viewer count, folded into peak/rolling average when present.
    pub current_viewers: Option<i64>,
}

impl Command for UpdateStream {
    fn command_name(&self) -> &'static str {
        "UpdateStream"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        if let Some(v) = self.current_viewers {
            if v < 0 {
                return Err(CoreError::invalid("current_viewers must be non-negative"));
            }
        }
        Ok(())
    }
}

/// End a tracked stream: set `ended_at`, flip `is_active=false`, emit
/// `stream.ended`. Used both by the stream poller (channel went offline)
/// and the inactive-stream closer (spec §4.5); idempotent against an
/// already-ended stream.
#[derive(Debug, Default)]
pub struct EndStream {
    /// The stream to end.
    pub id: String,
}

impl Command for EndStream {
    fn command_name(&self) -> &'static str {
        "EndStream"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Persist an inbound chat message and update Viewer/ChannelViewer rows
/// (spec §4.4, §4.8). Dispatched by the chat session's message handler for
/// every line that does not begin with `!`.
#[derive(Debug, Default)]
pub struct CreateMessage {
    /// The stream (real or "Chat-Only" sentinel) this message is attributed to.
    pub stream_id: String,
    /// The channel the message arrived on.
    pub channel: String,
    /// Platform user id of the sender.
    pub user_id: String,
    /// Sender's login username.
    pub username: String,
    /// Sender's display name.
    pub display_name: String,
    /// Message body text.
    pub body: String,
    /// Moderator badge present on this message.
    pub is_moderator: bool,
    /// Subscriber badge present on this message.
    pub is_subscriber: bool,
    /// VIP badge present on this message.
    pub is_vip: bool,
    /// Broadcaster badge present on this message.
    pub is_broadcaster: bool,
    /// Written back by the handler on success.
    pub created: Option<Message>,
}

impl Command for CreateMessage {
    fn command_name(&self) -> &'static str {
        "CreateMessage"
    }

    fn validate(&self) -> Result<()> {
        if self.stream_id.trim().is_empty() {
            return Err(CoreError::invalid("stream_id must not be empty"));
        }
        if self.user_id.trim().is_empty() {
            return Err(CoreError::invalid("user_id must not be empty"));
        }
        if self.username.trim().is_empty() {
            return Err(CoreError::invalid("username must not be empty"));
        }
        Ok(())
    }
}

/// Execute a registered chat command by name (spec §4.8, §4.9). Dispatched
/// when an inbound message body starts with `!`.
#[derive(Debug, Default)]
pub struct ExecuteChatCommand {
    /// The invocation name, without the leading `!`.
    pub name: String,
    /// Whether the invoking user currently holds moderator status.
    pub invoker_is_moderator: bool,
    /// Whether the invoking user currently holds subscriber status.
    pub invoker_is_subscriber: bool,
    /// Written back by the handler on success: the response text to send.
    pub response: Option<String>,
}

impl Command for ExecuteChatCommand {
    fn command_name(&self) -> &'static str {
        "ExecuteChatCommand"
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("name must not be empty"));
        }
        Ok(())
    }
}

/// Register a new chat command (admin surface; not part of the RPC
/// representative subset in spec §6, but every aggregate gets a create
/// handler per spec §3's lifecycle rule).
#[derive(Debug, Default)]
pub struct CreateChatCommand {
    /// The invocation name, unique, without the leading `!`.
    pub name: String,
    /// The text sent back to the channel on a successful invocation.
    pub response_template: String,
    /// Restrict invocation to moderators.
    pub moderator_only: bool,
    /// Restrict invocation to subscribers.
    pub subscriber_only: bool,
    /// Minimum seconds between successful invocations.
    pub cooldown_seconds: i64,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
}

impl Command for CreateChatCommand {
    fn command_name(&self) -> &'static str {
        "CreateChatCommand"
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("name must not be empty"));
        }
        if self.cooldown_seconds < 0 {
            return Err(CoreError::invalid("cooldown_seconds must be non-negative"));
        }
        Ok(())
    }
}

/// Update present fields on an existing chat command.
#[derive(Debug, Default)]
pub struct UpdateChatCommand {
    /// The command to update.
    pub id: String,
    /// New response template, or leave/clear.
    pub response_template: Patch<String>,
    /// Flip `is_active`, if present.
    pub is_active: Patch<bool>,
    /// Flip `moderator_only`, if present.
    pub moderator_only: Patch<bool>,
    /// Flip `subscriber_only`, if present.
    pub subscriber_only: Patch<bool>,
    /// New cooldown, if present.
    pub cooldown_seconds: Patch<i64>,
}

impl Command for UpdateChatCommand {
    fn command_name(&self) -> &'static str {
        "UpdateChatCommand"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Soft-delete a chat command.
#[derive(Debug, Default)]
pub struct DeleteChatCommand {
    /// The command to delete.
    pub id: String,
}

impl Command for DeleteChatCommand {
    fn command_name(&self) -> &'static str {
        "DeleteChatCommand"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Record a synced platform clip.
#[derive(Debug, Default)]
pub struct CreateClip {
    /// The stream this clip was taken from.
    pub stream_id: String,
    /// The platform's own clip id.
    pub external_clip_id: String,
    /// Clip title.
    pub title: String,
    /// Clip page URL.
    pub url: String,
    /// Embeddable player URL.
    pub embed_url: String,
    /// Thumbnail image URL.
    pub thumbnail_url: String,
    /// The viewer who created the clip.
    pub creator: String,
    /// View count at sync time.
    pub view_count: i64,
    /// Clip duration in seconds.
    pub duration_seconds: i64,
    /// When the platform recorded this clip as created.
    pub external_created_at: DateTime<Utc>,
    /// Written back by the handler on success.
    pub created: Option<Clip>,
}

impl Command for CreateClip {
    fn command_name(&self) -> &'static str {
        "CreateClip"
    }

    fn validate(&self) -> Result<()> {
        if self.stream_id.trim().is_empty() {
            return Err(CoreError::invalid("stream_id must not be empty"));
        }
        if self.external_clip_id.trim().is_empty() {
            return Err(CoreError::invalid("external_clip_id must not be empty"));
        }
        Ok(())
    }
}
