//! Chat-ingestion aggregates (spec §3): `Stream`, `Message`, `Viewer`,
//! `ChannelViewer`, `Clip`, and `ChatCommand`.

use chrono::{DateTime, Utc};
use composable_rust_core::model::SoftDeletable;

/// A tracked broadcast on a single channel.
///
/// Invariants: `ended_at` is set iff `is_active == false`; `peak_viewers` ≥
/// `rolling_avg_viewers` ≥ 0; `total_message_count` ≥ 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Opaque id.
    pub id: String,
    /// The channel this stream belongs to.
    pub channel: String,
    /// Stream title at last poll.
    pub title: String,
    /// Platform game name at last poll.
    pub game_name: String,
    /// Platform game id at last poll.
    pub game_id: String,
    /// When the stream was first observed live.
    pub started_at: DateTime<Utc>,
    /// When the stream was observed to have ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Highest viewer count observed.
    pub peak_viewers: i64,
    /// Rolling average viewer count (spec §4.5: simple `(old + current) / 2`).
    pub rolling_avg_viewers: i64,
    /// Total chat messages attributed to this stream.
    pub total_message_count: i64,
    /// Whether this stream is still considered live.
    pub is_active: bool,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Stream {
    /// `true` if this aggregate satisfies the ended-at/is_active invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        (self.ended_at.is_some()) == !self.is_active
            && self.peak_viewers >= self.rolling_avg_viewers
            && self.rolling_avg_viewers >= 0
            && self.total_message_count >= 0
    }

    /// The sentinel "Chat-Only" stream id used for a channel with no live
    /// stream tracked (spec §4.5, §4.8).
    #[must_use]
    pub fn chat_only_id(channel: &str) -> String {
        format!("chat-only:{channel}")
    }
}

impl SoftDeletable for Stream {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A single chat message (spec §3). Attributed to whichever stream id was
/// current for its channel at receipt time (spec §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Opaque id.
    pub id: String,
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
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
    /// Soft-delete tombstone (message-retention cleaner, spec §4.5).
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Message {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A global viewer identity, aggregated across all channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    /// Opaque id.
    pub id: String,
    /// Platform user id.
    pub user_id: String,
    /// Login username.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// First time this viewer was observed on any channel.
    pub first_seen: DateTime<Utc>,
    /// Most recent time this viewer was observed on any channel.
    pub last_seen: DateTime<Utc>,
    /// Total messages sent across all channels.
    pub total_messages: i64,
    /// Total distinct streams this viewer has chatted in.
    pub total_streams_watched: i64,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Viewer {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A viewer's per-channel presence and badges. One [`Viewer`] may have many
/// `ChannelViewer` rows, one per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelViewer {
    /// Opaque id.
    pub id: String,
    /// The global viewer this row belongs to.
    pub viewer_id: String,
    /// The channel this presence is scoped to.
    pub channel: String,
    /// Login username (denormalized for fast lookups).
    pub username: String,
    /// Display name (denormalized).
    pub display_name: String,
    /// First time this viewer was observed on this channel.
    pub first_seen: DateTime<Utc>,
    /// Most recent time this viewer was observed on this channel.
    pub last_seen: DateTime<Utc>,
    /// Moderator badge on this channel. Left `false` on hydration until a
    /// tagged message confirms it (spec §4.8).
    pub is_moderator: bool,
    /// VIP badge on this channel. Same hydration rule as `is_moderator`.
    pub is_vip: bool,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for ChannelViewer {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A recorded platform clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    /// Opaque id.
    pub id: String,
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
    /// View count at last sync.
    pub view_count: i64,
    /// Clip duration in seconds.
    pub duration_seconds: i64,
    /// When the platform recorded this clip as created.
    pub external_created_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Clip {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A registered chat command (spec §3, §4.8). Named `ChatCommand` to avoid
/// colliding with [`composable_rust_core::command::Command`], the bus trait.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCommand {
    /// Opaque id.
    pub id: String,
    /// The invocation name, unique, without the leading `!`.
    pub name: String,
    /// The text sent back to the channel on a successful invocation.
    pub response_template: String,
    /// Whether this command currently responds at all.
    pub is_active: bool,
    /// Restrict invocation to moderators.
    pub moderator_only: bool,
    /// Restrict invocation to subscribers (moderators always satisfy this too).
    pub subscriber_only: bool,
    /// Minimum seconds between successful invocations.
    pub cooldown_seconds: i64,
    /// Total successful invocations.
    pub usage_count: i64,
    /// When this command last succeeded.
    pub last_used: Option<DateTime<Utc>>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ChatCommand {
    /// `true` if `tags` satisfy this command's permission requirements.
    /// A moderator always satisfies `subscriber_only` (spec §4.8).
    #[must_use]
    pub fn permits(&self, is_moderator: bool, is_subscriber: bool) -> bool {
        if self.moderator_only && !is_moderator {
            return false;
        }
        if self.subscriber_only && !is_moderator && !is_subscriber {
            return false;
        }
        true
    }

    /// `true` if `cooldown_seconds` have not yet elapsed since `last_used`.
    #[must_use]
    pub fn is_on_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.last_used
            .is_some_and(|last| now - last < chrono::Duration::seconds(self.cooldown_seconds))
    }
}

impl SoftDeletable for ChatCommand {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(is_active: bool, ended_at: Option<DateTime<Utc>>) -> Stream {
        Stream {
            id: "s1".into(),
            channel: "somechannel".into(),
            title: "title".into(),
            game_name: "game".into(),
            game_id: "1".into(),
            started_at: Utc::now(),
            ended_at,
            peak_viewers: 10,
            rolling_avg_viewers: 5,
            total_message_count: 0,
            is_active,
            deleted_at: None,
        }
    }

    #[test]
    fn consistent_requires_ended_at_iff_inactive() {
        assert!(stream(true, None).is_consistent());
        assert!(stream(false, Some(Utc::now())).is_consistent());
        assert!(!stream(true, Some(Utc::now())).is_consistent());
        assert!(!stream(false, None).is_consistent());
    }

    #[test]
    fn command_permits_moderator_for_subscriber_only() {
        let cmd = ChatCommand {
            id: "c1".into(),
            name: "hello".into(),
            response_template: "hi".into(),
            is_active: true,
            moderator_only: false,
            subscriber_only: true,
            cooldown_seconds: 30,
            usage_count: 0,
            last_used: None,
            deleted_at: None,
        };
        assert!(cmd.permits(true, false));
        assert!(cmd.permits(false, true));
        assert!(!cmd.permits(false, false));
    }

    #[test]
    fn command_cooldown_checks_elapsed_time() {
        let now = Utc::now();
        let mut cmd = ChatCommand {
            id: "c1".into(),
            name: "hello".into(),
            response_template: "hi".into(),
            is_active: true,
            moderator_only: false,
            subscriber_only: false,
            cooldown_seconds: 30,
            usage_count: 0,
            last_used: Some(now - chrono::Duration::seconds(10)),
            deleted_at: None,
        };
        assert!(cmd.is_on_cooldown(now));
        cmd.last_used = Some(now - chrono::Duration::seconds(31));
        assert!(!cmd.is_on_cooldown(now));
    }
}
