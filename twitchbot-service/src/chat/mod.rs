//! Chat ingestion subsystem: the persistent session (spec §4.8), its token
//! manager, and the shared registry of joined channels / stream attribution
//! that the stream poller reconciler also reads.

pub mod session;
pub mod token;

use crate::model::Stream;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Tracks which channels the chat session has joined, and which stream id
/// each channel's messages should currently be attributed to.
///
/// Spec §5: "readers take a read-lock, mutators take a write-lock." Shared
/// between the chat session (which owns channel join/part and message
/// attribution) and the stream poller reconciler (which reads the joined
/// set and updates attribution as streams start and end).
pub struct ChannelRegistry {
    joined: RwLock<HashSet<String>>,
    stream_ids: RwLock<HashMap<String, String>>,
}

impl ChannelRegistry {
    /// An empty registry with no channels joined.
    #[must_use]
    pub fn new() -> Self {
        Self {
            joined: RwLock::new(HashSet::new()),
            stream_ids: RwLock::new(HashMap::new()),
        }
    }

    /// Mark `channel` as joined, defaulting its stream attribution to the
    /// chat-only sentinel until the poller finds a real stream.
    pub async fn join(&self, channel: &str) {
        self.joined.write().await.insert(channel.to_string());
        self.stream_ids
            .write()
            .await
            .entry(channel.to_string())
            .or_insert_with(|| Stream::chat_only_id(channel));
    }

    /// Mark `channel` as left. Stream attribution is left in place so a
    /// rejoin picks up where it left off.
    pub async fn leave(&self, channel: &str) {
        self.joined.write().await.remove(channel);
    }

    /// The current snapshot of joined channels, for the stream poller to
    /// iterate over.
    pub async fn joined_channels(&self) -> Vec<String> {
        self.joined.read().await.iter().cloned().collect()
    }

    /// The stream id messages in `channel` should currently be attributed
    /// to, falling back to the chat-only sentinel if unset.
    pub async fn stream_id_for(&self, channel: &str) -> String {
        self.stream_ids
            .read()
            .await
            .get(channel)
            .cloned()
            .unwrap_or_else(|| Stream::chat_only_id(channel))
    }

    /// Attribute `channel`'s messages to `stream_id` going forward (called
    /// by the stream poller when a stream starts or ends).
    pub async fn set_stream_id(&self, channel: &str, stream_id: &str) {
        self.stream_ids.write().await.insert(channel.to_string(), stream_id.to_string());
    }

    /// Reset `channel`'s attribution back to the chat-only sentinel.
    pub async fn clear_stream_id(&self, channel: &str) {
        let sentinel = Stream::chat_only_id(channel);
        self.stream_ids.write().await.insert(channel.to_string(), sentinel);
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_defaults_stream_id_to_chat_only_sentinel() {
        let registry = ChannelRegistry::new();
        registry.join("somechannel").await;

        assert_eq!(registry.joined_channels().await, vec!["somechannel".to_string()]);
        assert_eq!(registry.stream_id_for("somechannel").await, Stream::chat_only_id("somechannel"));
    }

    #[tokio::test]
    async fn set_stream_id_overrides_sentinel_until_cleared() {
        let registry = ChannelRegistry::new();
        registry.join("somechannel").await;
        registry.set_stream_id("somechannel", "stream-123").await;
        assert_eq!(registry.stream_id_for("somechannel").await, "stream-123");

        registry.clear_stream_id("somechannel").await;
        assert_eq!(registry.stream_id_for("somechannel").await, Stream::chat_only_id("somechannel"));
    }

    #[tokio::test]
    async fn leave_removes_from_joined_but_keeps_attribution() {
        let registry = ChannelRegistry::new();
        registry.join("somechannel").await;
        registry.set_stream_id("somechannel", "stream-123").await;
        registry.leave("somechannel").await;

        assert!(registry.joined_channels().await.is_empty());
        assert_eq!(registry.stream_id_for("somechannel").await, "stream-123");
    }
}
