//! Domain events for the chat-ingestion aggregates (spec §4.7).
//!
//! Each variant publishes to its own `twitchbot.<aggregate>.<verb>` topic via
//! [`composable_rust_core::publisher::topic_for`].

use crate::model::{Message, Stream};
use composable_rust_core::event::Event;
use serde::{Deserialize, Serialize};

/// A domain event raised by the chat-ingestion aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TwitchbotEvent {
    /// A new stream was detected live (spec §4.5 stream poller).
    StreamStarted {
        /// The stream's id.
        id: String,
        /// The channel it belongs to.
        channel: String,
    },
    /// A tracked stream ended, by poll or by the inactive-stream closer.
    StreamEnded {
        /// The stream's id.
        id: String,
        /// The channel it belonged to.
        channel: String,
    },
    /// A tracked stream's peak/rolling-average viewer counts were updated.
    StreamUpdated {
        /// The stream's id.
        id: String,
    },
    /// A chat message was persisted.
    MessageReceived {
        /// The message's id.
        id: String,
        /// The stream it was attributed to.
        stream_id: String,
    },
    /// A chat command was executed successfully.
    CommandExecuted {
        /// The invoked command's id.
        id: String,
        /// The invocation name.
        name: String,
    },
}

impl Event for TwitchbotEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::StreamStarted { .. } => "Twitchbot.StreamStarted.v1",
            Self::StreamEnded { .. } => "Twitchbot.StreamEnded.v1",
            Self::StreamUpdated { .. } => "Twitchbot.StreamUpdated.v1",
            Self::MessageReceived { .. } => "Twitchbot.MessageReceived.v1",
            Self::CommandExecuted { .. } => "Twitchbot.CommandExecuted.v1",
        }
    }
}

impl TwitchbotEvent {
    /// The topic this event publishes to, following
    /// `twitchbot.<aggregate>.<verb>`.
    #[must_use]
    pub fn topic(&self) -> String {
        let (aggregate, verb) = match self {
            Self::StreamStarted { .. } => ("stream", "started"),
            Self::StreamEnded { .. } => ("stream", "ended"),
            Self::StreamUpdated { .. } => ("stream", "updated"),
            Self::MessageReceived { .. } => ("message", "received"),
            Self::CommandExecuted { .. } => ("command", "executed"),
        };
        composable_rust_core::publisher::topic_for("twitchbot", aggregate, verb)
    }

    /// The principal aggregate id carried by this event, used as the
    /// publish-time partitioning key.
    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        match self {
            Self::StreamStarted { id, .. }
            | Self::StreamEnded { id, .. }
            | Self::StreamUpdated { id }
            | Self::MessageReceived { id, .. }
            | Self::CommandExecuted { id, .. } => id,
        }
    }

    /// Build the `StreamStarted` event from a freshly-created stream.
    #[must_use]
    pub fn stream_started(stream: &Stream) -> Self {
        Self::StreamStarted {
            id: stream.id.clone(),
            channel: stream.channel.clone(),
        }
    }

    /// Build the `StreamEnded` event from a just-ended stream.
    #[must_use]
    pub fn stream_ended(stream: &Stream) -> Self {
        Self::StreamEnded {
            id: stream.id.clone(),
            channel: stream.channel.clone(),
        }
    }

    /// Build the `MessageReceived` event from a freshly-persisted message.
    #[must_use]
    pub fn message_received(message: &Message) -> Self {
        Self::MessageReceived {
            id: message.id.clone(),
            stream_id: message.stream_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_follow_service_aggregate_verb() {
        assert_eq!(
            TwitchbotEvent::StreamStarted { id: "1".into(), channel: "c".into() }.topic(),
            "twitchbot.stream.started"
        );
        assert_eq!(
            TwitchbotEvent::MessageReceived { id: "1".into(), stream_id: "s".into() }.topic(),
            "twitchbot.message.received"
        );
        assert_eq!(
            TwitchbotEvent::CommandExecuted { id: "1".into(), name: "hi".into() }.topic(),
            "twitchbot.command.executed"
        );
    }
}
