//! Domain events for the shortener aggregates (spec §4.7).
//!
//! Each variant is published to its own `link.<aggregate>.<verb>` topic via
//! [`composable_rust_core::publisher::topic_for`]; the event's own
//! `event_type()` carries a versioned name for wire compatibility,
//! independent of the topic string.

use crate::model::ShortLink;
use composable_rust_core::event::Event;
use serde::{Deserialize, Serialize};

/// A domain event raised by the shortener aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LinkEvent {
    /// A new link was created.
    Created {
        /// The link's id.
        id: String,
        /// Its short code.
        short_code: String,
        /// Its destination URL.
        original_url: String,
    },
    /// An existing link was updated.
    Updated {
        /// The link's id.
        id: String,
    },
    /// `is_active` flipped from `false` to `true`.
    Activated {
        /// The link's id.
        id: String,
    },
    /// `is_active` flipped from `true` to `false`.
    Deactivated {
        /// The link's id.
        id: String,
    },
    /// The expiration sweeper deactivated this link because it had expired.
    Expired {
        /// The link's id.
        id: String,
    },
    /// A click was recorded against this link.
    Clicked {
        /// The link's id.
        id: String,
        /// The link's click count after this click.
        click_count: i64,
    },
    /// The link was soft-deleted.
    Deleted {
        /// The link's id.
        id: String,
    },
}

impl Event for LinkEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "Link.Created.v1",
            Self::Updated { .. } => "Link.Updated.v1",
            Self::Activated { .. } => "Link.Activated.v1",
            Self::Deactivated { .. } => "Link.Deactivated.v1",
            Self::Expired { .. } => "Link.Expired.v1",
            Self::Clicked { .. } => "Link.Clicked.v1",
            Self::Deleted { .. } => "Link.Deleted.v1",
        }
    }
}

impl LinkEvent {
    /// The topic this event publishes to, following `link.link.<verb>`.
    #[must_use]
    pub fn topic(&self) -> String {
        let verb = match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Activated { .. } => "activated",
            Self::Deactivated { .. } => "deactivated",
            Self::Expired { .. } => "expired",
            Self::Clicked { .. } => "clicked",
            Self::Deleted { .. } => "deleted",
        };
        composable_rust_core::publisher::topic_for("link", "link", verb)
    }

    /// The principal aggregate id carried by this event, used as the
    /// publish-time partitioning key.
    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        match self {
            Self::Created { id, .. }
            | Self::Updated { id }
            | Self::Activated { id }
            | Self::Deactivated { id }
            | Self::Expired { id }
            | Self::Clicked { id, .. }
            | Self::Deleted { id } => id,
        }
    }

    /// Build the `Created` event from the freshly-created link.
    #[must_use]
    pub fn created(link: &ShortLink) -> Self {
        Self::Created {
            id: link.id.clone(),
            short_code: link.short_code.clone(),
            original_url: link.original_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_follow_service_aggregate_verb() {
        assert_eq!(LinkEvent::Created { id: "1".into(), short_code: "a".into(), original_url: "u".into() }.topic(), "link.link.created");
        assert_eq!(LinkEvent::Expired { id: "1".into() }.topic(), "link.link.expired");
        assert_eq!(LinkEvent::Clicked { id: "1".into(), click_count: 2 }.topic(), "link.link.clicked");
    }
}
