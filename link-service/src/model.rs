//! Shortener aggregates (spec §3): `ShortLink` and `Click`.

use chrono::{DateTime, Utc};
use composable_rust_core::model::SoftDeletable;

/// A shortened URL.
///
/// Invariants: exactly one of (auto-generated short code, custom alias)
/// occupies the unique `short_code` slot; [`ShortLink::is_available`] holds
/// iff `is_active` and the link has not expired.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortLink {
    /// Opaque id.
    pub id: String,
    /// The destination URL.
    pub original_url: String,
    /// Unique code (auto-generated or a custom alias), ≤50 chars.
    pub short_code: String,
    /// Optional display title.
    pub title: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the link currently resolves.
    pub is_active: bool,
    /// Monotonically increasing click count.
    pub click_count: i64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortLink {
    /// `true` if this link currently resolves: active and not expired.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }

    /// `true` if `expires_at` is set and has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl SoftDeletable for ShortLink {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A single recorded click against a [`ShortLink`]. Immutable after
/// creation (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Click {
    /// Opaque id.
    pub id: String,
    /// The link this click was recorded against.
    pub link_id: String,
    /// Client IP (v4 or v6), stored as text.
    pub ip: String,
    /// Raw User-Agent string.
    pub user_agent: String,
    /// Referer header, if present.
    pub referer: Option<String>,
    /// Resolved country, if known.
    pub country: Option<String>,
    /// Resolved city, if known.
    pub city: Option<String>,
    /// Device-type classification (e.g. "mobile", "desktop"), if known.
    pub device_type: Option<String>,
    /// When the click occurred.
    pub clicked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ShortLink {
        ShortLink {
            id: "link-1".into(),
            original_url: "https://example.com".into(),
            short_code: "abc123".into(),
            title: None,
            description: None,
            expires_at,
            is_active,
            click_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn available_requires_active_and_unexpired() {
        let now = Utc::now();
        assert!(link(true, None).is_available(now));
        assert!(link(true, Some(now + chrono::Duration::hours(1))).is_available(now));
        assert!(!link(false, None).is_available(now));
        assert!(!link(true, Some(now - chrono::Duration::hours(1))).is_available(now));
    }

    #[test]
    fn is_expired_only_when_expiry_has_passed() {
        let now = Utc::now();
        assert!(!link(true, None).is_expired(now));
        assert!(!link(true, Some(now + chrono::Duration::seconds(1))).is_expired(now));
        assert!(link(true, Some(now - chrono::Duration::seconds(1))).is_expired(now));
    }
}
