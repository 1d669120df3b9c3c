//! Commands mutating shortener aggregates (spec §4.1, §4.4, §4.4.1, §4.4.2).

use crate::model::{Click, ShortLink};
use chrono::{DateTime, Utc};
use composable_rust_core::error::Result;
use composable_rust_core::patch::Patch;
use composable_rust_core::{Command, CoreError};

/// Create a new short link, either auto-generating its code or using
/// `custom_alias` (spec §4.4.1).
#[derive(Debug, Default)]
pub struct CreateShortLink {
    /// The destination URL. Must parse as `http`/`https` with a non-empty
    /// host (checked in the handler, per spec §4.4.1).
    pub original_url: String,
    /// An explicit alias instead of an auto-generated code. Uniqueness is
    /// its only validation, plus a 50-char length cap.
    pub custom_alias: Option<String>,
    /// Optional display title.
    pub title: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created link, written back by the handler on success so the
    /// transport layer can compose `full_short_url` without a second read.
    pub created: Option<ShortLink>,
}

impl Command for CreateShortLink {
    fn command_name(&self) -> &'static str {
        "CreateShortLink"
    }

    fn validate(&self) -> Result<()> {
        if self.original_url.trim().is_empty() {
            return Err(CoreError::invalid("original_url must not be empty"));
        }
        if let Some(alias) = &self.custom_alias {
            if alias.is_empty() || alias.len() > 50 {
                return Err(CoreError::invalid("custom_alias must be 1-50 characters"));
            }
        }
        Ok(())
    }
}

/// Update present fields on an existing link (spec §4.4 explicit-presence).
#[derive(Debug, Default)]
pub struct UpdateShortLink {
    /// The link to update.
    pub id: String,
    /// New title, or leave/clear.
    pub title: Patch<String>,
    /// New description, or leave/clear.
    pub description: Patch<String>,
    /// New expiry, or leave/clear.
    pub expires_at: Patch<DateTime<Utc>>,
    /// Flip `is_active`, if present.
    pub is_active: Patch<bool>,
}

impl Command for UpdateShortLink {
    fn command_name(&self) -> &'static str {
        "UpdateShortLink"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Soft-delete a link.
#[derive(Debug, Default)]
pub struct DeleteShortLink {
    /// The link to delete.
    pub id: String,
}

impl Command for DeleteShortLink {
    fn command_name(&self) -> &'static str {
        "DeleteShortLink"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Flip an expired, still-active link to inactive. Dispatched only by the
/// expiration sweeper (spec §4.5); idempotent when re-run against an
/// already-deactivated link.
#[derive(Debug, Default)]
pub struct DeactivateExpiredLink {
    /// The link to deactivate.
    pub id: String,
}

impl Command for DeactivateExpiredLink {
    fn command_name(&self) -> &'static str {
        "DeactivateExpiredLink"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Increment a link's click counter by short code (spec §4.4.2). Dispatched
/// independently of [`RecordClick`] so counting degrades gracefully even if
/// the detailed click row fails to write.
#[derive(Debug, Default)]
pub struct IncrementClick {
    /// The link's short code.
    pub short_code: String,
    /// Written back by the handler: the click count after this increment.
    pub new_click_count: Option<i64>,
}

impl Command for IncrementClick {
    fn command_name(&self) -> &'static str {
        "IncrementClick"
    }

    fn validate(&self) -> Result<()> {
        if self.short_code.trim().is_empty() {
            return Err(CoreError::invalid("short_code must not be empty"));
        }
        Ok(())
    }
}

/// Record a detailed click row against a link (spec §4.4.2).
#[derive(Debug, Default)]
pub struct RecordClick {
    /// The link clicked.
    pub link_id: String,
    /// Client IP.
    pub ip: String,
    /// User-Agent string.
    pub user_agent: String,
    /// Referer header, if present.
    pub referer: Option<String>,
    /// Resolved country, if known.
    pub country: Option<String>,
    /// Resolved city, if known.
    pub city: Option<String>,
    /// Device-type classification, if known.
    pub device_type: Option<String>,
    /// Written back by the handler on success.
    pub created: Option<Click>,
}

impl Command for RecordClick {
    fn command_name(&self) -> &'static str {
        "RecordClick"
    }

    fn validate(&self) -> Result<()> {
        if self.link_id.trim().is_empty() {
            return Err(CoreError::invalid("link_id must not be empty"));
        }
        if self.ip.trim().is_empty() {
            return Err(CoreError::invalid("ip must not be empty"));
        }
        Ok(())
    }
}
