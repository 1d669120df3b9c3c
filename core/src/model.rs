//! Shared aggregate conventions (spec §3): opaque ids, creation/update
//! timestamps, and soft-delete.

use chrono::{DateTime, Utc};

/// Generates a new opaque, UUID-shaped aggregate id.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Shared soft-delete semantics: a `deleted_at` timestamp rather than row
/// removal. List operations expose an `include_deleted` toggle; lookups by
/// id of a soft-deleted aggregate behave as "not found" unless the toggle
/// is set.
///
/// This trait only covers the uniform tombstone mechanics. Aggregate
/// specific invariants (e.g. `ShortLink::is_available`) stay as inherent
/// methods on the aggregate, since they combine soft-delete with fields
/// this trait knows nothing about.
pub trait SoftDeletable {
    /// When this aggregate was soft-deleted, if ever.
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    /// `true` once `deleted_at` has been set.
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }

    /// `true` if this aggregate should appear in a default (non-tombstone)
    /// view, or unconditionally if `include_deleted` is set.
    fn is_visible(&self, include_deleted: bool) -> bool {
        include_deleted || !self.is_deleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        deleted_at: Option<DateTime<Utc>>,
    }
    impl SoftDeletable for Fake {
        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }
    }

    #[test]
    fn new_id_looks_uuid_shaped() {
        let id = new_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn visible_without_include_deleted_hides_tombstoned_rows() {
        let deleted = Fake {
            deleted_at: Some(Utc::now()),
        };
        assert!(!deleted.is_visible(false));
        assert!(deleted.is_visible(true));
    }

    #[test]
    fn visible_row_is_always_shown() {
        let live = Fake { deleted_at: None };
        assert!(live.is_visible(false));
        assert!(live.is_visible(true));
    }
}
