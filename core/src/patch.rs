//! Explicit-presence update inputs (spec §4.4, §9).
//!
//! Every mutable field on an update command uses [`Patch`] so a handler can
//! distinguish "caller didn't mention this field" from "caller wants it
//! cleared." Only [`Patch::Set`] and [`Patch::SetNull`] mutate the
//! aggregate; [`Patch::Unset`] is always a no-op.

use serde::{Deserialize, Serialize};

/// A tri-state field update: left alone, set to a value, or explicitly
/// cleared.
///
/// For non-nullable fields, handlers simply never construct
/// [`Patch::SetNull`] — the variant still exists so a single type serves
/// both nullable and non-nullable fields without a second enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patch<T> {
    /// Field was not mentioned in the update command; leave as-is.
    Unset,
    /// Field should be set to this value.
    Set(T),
    /// Field should be cleared (only meaningful for `Option<T>` slots).
    SetNull,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Patch<T> {
    /// Returns `true` if this patch carries no change.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Apply this patch to a non-nullable field slot.
    ///
    /// `SetNull` on a non-nullable field is treated the same as `Unset` —
    /// it is a handler-authoring error to ever construct `SetNull` for a
    /// required field, not a runtime condition to branch on.
    pub fn apply_to(self, slot: &mut T) {
        if let Self::Set(value) = self {
            *slot = value;
        }
    }

    /// Apply this patch to an `Option<T>` field slot: `Set` stores
    /// `Some(value)`, `SetNull` stores `None`, `Unset` leaves it alone.
    pub fn apply_to_option(self, slot: &mut Option<T>) {
        match self {
            Self::Set(value) => *slot = Some(value),
            Self::SetNull => *slot = None,
            Self::Unset => {}
        }
    }

    /// Maps the contained value, if any.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Unset => Patch::Unset,
            Self::Set(v) => Patch::Set(f(v)),
            Self::SetNull => Patch::SetNull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_leaves_required_field_untouched() {
        let mut title = "original".to_string();
        Patch::<String>::Unset.apply_to(&mut title);
        assert_eq!(title, "original");
    }

    #[test]
    fn set_overwrites_required_field() {
        let mut title = "original".to_string();
        Patch::Set("updated".to_string()).apply_to(&mut title);
        assert_eq!(title, "updated");
    }

    #[test]
    fn set_null_clears_optional_field() {
        let mut description = Some("was here".to_string());
        Patch::<String>::SetNull.apply_to_option(&mut description);
        assert_eq!(description, None);
    }

    #[test]
    fn unset_leaves_optional_field_untouched() {
        let mut description = Some("was here".to_string());
        Patch::<String>::Unset.apply_to_option(&mut description);
        assert_eq!(description, Some("was here".to_string()));
    }

    #[test]
    fn set_replaces_optional_field() {
        let mut description: Option<String> = None;
        Patch::Set("new".to_string()).apply_to_option(&mut description);
        assert_eq!(description, Some("new".to_string()));
    }
}
