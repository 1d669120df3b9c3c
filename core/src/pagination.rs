//! Shared pagination types for repository `List` finders (spec §4.3).
//!
//! `offset` is zero-based; `limit` is the page size; total count is
//! returned alongside the page for UI paging.

/// A page request: zero-based `offset` plus page size `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Zero-based offset into the result set.
    pub offset: i64,
    /// Maximum number of items to return.
    pub limit: i64,
}

impl Page {
    /// Build a page request, clamping `limit` to at least 1 so a caller
    /// passing `limit: 0` does not silently return an empty page forever.
    #[must_use]
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.max(1),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A page of results plus the total count across the whole (unpaginated)
/// result set, for UI paging.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: i64,
}

impl<T> Paginated<T> {
    /// Build a paginated result.
    #[must_use]
    pub const fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    /// Map the items, keeping the same total count.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}
