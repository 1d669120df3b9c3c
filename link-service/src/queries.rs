//! Read-side queries for the shortener aggregates (spec §4.2, §6).

use crate::model::ShortLink;
use composable_rust_core::error::Result;
use composable_rust_core::pagination::{Page, Paginated};
use composable_rust_core::{CoreError, Query};
use serde::Serialize;
use std::collections::HashMap;

/// Resolve a link by its short code for redirection. The handler returns
/// [`CoreError::NotFound`] when the code is unknown, soft-deleted, or
/// otherwise unavailable (spec §6) rather than distinguishing those cases,
/// so a caller cannot probe which links exist but are merely inactive.
#[derive(Debug, Default)]
pub struct GetShortLinkByCode {
    /// The short code to resolve.
    pub short_code: String,
}

impl Query for GetShortLinkByCode {
    type Output = ShortLink;

    fn query_name(&self) -> &'static str {
        "GetShortLinkByCode"
    }
}

/// Page through links.
#[derive(Debug, Default)]
pub struct ListShortLinks {
    /// Pagination window.
    pub page: Page,
    /// Include soft-deleted rows.
    pub include_deleted: bool,
}

impl Query for ListShortLinks {
    type Output = Paginated<ShortLink>;

    fn query_name(&self) -> &'static str {
        "ListShortLinks"
    }
}

/// Aggregated click statistics for a single link.
#[derive(Debug, Default)]
pub struct GetLinkStats {
    /// The link to summarize.
    pub link_id: String,
}

impl Query for GetLinkStats {
    type Output = LinkStats;

    fn query_name(&self) -> &'static str {
        "GetLinkStats"
    }
}

/// The result of [`GetLinkStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Total recorded clicks.
    pub total_clicks: i64,
    /// Distinct client IPs observed.
    pub unique_ips: i64,
    /// Clicks in the last 24 hours.
    pub clicks_today: i64,
    /// Clicks in the last 7 days.
    pub clicks_week: i64,
    /// Clicks in the last 30 days.
    pub clicks_month: i64,
    /// Click counts keyed by resolved country.
    pub by_country: HashMap<String, i64>,
    /// Click counts keyed by device type.
    pub by_device: HashMap<String, i64>,
    /// The most frequent referers, most-common first.
    pub top_referers: Vec<(String, i64)>,
}

pub(crate) fn not_found(short_code: &str) -> CoreError {
    CoreError::not_found(format!("short link '{short_code}'"))
}
