//! Repository ports for the shortener aggregates (spec §4.3).
//!
//! Dyn-compatible by construction (explicit `Pin<Box<dyn Future>>` returns,
//! mirroring [`composable_rust_core::command::CommandHandler`]) so handler
//! structs can hold `Arc<dyn ShortLinkRepository>` / `Arc<dyn ClickRepository>`
//! and be swapped between the Postgres implementation and
//! `composable_rust_testing`-style in-memory fakes in unit tests.

use crate::model::{Click, ShortLink};
use chrono::{DateTime, Utc};
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::Result;
use composable_rust_core::pagination::{Page, Paginated};
use std::future::Future;
use std::pin::Pin;

/// Persistence port for [`ShortLink`] (spec §4.3).
pub trait ShortLinkRepository: Send + Sync {
    /// Insert a new link.
    fn create<'a>(&'a self, ctx: &'a RequestContext, link: ShortLink) -> Pin<Box<dyn Future<Output = Result<ShortLink>> + Send + 'a>>;

    /// Look up by id. Returns `Ok(None)` for an absent or (unless
    /// `include_deleted`) soft-deleted row.
    fn get_by_id<'a>(
        &'a self,
        ctx: &'a RequestContext,
        id: &'a str,
        include_deleted: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShortLink>>> + Send + 'a>>;

    /// Look up by short code. Returns `Ok(None)` for an absent or (unless
    /// `include_deleted`) soft-deleted row.
    fn get_by_short_code<'a>(
        &'a self,
        ctx: &'a RequestContext,
        short_code: &'a str,
        include_deleted: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShortLink>>> + Send + 'a>>;

    /// `true` if a (non-deleted) row already occupies this code.
    fn short_code_exists<'a>(&'a self, ctx: &'a RequestContext, short_code: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Page through links, most-recently-created first.
    fn list<'a>(
        &'a self,
        ctx: &'a RequestContext,
        page: Page,
        include_deleted: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ShortLink>>> + Send + 'a>>;

    /// Page through active links for the expiration sweeper (spec §4.5),
    /// ordered by id so repeated pages make forward progress.
    fn list_active_page<'a>(&'a self, ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Vec<ShortLink>>> + Send + 'a>>;

    /// Persist a mutated link (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, link: ShortLink) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Soft-delete by id.
    fn delete<'a>(&'a self, ctx: &'a RequestContext, id: &'a str, now: DateTime<Utc>) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`Click`] (spec §4.3, §4.4.2).
pub trait ClickRepository: Send + Sync {
    /// Insert a new (immutable) click row.
    fn create<'a>(&'a self, ctx: &'a RequestContext, click: Click) -> Pin<Box<dyn Future<Output = Result<Click>> + Send + 'a>>;

    /// All clicks recorded against `link_id`, most-recent first.
    fn list_for_link<'a>(&'a self, ctx: &'a RequestContext, link_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Click>>> + Send + 'a>>;
}
