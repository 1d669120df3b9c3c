//! Repository ports for the inventory/receipt aggregates (spec §4.3).
//!
//! Dyn-compatible by construction (explicit `Pin<Box<dyn Future>>` returns),
//! so handler structs can hold `Arc<dyn ...Repository>` and be swapped
//! between the Postgres implementation and in-memory fakes in unit tests.

use crate::model::{Item, ItemDetail, ItemVariant, Receipt, ReceiptItem, Shoppinglist, ShoppinglistItem};
use chrono::{DateTime, Utc};
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::Result;
use composable_rust_core::pagination::{Page, Paginated};
use std::future::Future;
use std::pin::Pin;

/// A candidate for receipt-item auto-matching (spec §4.4.3): a variant id
/// paired with its pre-lowercased `item.name + " " + variant_name` search
/// text, so `fuzzy::calculate_similarity` never needs to know about joins.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    /// The variant this candidate resolves to on a match.
    pub variant_id: String,
    /// Lowercased `"{item.name} {variant_name}"`.
    pub search_text: String,
}

/// Persistence port for [`Item`] (spec §3).
pub trait ItemRepository: Send + Sync {
    /// Insert a new catalog item.
    fn create<'a>(&'a self, ctx: &'a RequestContext, item: Item) -> Pin<Box<dyn Future<Output = Result<Item>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Item>>> + Send + 'a>>;
}

/// Persistence port for [`ItemVariant`] (spec §3, §4.4.3, §4.7).
pub trait ItemVariantRepository: Send + Sync {
    /// Insert a new variant.
    fn create<'a>(&'a self, ctx: &'a RequestContext, variant: ItemVariant) -> Pin<Box<dyn Future<Output = Result<ItemVariant>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ItemVariant>>> + Send + 'a>>;

    /// `true` if a (non-deleted) variant already carries this barcode.
    fn barcode_exists<'a>(&'a self, ctx: &'a RequestContext, barcode: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Page through variants, most-recently-created first.
    fn list<'a>(&'a self, ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemVariant>>> + Send + 'a>>;

    /// A page of auto-match candidates (spec §4.4.3: page size 100, upper
    /// bound 100 candidates), joined against their owning item's name.
    fn list_match_candidates<'a>(&'a self, ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Vec<MatchCandidate>>> + Send + 'a>>;

    /// Persist a mutated variant (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, variant: ItemVariant) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`ItemDetail`] (spec §3, §4.7).
pub trait ItemDetailRepository: Send + Sync {
    /// Insert a new physical unit.
    fn create<'a>(&'a self, ctx: &'a RequestContext, detail: ItemDetail) -> Pin<Box<dyn Future<Output = Result<ItemDetail>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ItemDetail>>> + Send + 'a>>;

    /// Count of live (non-deleted) units for a variant — the derived
    /// `current_stock` attribute (spec §3).
    fn count_active_for_variant<'a>(&'a self, ctx: &'a RequestContext, variant_id: &'a str) -> Pin<Box<dyn Future<Output = Result<i64>> + Send + 'a>>;

    /// Page through live units for a variant.
    fn list_for_variant<'a>(&'a self, ctx: &'a RequestContext, variant_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemDetail>>> + Send + 'a>>;

    /// Persist a mutated unit (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, detail: ItemDetail) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Soft-delete by id ("consumed").
    fn delete<'a>(&'a self, ctx: &'a RequestContext, id: &'a str, now: DateTime<Utc>) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`Receipt`] (spec §3, §4.4.3).
pub trait ReceiptRepository: Send + Sync {
    /// Insert a new receipt.
    fn create<'a>(&'a self, ctx: &'a RequestContext, receipt: Receipt) -> Pin<Box<dyn Future<Output = Result<Receipt>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Receipt>>> + Send + 'a>>;

    /// Persist a mutated receipt (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, receipt: Receipt) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`ReceiptItem`] (spec §3, §4.4.3).
pub trait ReceiptItemRepository: Send + Sync {
    /// Insert a new line item.
    fn create<'a>(&'a self, ctx: &'a RequestContext, item: ReceiptItem) -> Pin<Box<dyn Future<Output = Result<ReceiptItem>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ReceiptItem>>> + Send + 'a>>;

    /// All unmatched line items for a receipt (spec §4.4.3 step 1).
    fn list_unmatched_for_receipt<'a>(&'a self, ctx: &'a RequestContext, receipt_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<ReceiptItem>>> + Send + 'a>>;

    /// All matched line items for a receipt, for `CreateInventoryFromReceipt`.
    fn list_matched_for_receipt<'a>(&'a self, ctx: &'a RequestContext, receipt_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<ReceiptItem>>> + Send + 'a>>;

    /// Page through every line item for a receipt.
    fn list_for_receipt<'a>(&'a self, ctx: &'a RequestContext, receipt_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ReceiptItem>>> + Send + 'a>>;

    /// Persist a mutated line item (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, item: ReceiptItem) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Persistence port for [`Shoppinglist`] (spec §3).
pub trait ShoppinglistRepository: Send + Sync {
    /// Insert a new list.
    fn create<'a>(&'a self, ctx: &'a RequestContext, list: Shoppinglist) -> Pin<Box<dyn Future<Output = Result<Shoppinglist>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Shoppinglist>>> + Send + 'a>>;

    /// Page through lists.
    fn list<'a>(&'a self, ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Shoppinglist>>> + Send + 'a>>;
}

/// Persistence port for [`ShoppinglistItem`] (spec §3).
pub trait ShoppinglistItemRepository: Send + Sync {
    /// Insert a new list item.
    fn create<'a>(&'a self, ctx: &'a RequestContext, item: ShoppinglistItem) -> Pin<Box<dyn Future<Output = Result<ShoppinglistItem>> + Send + 'a>>;

    /// Look up by id.
    fn get_by_id<'a>(&'a self, ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ShoppinglistItem>>> + Send + 'a>>;

    /// Page through a list's items.
    fn list_for_list<'a>(&'a self, ctx: &'a RequestContext, shoppinglist_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ShoppinglistItem>>> + Send + 'a>>;

    /// Persist a mutated list item (full-row overwrite).
    fn update<'a>(&'a self, ctx: &'a RequestContext, item: ShoppinglistItem) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Soft-delete by id.
    fn delete<'a>(&'a self, ctx: &'a RequestContext, id: &'a str, now: DateTime<Utc>) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
