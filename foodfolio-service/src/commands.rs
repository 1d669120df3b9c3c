//! Commands mutating the inventory/receipt aggregates (spec §4.1, §4.4,
//! §4.4.3, §6).

use crate::model::{Item, ItemDetail, ItemVariant, Receipt, Shoppinglist, ShoppinglistItem};
use chrono::{DateTime, Utc};
use composable_rust_core::error::Result;
use composable_rust_core::patch::Patch;
use composable_rust_core::{Command, CoreError};

/// Create a new catalog item.
#[derive(Debug, Default)]
pub struct CreateItem {
    /// Display name.
    pub name: String,
    /// Optional category id.
    pub category_id: Option<String>,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created item, written back by the handler on success.
    pub created: Option<Item>,
}

impl Command for CreateItem {
    fn command_name(&self) -> &'static str {
        "CreateItem"
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("name must not be empty"));
        }
        Ok(())
    }
}

/// Create a new variant under an item (spec §3).
#[derive(Debug, Default)]
pub struct CreateItemVariant {
    /// The owning item.
    pub item_id: String,
    /// Optional size id.
    pub size_id: Option<String>,
    /// Variant name, e.g. "0.33L".
    pub variant_name: String,
    /// Optional unique barcode.
    pub barcode: Option<String>,
    /// Low-stock threshold.
    pub min_sku: i64,
    /// High-stock cap; `0` means untracked.
    pub max_sku: i64,
    /// Whether units of this variant are normally stored frozen.
    pub is_normally_frozen: bool,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created variant, written back by the handler on success.
    pub created: Option<ItemVariant>,
}

impl Command for CreateItemVariant {
    fn command_name(&self) -> &'static str {
        "CreateItemVariant"
    }

    fn validate(&self) -> Result<()> {
        if self.item_id.trim().is_empty() {
            return Err(CoreError::invalid("item_id must not be empty"));
        }
        if self.variant_name.trim().is_empty() {
            return Err(CoreError::invalid("variant_name must not be empty"));
        }
        if self.min_sku < 0 || self.max_sku < 0 {
            return Err(CoreError::invalid("min_sku and max_sku must be non-negative"));
        }
        if self.max_sku > 0 && self.min_sku >= self.max_sku {
            return Err(CoreError::invalid("min_sku must be less than max_sku"));
        }
        Ok(())
    }
}

/// Update present fields on an existing variant (spec §4.4 explicit-presence).
#[derive(Debug, Default)]
pub struct UpdateItemVariant {
    /// The variant to update.
    pub id: String,
    /// New variant name, if present.
    pub variant_name: Patch<String>,
    /// New barcode, or leave/clear.
    pub barcode: Patch<String>,
    /// New low-stock threshold, if present.
    pub min_sku: Patch<i64>,
    /// New high-stock cap, if present.
    pub max_sku: Patch<i64>,
    /// New normally-frozen flag, if present.
    pub is_normally_frozen: Patch<bool>,
}

impl Command for UpdateItemVariant {
    fn command_name(&self) -> &'static str {
        "UpdateItemVariant"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Soft-delete a variant.
#[derive(Debug, Default)]
pub struct DeleteItemVariant {
    /// The variant to delete.
    pub id: String,
}

impl Command for DeleteItemVariant {
    fn command_name(&self) -> &'static str {
        "DeleteItemVariant"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Record a new physical unit of stock against a variant (spec §3).
#[derive(Debug, Default)]
pub struct CreateItemDetail {
    /// The variant this unit belongs to.
    pub variant_id: String,
    /// The warehouse it arrived into.
    pub warehouse_id: String,
    /// The shelf/location it was placed in.
    pub location_id: String,
    /// When this unit was purchased.
    pub purchased_at: DateTime<Utc>,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the unit is stored opened already.
    pub is_opened: bool,
    /// Whether the unit is stored frozen already.
    pub is_frozen: bool,
    /// Purchase price for this single unit.
    pub purchase_price: f64,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created unit, written back by the handler on success.
    pub created: Option<ItemDetail>,
}

impl Command for CreateItemDetail {
    fn command_name(&self) -> &'static str {
        "CreateItemDetail"
    }

    fn validate(&self) -> Result<()> {
        if self.variant_id.trim().is_empty() {
            return Err(CoreError::invalid("variant_id must not be empty"));
        }
        if self.warehouse_id.trim().is_empty() {
            return Err(CoreError::invalid("warehouse_id must not be empty"));
        }
        if self.location_id.trim().is_empty() {
            return Err(CoreError::invalid("location_id must not be empty"));
        }
        Ok(())
    }
}

/// Update present fields on a unit, including opened/frozen transitions
/// (spec §4.4's "activated/deactivated"-style transition events, applied
/// here to `is_opened`/`is_frozen`).
#[derive(Debug, Default)]
pub struct UpdateItemDetail {
    /// The unit to update.
    pub id: String,
    /// New expiry, or leave/clear.
    pub expires_at: Patch<DateTime<Utc>>,
    /// Flip `is_opened`, if present.
    pub is_opened: Patch<bool>,
    /// Flip `is_frozen`, if present.
    pub is_frozen: Patch<bool>,
}

impl Command for UpdateItemDetail {
    fn command_name(&self) -> &'static str {
        "UpdateItemDetail"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Consume (soft-delete) a unit of stock.
#[derive(Debug, Default)]
pub struct ConsumeItemDetail {
    /// The unit to consume.
    pub id: String,
}

impl Command for ConsumeItemDetail {
    fn command_name(&self) -> &'static str {
        "ConsumeItemDetail"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Upload a scanned receipt (spec §6): triggers OCR, persists line items,
/// and internally dispatches [`AutoMatchReceipt`] at the default threshold.
#[derive(Debug, Default)]
pub struct UploadReceipt {
    /// The warehouse these items arrived into.
    pub warehouse_id: String,
    /// The raw receipt image bytes.
    pub image_bytes: Vec<u8>,
    /// Original filename, used for logging and `image_path`.
    pub filename: String,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created receipt, written back by the handler on success.
    pub created: Option<Receipt>,
    /// Line items matched by the internal auto-match pass.
    pub matched_count: Option<i64>,
    /// Line items left unmatched by the internal auto-match pass.
    pub unmatched_count: Option<i64>,
}

impl Command for UploadReceipt {
    fn command_name(&self) -> &'static str {
        "UploadReceipt"
    }

    fn validate(&self) -> Result<()> {
        if self.warehouse_id.trim().is_empty() {
            return Err(CoreError::invalid("warehouse_id must not be empty"));
        }
        if self.image_bytes.is_empty() {
            return Err(CoreError::invalid("image_bytes must not be empty"));
        }
        Ok(())
    }
}

/// Default similarity threshold used by [`UploadReceipt`]'s internal
/// auto-match pass (spec §4.4.3).
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.70;

/// Run receipt auto-match (spec §4.4.3, notable algorithm). Dispatched
/// internally by [`UploadReceipt`], but also exposed as its own command so
/// it can be re-run (e.g. after new variants are added).
#[derive(Debug)]
pub struct AutoMatchReceipt {
    /// The receipt to match.
    pub receipt_id: String,
    /// Similarity threshold in `(0, 1]`.
    pub threshold: f64,
    /// Written back by the handler: items paired with a variant.
    pub matched_count: Option<i64>,
    /// Written back by the handler: items left unmatched.
    pub unmatched_count: Option<i64>,
}

impl Default for AutoMatchReceipt {
    fn default() -> Self {
        Self {
            receipt_id: String::new(),
            threshold: DEFAULT_MATCH_THRESHOLD,
            matched_count: None,
            unmatched_count: None,
        }
    }
}

impl Command for AutoMatchReceipt {
    fn command_name(&self) -> &'static str {
        "AutoMatchReceipt"
    }

    fn validate(&self) -> Result<()> {
        if self.receipt_id.trim().is_empty() {
            return Err(CoreError::invalid("receipt_id must not be empty"));
        }
        if self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(CoreError::invalid("threshold must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Materialize `ItemDetail` rows from a receipt's line items (spec §6).
///
/// Per spec §9's design note, both toggle states skip items without a
/// matched variant — a matched `item_variant_id` is required to produce
/// an `ItemDetail`, even when `only_matched` is `false`. This is
/// implemented literally; see `DESIGN.md`.
#[derive(Debug, Default)]
pub struct CreateInventoryFromReceipt {
    /// The receipt to materialize.
    pub receipt_id: String,
    /// The location to file every created unit under.
    pub location_id: String,
    /// Expiry applied to every created unit when the variant itself
    /// carries none.
    pub default_expiry: Option<DateTime<Utc>>,
    /// Present for parity with the spec's RPC shape; per the design note
    /// above this does not change which items are eligible.
    pub only_matched: bool,
    /// Written back by the handler: number of `ItemDetail` rows created.
    pub created_count: Option<i64>,
}

impl Command for CreateInventoryFromReceipt {
    fn command_name(&self) -> &'static str {
        "CreateInventoryFromReceipt"
    }

    fn validate(&self) -> Result<()> {
        if self.receipt_id.trim().is_empty() {
            return Err(CoreError::invalid("receipt_id must not be empty"));
        }
        if self.location_id.trim().is_empty() {
            return Err(CoreError::invalid("location_id must not be empty"));
        }
        Ok(())
    }
}

/// Create a new shopping list.
#[derive(Debug, Default)]
pub struct CreateShoppinglist {
    /// Display name.
    pub name: String,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created list, written back by the handler on success.
    pub created: Option<Shoppinglist>,
}

impl Command for CreateShoppinglist {
    fn command_name(&self) -> &'static str {
        "CreateShoppinglist"
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("name must not be empty"));
        }
        Ok(())
    }
}

/// Add an item to a shopping list (spec §3: `quantity > 0`).
#[derive(Debug, Default)]
pub struct AddShoppinglistItem {
    /// The owning list.
    pub shoppinglist_id: String,
    /// The catalog variant requested.
    pub variant_id: String,
    /// Quantity requested; must be positive.
    pub quantity: i64,
    /// Written back by the handler on success.
    pub aggregate_id: Option<String>,
    /// The created item, written back by the handler on success.
    pub created: Option<ShoppinglistItem>,
}

impl Command for AddShoppinglistItem {
    fn command_name(&self) -> &'static str {
        "AddShoppinglistItem"
    }

    fn validate(&self) -> Result<()> {
        if self.shoppinglist_id.trim().is_empty() {
            return Err(CoreError::invalid("shoppinglist_id must not be empty"));
        }
        if self.variant_id.trim().is_empty() {
            return Err(CoreError::invalid("variant_id must not be empty"));
        }
        if self.quantity <= 0 {
            return Err(CoreError::invalid("quantity must be positive"));
        }
        Ok(())
    }
}

/// Mark a shopping-list item purchased.
#[derive(Debug, Default)]
pub struct MarkShoppinglistItemPurchased {
    /// The item to mark.
    pub id: String,
}

impl Command for MarkShoppinglistItemPurchased {
    fn command_name(&self) -> &'static str {
        "MarkShoppinglistItemPurchased"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}

/// Soft-delete a shopping-list item.
#[derive(Debug, Default)]
pub struct DeleteShoppinglistItem {
    /// The item to delete.
    pub id: String,
}

impl Command for DeleteShoppinglistItem {
    fn command_name(&self) -> &'static str {
        "DeleteShoppinglistItem"
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid("id must not be empty"));
        }
        Ok(())
    }
}
