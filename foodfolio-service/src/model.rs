//! Inventory/receipt aggregates (spec §3): `Item`, `ItemVariant`,
//! `ItemDetail`, `Receipt`/`ReceiptItem`, `Shoppinglist`/`ShoppinglistItem`.
//!
//! Per spec §9's circular-graph note, nothing here embeds its parent —
//! every reference is stored as an opaque id and resolved on demand
//! through the owning repository.

use chrono::{DateTime, Utc};
use composable_rust_core::model::SoftDeletable;

/// A catalog item, shared by every variant under it.
///
/// Minimal by design: the broader catalog (categories, sizes) lives
/// outside this service's owned aggregates (spec §3 names only the six
/// inventory/receipt aggregates below); `Item` is kept only because the
/// auto-match algorithm (spec §4.4.3) needs `variant.item.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Opaque id.
    pub id: String,
    /// Catalog display name, e.g. "Coca Cola".
    pub name: String,
    /// Optional category id, opaque (not locally resolved).
    pub category_id: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Item {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A purchasable variant of an [`Item`] (spec §3): a size/packaging, with
/// stock thresholds.
///
/// Invariant: when `max_sku > 0`, `min_sku < max_sku` (spec §3). A
/// `max_sku` of `0` means "no cap tracked." `current_stock` is not stored
/// here — it is derived from live (non-deleted) [`ItemDetail`] rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemVariant {
    /// Opaque id.
    pub id: String,
    /// The catalog item this variant belongs to.
    pub item_id: String,
    /// Optional size id, opaque (not locally resolved).
    pub size_id: Option<String>,
    /// Variant name, e.g. "0.33L".
    pub variant_name: String,
    /// Optional unique barcode.
    pub barcode: Option<String>,
    /// Low-stock threshold (non-negative).
    pub min_sku: i64,
    /// High-stock cap; `0` means untracked.
    pub max_sku: i64,
    /// Whether units of this variant are normally stored frozen.
    pub is_normally_frozen: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ItemVariant {
    /// `true` if `min_sku`/`max_sku` satisfy spec §3's invariant.
    #[must_use]
    pub fn has_valid_thresholds(&self) -> bool {
        self.min_sku >= 0 && self.max_sku >= 0 && (self.max_sku == 0 || self.min_sku < self.max_sku)
    }

    /// `true` if `current_stock` is at or below `min_sku` (spec §4.7).
    #[must_use]
    pub const fn is_low_stock(&self, current_stock: i64) -> bool {
        current_stock < self.min_sku
    }
}

impl SoftDeletable for ItemVariant {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// One physical unit of stock (spec §3). Deletion semantically means
/// "consumed."
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetail {
    /// Opaque id.
    pub id: String,
    /// The variant this unit belongs to.
    pub variant_id: String,
    /// Opaque warehouse id (not locally resolved).
    pub warehouse_id: String,
    /// Opaque location id (not locally resolved).
    pub location_id: String,
    /// When this unit was purchased.
    pub purchased_at: DateTime<Utc>,
    /// Optional expiry instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the unit's packaging has been opened.
    pub is_opened: bool,
    /// Whether the unit is currently stored frozen.
    pub is_frozen: bool,
    /// Purchase price for this single unit.
    pub purchase_price: f64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone; set once this unit is consumed.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for ItemDetail {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A scanned receipt (spec §3, §4.4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Opaque id.
    pub id: String,
    /// The warehouse this receipt's items arrived into.
    pub warehouse_id: String,
    /// When the receipt was scanned.
    pub scanned_at: DateTime<Utc>,
    /// Total price across every line item.
    pub total_price: f64,
    /// Raw OCR text, if the OCR engine produced any.
    pub ocr_text: Option<String>,
    /// Path to the stored receipt image, if any.
    pub image_path: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Receipt {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A free-text line item on a [`Receipt`] (spec §3, §4.4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptItem {
    /// Opaque id.
    pub id: String,
    /// The receipt this line belongs to.
    pub receipt_id: String,
    /// Free-text item name as read off the receipt.
    pub item_name: String,
    /// Quantity purchased.
    pub quantity: i64,
    /// Unit price.
    pub unit_price: f64,
    /// Total price (quantity × unit price, as printed).
    pub total_price: f64,
    /// Optional article number, if the receipt carries one.
    pub article_number: Option<String>,
    /// The catalog variant this line was auto-matched to, if any.
    pub item_variant_id: Option<String>,
    /// `true` once auto-match has paired this line with a variant.
    pub is_matched: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for ReceiptItem {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A named shopping list (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Shoppinglist {
    /// Opaque id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Shoppinglist {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// An item on a [`Shoppinglist`] (spec §3). Invariant: `quantity > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppinglistItem {
    /// Opaque id.
    pub id: String,
    /// The list this item belongs to.
    pub shoppinglist_id: String,
    /// The catalog variant requested.
    pub variant_id: String,
    /// Quantity requested; must be positive.
    pub quantity: i64,
    /// Whether this item has been purchased.
    pub is_purchased: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for ShoppinglistItem {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(min_sku: i64, max_sku: i64) -> ItemVariant {
        ItemVariant {
            id: "variant-1".into(),
            item_id: "item-1".into(),
            size_id: None,
            variant_name: "0.33L".into(),
            barcode: None,
            min_sku,
            max_sku,
            is_normally_frozen: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn thresholds_require_min_below_max_when_max_tracked() {
        assert!(variant(2, 10).has_valid_thresholds());
        assert!(variant(0, 0).has_valid_thresholds());
        assert!(!variant(10, 5).has_valid_thresholds());
        assert!(!variant(5, 5).has_valid_thresholds());
    }

    #[test]
    fn low_stock_is_strictly_below_min_sku() {
        let v = variant(3, 20);
        assert!(v.is_low_stock(2));
        assert!(!v.is_low_stock(3));
        assert!(!v.is_low_stock(4));
    }
}
