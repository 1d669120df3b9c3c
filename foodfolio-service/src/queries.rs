//! Read-side queries for the inventory/receipt aggregates (spec §4.2, §6).

use crate::model::{ItemDetail, ItemVariant, Receipt, ReceiptItem, ShoppinglistItem};
use composable_rust_core::error::Result;
use composable_rust_core::pagination::{Page, Paginated};
use composable_rust_core::{CoreError, Query};

/// Look up a variant by id.
#[derive(Debug, Default)]
pub struct GetItemVariant {
    /// The variant's id.
    pub id: String,
}

impl Query for GetItemVariant {
    type Output = ItemVariant;

    fn query_name(&self) -> &'static str {
        "GetItemVariant"
    }
}

/// Page through variants.
#[derive(Debug, Default)]
pub struct ListItemVariants {
    /// Pagination window.
    pub page: Page,
}

impl Query for ListItemVariants {
    type Output = Paginated<ItemVariant>;

    fn query_name(&self) -> &'static str {
        "ListItemVariants"
    }
}

/// Derived current stock for a variant (spec §3: live `ItemDetail` count).
#[derive(Debug, Default)]
pub struct GetCurrentStock {
    /// The variant to summarize.
    pub variant_id: String,
}

impl Query for GetCurrentStock {
    type Output = i64;

    fn query_name(&self) -> &'static str {
        "GetCurrentStock"
    }
}

/// Page through a variant's live units.
#[derive(Debug, Default)]
pub struct ListItemDetailsForVariant {
    /// The owning variant.
    pub variant_id: String,
    /// Pagination window.
    pub page: Page,
}

impl Query for ListItemDetailsForVariant {
    type Output = Paginated<ItemDetail>;

    fn query_name(&self) -> &'static str {
        "ListItemDetailsForVariant"
    }
}

/// Look up a receipt by id.
#[derive(Debug, Default)]
pub struct GetReceipt {
    /// The receipt's id.
    pub id: String,
}

impl Query for GetReceipt {
    type Output = Receipt;

    fn query_name(&self) -> &'static str {
        "GetReceipt"
    }
}

/// Page through a receipt's line items.
#[derive(Debug, Default)]
pub struct ListReceiptItemsForReceipt {
    /// The owning receipt.
    pub receipt_id: String,
    /// Pagination window.
    pub page: Page,
}

impl Query for ListReceiptItemsForReceipt {
    type Output = Paginated<ReceiptItem>;

    fn query_name(&self) -> &'static str {
        "ListReceiptItemsForReceipt"
    }
}

/// Page through a shopping list's items.
#[derive(Debug, Default)]
pub struct ListShoppinglistItems {
    /// The owning list.
    pub shoppinglist_id: String,
    /// Pagination window.
    pub page: Page,
}

impl Query for ListShoppinglistItems {
    type Output = Paginated<ShoppinglistItem>;

    fn query_name(&self) -> &'static str {
        "ListShoppinglistItems"
    }
}
