//! Domain events for the inventory/receipt aggregates (spec §4.7).
//!
//! Each variant publishes to its own `foodfolio.<aggregate>.<verb>` topic
//! via [`composable_rust_core::publisher::topic_for`].

use composable_rust_core::event::Event;
use serde::{Deserialize, Serialize};

/// A domain event raised by the inventory/receipt aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FoodfolioEvent {
    /// A new variant was created.
    VariantCreated {
        /// The variant's id.
        id: String,
        /// Its owning item's id.
        item_id: String,
    },
    /// An existing variant was updated.
    VariantUpdated {
        /// The variant's id.
        id: String,
    },
    /// Current stock for a variant reached zero.
    VariantStockEmpty {
        /// The variant's id.
        id: String,
    },
    /// Current stock for a variant dropped below its `min_sku`.
    VariantStockLow {
        /// The variant's id.
        id: String,
        /// Current stock at the time the threshold was crossed.
        current_stock: i64,
    },
    /// A new physical unit was recorded.
    ItemDetailCreated {
        /// The unit's id.
        id: String,
        /// The variant it belongs to.
        variant_id: String,
    },
    /// A unit's packaging was opened.
    ItemDetailOpened {
        /// The unit's id.
        id: String,
    },
    /// `is_frozen` flipped `false` → `true` on a unit.
    ItemDetailFrozen {
        /// The unit's id.
        id: String,
    },
    /// `is_frozen` flipped `true` → `false` on a unit.
    ItemDetailThawed {
        /// The unit's id.
        id: String,
    },
    /// A unit was consumed (soft-deleted).
    ItemDetailConsumed {
        /// The unit's id.
        id: String,
        /// The variant it belonged to.
        variant_id: String,
    },
    /// A receipt was scanned and its line items persisted.
    ReceiptScanned {
        /// The receipt's id.
        id: String,
        /// Number of line items the OCR engine produced.
        item_count: i64,
    },
    /// Auto-match finished running against a receipt.
    ReceiptMatched {
        /// The receipt's id.
        id: String,
        /// Line items successfully paired with a variant.
        matched_count: i64,
        /// Line items left unmatched.
        unmatched_count: i64,
    },
    /// A new shopping list was created.
    ShoppinglistCreated {
        /// The list's id.
        id: String,
    },
    /// An item was added to a shopping list.
    ShoppinglistItemAdded {
        /// The item's id.
        id: String,
        /// The owning list's id.
        shoppinglist_id: String,
    },
    /// A shopping-list item was marked purchased.
    ShoppinglistItemPurchased {
        /// The item's id.
        id: String,
    },
}

impl Event for FoodfolioEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::VariantCreated { .. } => "Foodfolio.VariantCreated.v1",
            Self::VariantUpdated { .. } => "Foodfolio.VariantUpdated.v1",
            Self::VariantStockEmpty { .. } => "Foodfolio.VariantStockEmpty.v1",
            Self::VariantStockLow { .. } => "Foodfolio.VariantStockLow.v1",
            Self::ItemDetailCreated { .. } => "Foodfolio.ItemDetailCreated.v1",
            Self::ItemDetailOpened { .. } => "Foodfolio.ItemDetailOpened.v1",
            Self::ItemDetailFrozen { .. } => "Foodfolio.ItemDetailFrozen.v1",
            Self::ItemDetailThawed { .. } => "Foodfolio.ItemDetailThawed.v1",
            Self::ItemDetailConsumed { .. } => "Foodfolio.ItemDetailConsumed.v1",
            Self::ReceiptScanned { .. } => "Foodfolio.ReceiptScanned.v1",
            Self::ReceiptMatched { .. } => "Foodfolio.ReceiptMatched.v1",
            Self::ShoppinglistCreated { .. } => "Foodfolio.ShoppinglistCreated.v1",
            Self::ShoppinglistItemAdded { .. } => "Foodfolio.ShoppinglistItemAdded.v1",
            Self::ShoppinglistItemPurchased { .. } => "Foodfolio.ShoppinglistItemPurchased.v1",
        }
    }
}

impl FoodfolioEvent {
    /// The topic this event publishes to, following
    /// `foodfolio.<aggregate>.<verb>`.
    #[must_use]
    pub fn topic(&self) -> String {
        let (aggregate, verb) = match self {
            Self::VariantCreated { .. } => ("variant", "created"),
            Self::VariantUpdated { .. } => ("variant", "updated"),
            Self::VariantStockEmpty { .. } => ("variant", "stock.empty"),
            Self::VariantStockLow { .. } => ("variant", "stock.low"),
            Self::ItemDetailCreated { .. } => ("item_detail", "created"),
            Self::ItemDetailOpened { .. } => ("item_detail", "opened"),
            Self::ItemDetailFrozen { .. } => ("item_detail", "frozen"),
            Self::ItemDetailThawed { .. } => ("item_detail", "thawed"),
            Self::ItemDetailConsumed { .. } => ("item_detail", "consumed"),
            Self::ReceiptScanned { .. } => ("receipt", "scanned"),
            Self::ReceiptMatched { .. } => ("receipt", "matched"),
            Self::ShoppinglistCreated { .. } => ("shoppinglist", "created"),
            Self::ShoppinglistItemAdded { .. } => ("shoppinglist_item", "added"),
            Self::ShoppinglistItemPurchased { .. } => ("shoppinglist_item", "purchased"),
        };
        composable_rust_core::publisher::topic_for("foodfolio", aggregate, verb)
    }

    /// The principal aggregate id carried by this event, used as the
    /// publish-time partitioning key.
    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        match self {
            Self::VariantCreated { id, .. }
            | Self::VariantUpdated { id }
            | Self::VariantStockEmpty { id }
            | Self::VariantStockLow { id, .. }
            | Self::ItemDetailCreated { id, .. }
            | Self::ItemDetailOpened { id }
            | Self::ItemDetailFrozen { id }
            | Self::ItemDetailThawed { id }
            | Self::ItemDetailConsumed { id, .. }
            | Self::ReceiptScanned { id, .. }
            | Self::ReceiptMatched { id, .. }
            | Self::ShoppinglistCreated { id }
            | Self::ShoppinglistItemAdded { id, .. }
            | Self::ShoppinglistItemPurchased { id } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_follow_service_aggregate_verb() {
        assert_eq!(
            FoodfolioEvent::VariantStockLow { id: "1".into(), current_stock: 0 }.topic(),
            "foodfolio.variant.stock.low"
        );
        assert_eq!(
            FoodfolioEvent::ItemDetailConsumed { id: "1".into(), variant_id: "v".into() }.topic(),
            "foodfolio.item_detail.consumed"
        );
        assert_eq!(
            FoodfolioEvent::ReceiptMatched { id: "1".into(), matched_count: 1, unmatched_count: 0 }.topic(),
            "foodfolio.receipt.matched"
        );
    }
}
