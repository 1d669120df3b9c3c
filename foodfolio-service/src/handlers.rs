//! Command/query handlers for the inventory/receipt service (spec §4.4,
//! §4.4.3).

use crate::commands::{
    AddShoppinglistItem, AutoMatchReceipt, ConsumeItemDetail, CreateInventoryFromReceipt,
    CreateItem, CreateItemDetail, CreateItemVariant, CreateShoppinglist, DeleteItemVariant,
    DeleteShoppinglistItem, MarkShoppinglistItemPurchased, UpdateItemDetail, UpdateItemVariant,
    UploadReceipt, DEFAULT_MATCH_THRESHOLD,
};
use crate::events::FoodfolioEvent;
use crate::fuzzy;
use crate::model::{Item, ItemDetail, ItemVariant, Receipt, ReceiptItem, Shoppinglist, ShoppinglistItem};
use crate::ocr::OcrEngine;
use crate::queries::{
    GetCurrentStock, GetItemVariant, GetReceipt, ListItemDetailsForVariant, ListItemVariants,
    ListReceiptItemsForReceipt, ListShoppinglistItems,
};
use crate::repository::{
    ItemDetailRepository, ItemRepository, ItemVariantRepository, ReceiptItemRepository,
    ReceiptRepository, ShoppinglistItemRepository, ShoppinglistRepository,
};
use chrono::Utc;
use composable_rust_core::bus::CommandBus;
use composable_rust_core::command::CommandHandler;
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::Result;
use composable_rust_core::model::new_id;
use composable_rust_core::pagination::{Page, Paginated};
use composable_rust_core::publisher::EventPublisher;
use composable_rust_core::query::QueryHandler;
use composable_rust_core::CoreError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Page size used when paging through auto-match candidates (spec §4.4.3).
const MATCH_CANDIDATE_PAGE_SIZE: i64 = 100;

/// Upper bound on the number of candidates ever considered for a single
/// auto-match pass (spec §4.4.3).
const MATCH_CANDIDATE_MAX: i64 = 100;

async fn check_stock_thresholds(
    variants: &Arc<dyn ItemVariantRepository>,
    details: &Arc<dyn ItemDetailRepository>,
    events: &Arc<EventPublisher>,
    ctx: &RequestContext,
    variant_id: &str,
) -> Result<()> {
    let Some(variant) = variants.get_by_id(ctx, variant_id).await? else {
        return Ok(());
    };
    let current_stock = details.count_active_for_variant(ctx, variant_id).await?;

    if current_stock == 0 {
        let event = FoodfolioEvent::VariantStockEmpty { id: variant.id.clone() };
        events.publish(&event.topic(), &variant.id, &event).await;
    } else if variant.is_low_stock(current_stock) {
        let event = FoodfolioEvent::VariantStockLow { id: variant.id.clone(), current_stock };
        events.publish(&event.topic(), &variant.id, &event).await;
    }
    Ok(())
}

/// Handles [`CreateItem`] (spec §3).
pub struct CreateItemHandler {
    items: Arc<dyn ItemRepository>,
}

impl CreateItemHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(items: Arc<dyn ItemRepository>) -> Self {
        Self { items }
    }
}

impl CommandHandler<CreateItem> for CreateItemHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateItem,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();
            let item = Item {
                id: new_id(),
                name: cmd.name.clone(),
                category_id: cmd.category_id.clone(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            let created = self.items.create(ctx, item).await?;
            cmd.aggregate_id = Some(created.id.clone());
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`CreateItemVariant`] (spec §3, §4.4).
pub struct CreateItemVariantHandler {
    variants: Arc<dyn ItemVariantRepository>,
    events: Arc<EventPublisher>,
}

impl CreateItemVariantHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(variants: Arc<dyn ItemVariantRepository>, events: Arc<EventPublisher>) -> Self {
        Self { variants, events }
    }
}

impl CommandHandler<CreateItemVariant> for CreateItemVariantHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateItemVariant,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            if let Some(barcode) = &cmd.barcode {
                if self.variants.barcode_exists(ctx, barcode).await? {
                    return Err(CoreError::conflict("barcode"));
                }
            }

            let now = Utc::now();
            let variant = ItemVariant {
                id: new_id(),
                item_id: cmd.item_id.clone(),
                size_id: cmd.size_id.clone(),
                variant_name: cmd.variant_name.clone(),
                barcode: cmd.barcode.clone(),
                min_sku: cmd.min_sku,
                max_sku: cmd.max_sku,
                is_normally_frozen: cmd.is_normally_frozen,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            if !variant.has_valid_thresholds() {
                return Err(CoreError::invalid("min_sku must be less than max_sku when max_sku is tracked"));
            }

            let created = self.variants.create(ctx, variant).await?;
            let event = FoodfolioEvent::VariantCreated { id: created.id.clone(), item_id: created.item_id.clone() };
            self.events.publish(&event.topic(), &created.id, &event).await;

            cmd.aggregate_id = Some(created.id.clone());
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`UpdateItemVariant`] (spec §4.4 explicit-presence update).
pub struct UpdateItemVariantHandler {
    variants: Arc<dyn ItemVariantRepository>,
    details: Arc<dyn ItemDetailRepository>,
    events: Arc<EventPublisher>,
}

impl UpdateItemVariantHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        variants: Arc<dyn ItemVariantRepository>,
        details: Arc<dyn ItemDetailRepository>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self { variants, details, events }
    }
}

impl CommandHandler<UpdateItemVariant> for UpdateItemVariantHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut UpdateItemVariant,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let mut variant = self
                .variants
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ItemVariant"))?;

            cmd.variant_name.clone().apply_to(&mut variant.variant_name);
            cmd.barcode.clone().apply_to_option(&mut variant.barcode);
            cmd.min_sku.clone().apply_to(&mut variant.min_sku);
            cmd.max_sku.clone().apply_to(&mut variant.max_sku);
            cmd.is_normally_frozen.clone().apply_to(&mut variant.is_normally_frozen);
            if !variant.has_valid_thresholds() {
                return Err(CoreError::invalid("min_sku must be less than max_sku when max_sku is tracked"));
            }
            variant.updated_at = Utc::now();

            self.variants.update(ctx, variant.clone()).await?;
            let event = FoodfolioEvent::VariantUpdated { id: variant.id.clone() };
            self.events.publish(&event.topic(), &variant.id, &event).await;

            check_stock_thresholds(&self.variants, &self.details, &self.events, ctx, &variant.id).await?;
            Ok(())
        })
    }
}

/// Handles [`DeleteItemVariant`] (soft-delete).
pub struct DeleteItemVariantHandler {
    variants: Arc<dyn ItemVariantRepository>,
}

impl DeleteItemVariantHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(variants: Arc<dyn ItemVariantRepository>) -> Self {
        Self { variants }
    }
}

impl CommandHandler<DeleteItemVariant> for DeleteItemVariantHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut DeleteItemVariant,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let mut variant = self
                .variants
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ItemVariant"))?;
            variant.deleted_at = Some(Utc::now());
            variant.updated_at = Utc::now();
            self.variants.update(ctx, variant).await
        })
    }
}

/// Handles [`CreateItemDetail`] (spec §3, §4.7).
pub struct CreateItemDetailHandler {
    variants: Arc<dyn ItemVariantRepository>,
    details: Arc<dyn ItemDetailRepository>,
    events: Arc<EventPublisher>,
}

impl CreateItemDetailHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        variants: Arc<dyn ItemVariantRepository>,
        details: Arc<dyn ItemDetailRepository>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self { variants, details, events }
    }
}

impl CommandHandler<CreateItemDetail> for CreateItemDetailHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateItemDetail,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            if self.variants.get_by_id(ctx, &cmd.variant_id).await?.is_none() {
                return Err(CoreError::not_found("ItemVariant"));
            }

            let now = Utc::now();
            let detail = ItemDetail {
                id: new_id(),
                variant_id: cmd.variant_id.clone(),
                warehouse_id: cmd.warehouse_id.clone(),
                location_id: cmd.location_id.clone(),
                purchased_at: cmd.purchased_at,
                expires_at: cmd.expires_at,
                is_opened: cmd.is_opened,
                is_frozen: cmd.is_frozen,
                purchase_price: cmd.purchase_price,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            let created = self.details.create(ctx, detail).await?;
            let event = FoodfolioEvent::ItemDetailCreated { id: created.id.clone(), variant_id: created.variant_id.clone() };
            self.events.publish(&event.topic(), &created.id, &event).await;

            check_stock_thresholds(&self.variants, &self.details, &self.events, ctx, &created.variant_id).await?;

            cmd.aggregate_id = Some(created.id.clone());
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`UpdateItemDetail`], including opened/frozen/thawed transitions
/// (spec §4.4).
pub struct UpdateItemDetailHandler {
    details: Arc<dyn ItemDetailRepository>,
    events: Arc<EventPublisher>,
}

impl UpdateItemDetailHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(details: Arc<dyn ItemDetailRepository>, events: Arc<EventPublisher>) -> Self {
        Self { details, events }
    }
}

impl CommandHandler<UpdateItemDetail> for UpdateItemDetailHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut UpdateItemDetail,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let mut detail = self
                .details
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ItemDetail"))?;

            let was_opened = detail.is_opened;
            let was_frozen = detail.is_frozen;

            cmd.expires_at.clone().apply_to_option(&mut detail.expires_at);
            cmd.is_opened.clone().apply_to(&mut detail.is_opened);
            cmd.is_frozen.clone().apply_to(&mut detail.is_frozen);
            detail.updated_at = Utc::now();

            self.details.update(ctx, detail.clone()).await?;

            if !was_opened && detail.is_opened {
                let event = FoodfolioEvent::ItemDetailOpened { id: detail.id.clone() };
                self.events.publish(&event.topic(), &detail.id, &event).await;
            }
            if !was_frozen && detail.is_frozen {
                let event = FoodfolioEvent::ItemDetailFrozen { id: detail.id.clone() };
                self.events.publish(&event.topic(), &detail.id, &event).await;
            } else if was_frozen && !detail.is_frozen {
                let event = FoodfolioEvent::ItemDetailThawed { id: detail.id.clone() };
                self.events.publish(&event.topic(), &detail.id, &event).await;
            }
            Ok(())
        })
    }
}

/// Handles [`ConsumeItemDetail`] (soft-delete; spec §4.7 stock-threshold
/// recheck).
pub struct ConsumeItemDetailHandler {
    variants: Arc<dyn ItemVariantRepository>,
    details: Arc<dyn ItemDetailRepository>,
    events: Arc<EventPublisher>,
}

impl ConsumeItemDetailHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        variants: Arc<dyn ItemVariantRepository>,
        details: Arc<dyn ItemDetailRepository>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self { variants, details, events }
    }
}

impl CommandHandler<ConsumeItemDetail> for ConsumeItemDetailHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut ConsumeItemDetail,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let detail = self
                .details
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ItemDetail"))?;

            let now = Utc::now();
            self.details.delete(ctx, &cmd.id, now).await?;

            let event = FoodfolioEvent::ItemDetailConsumed { id: detail.id.clone(), variant_id: detail.variant_id.clone() };
            self.events.publish(&event.topic(), &detail.id, &event).await;

            check_stock_thresholds(&self.variants, &self.details, &self.events, ctx, &detail.variant_id).await?;
            Ok(())
        })
    }
}

/// Handles [`UploadReceipt`] (spec §6): runs OCR, persists the receipt and
/// its line items, then internally dispatches [`AutoMatchReceipt`].
pub struct UploadReceiptHandler {
    receipts: Arc<dyn ReceiptRepository>,
    receipt_items: Arc<dyn ReceiptItemRepository>,
    ocr: Arc<dyn OcrEngine>,
    events: Arc<EventPublisher>,
    commands: Arc<CommandBus>,
}

impl UploadReceiptHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        receipts: Arc<dyn ReceiptRepository>,
        receipt_items: Arc<dyn ReceiptItemRepository>,
        ocr: Arc<dyn OcrEngine>,
        events: Arc<EventPublisher>,
        commands: Arc<CommandBus>,
    ) -> Self {
        Self { receipts, receipt_items, ocr, events, commands }
    }
}

impl CommandHandler<UploadReceipt> for UploadReceiptHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut UploadReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let (line_items, ocr_text) = self.ocr.extract_items(&cmd.image_bytes, &cmd.filename).await?;

            let now = Utc::now();
            let total_price = line_items.iter().map(|li| li.total_price).sum();
            let receipt = Receipt {
                id: new_id(),
                warehouse_id: cmd.warehouse_id.clone(),
                scanned_at: now,
                total_price,
                ocr_text,
                image_path: Some(cmd.filename.clone()),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            let created_receipt = self.receipts.create(ctx, receipt).await?;

            for line in &line_items {
                let item = ReceiptItem {
                    id: new_id(),
                    receipt_id: created_receipt.id.clone(),
                    item_name: line.item_name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total_price: line.total_price,
                    article_number: line.article_number.clone(),
                    item_variant_id: None,
                    is_matched: false,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                };
                self.receipt_items.create(ctx, item).await?;
            }

            let event = FoodfolioEvent::ReceiptScanned {
                id: created_receipt.id.clone(),
                item_count: i64::try_from(line_items.len()).unwrap_or(i64::MAX),
            };
            self.events.publish(&event.topic(), &created_receipt.id, &event).await;

            let mut auto_match = AutoMatchReceipt {
                receipt_id: created_receipt.id.clone(),
                threshold: DEFAULT_MATCH_THRESHOLD,
                matched_count: None,
                unmatched_count: None,
            };
            self.commands.dispatch(ctx, &mut auto_match).await?;

            cmd.aggregate_id = Some(created_receipt.id.clone());
            cmd.matched_count = auto_match.matched_count;
            cmd.unmatched_count = auto_match.unmatched_count;
            cmd.created = Some(created_receipt);
            Ok(())
        })
    }
}

/// Handles [`AutoMatchReceipt`] (spec §4.4.3, the notable algorithm):
///
/// 1. Load the receipt's unmatched line items.
/// 2. Page through variant candidates (page size 100, up to 100 candidates
///    considered).
/// 3. Score each candidate against the line item's text via
///    [`fuzzy::calculate_similarity`].
/// 4. Pick the best-scoring candidate at or above the threshold
///    (first-encountered wins on a tie).
/// 5. Persist the match, or leave the item unmatched.
pub struct AutoMatchReceiptHandler {
    receipts: Arc<dyn ReceiptRepository>,
    receipt_items: Arc<dyn ReceiptItemRepository>,
    variants: Arc<dyn ItemVariantRepository>,
    events: Arc<EventPublisher>,
}

impl AutoMatchReceiptHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        receipts: Arc<dyn ReceiptRepository>,
        receipt_items: Arc<dyn ReceiptItemRepository>,
        variants: Arc<dyn ItemVariantRepository>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self { receipts, receipt_items, variants, events }
    }

    async fn load_candidates(&self, ctx: &RequestContext) -> Result<Vec<(String, String)>> {
        let mut candidates = Vec::new();
        let mut offset = 0_i64;
        while i64::try_from(candidates.len()).unwrap_or(i64::MAX) < MATCH_CANDIDATE_MAX {
            let page = Page::new(offset, MATCH_CANDIDATE_PAGE_SIZE);
            let batch = self.variants.list_match_candidates(ctx, page).await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            for candidate in batch {
                candidates.push((candidate.variant_id, candidate.search_text));
                if i64::try_from(candidates.len()).unwrap_or(i64::MAX) >= MATCH_CANDIDATE_MAX {
                    break;
                }
            }
            offset += i64::try_from(batch_len).unwrap_or(MATCH_CANDIDATE_PAGE_SIZE);
        }
        Ok(candidates)
    }
}

impl CommandHandler<AutoMatchReceipt> for AutoMatchReceiptHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut AutoMatchReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            if self.receipts.get_by_id(ctx, &cmd.receipt_id).await?.is_none() {
                return Err(CoreError::not_found("Receipt"));
            }

            let unmatched = self.receipt_items.list_unmatched_for_receipt(ctx, &cmd.receipt_id).await?;
            let candidates = self.load_candidates(ctx).await?;

            let mut matched_count = 0_i64;
            let mut unmatched_count = 0_i64;

            for mut item in unmatched {
                let best = fuzzy::find_best_match(&item.item_name, &candidates, cmd.threshold);
                match best {
                    Some(idx) => {
                        item.item_variant_id = Some(candidates[idx].0.clone());
                        item.is_matched = true;
                        item.updated_at = Utc::now();
                        self.receipt_items.update(ctx, item).await?;
                        matched_count += 1;
                    }
                    None => {
                        unmatched_count += 1;
                    }
                }
            }

            let event = FoodfolioEvent::ReceiptMatched { id: cmd.receipt_id.clone(), matched_count, unmatched_count };
            self.events.publish(&event.topic(), &cmd.receipt_id, &event).await;

            cmd.matched_count = Some(matched_count);
            cmd.unmatched_count = Some(unmatched_count);
            Ok(())
        })
    }
}

/// Handles [`CreateInventoryFromReceipt`] (spec §6, §9).
///
/// Per the design note on [`CreateInventoryFromReceipt`], items without a
/// matched variant are skipped regardless of `only_matched` — implemented
/// literally here.
pub struct CreateInventoryFromReceiptHandler {
    receipts: Arc<dyn ReceiptRepository>,
    receipt_items: Arc<dyn ReceiptItemRepository>,
    variants: Arc<dyn ItemVariantRepository>,
    details: Arc<dyn ItemDetailRepository>,
    events: Arc<EventPublisher>,
}

impl CreateInventoryFromReceiptHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        receipts: Arc<dyn ReceiptRepository>,
        receipt_items: Arc<dyn ReceiptItemRepository>,
        variants: Arc<dyn ItemVariantRepository>,
        details: Arc<dyn ItemDetailRepository>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self { receipts, receipt_items, variants, details, events }
    }
}

impl CommandHandler<CreateInventoryFromReceipt> for CreateInventoryFromReceiptHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateInventoryFromReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let receipt = self
                .receipts
                .get_by_id(ctx, &cmd.receipt_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Receipt"))?;
            let matched = self.receipt_items.list_matched_for_receipt(ctx, &cmd.receipt_id).await?;

            let now = Utc::now();
            let mut created_count = 0_i64;

            for line in matched {
                let Some(variant_id) = line.item_variant_id.clone() else {
                    continue;
                };
                let Some(variant) = self.variants.get_by_id(ctx, &variant_id).await? else {
                    continue;
                };

                for _ in 0..line.quantity.max(1) {
                    let detail = ItemDetail {
                        id: new_id(),
                        variant_id: variant.id.clone(),
                        warehouse_id: receipt.warehouse_id.clone(),
                        location_id: cmd.location_id.clone(),
                        purchased_at: now,
                        expires_at: cmd.default_expiry,
                        is_opened: false,
                        is_frozen: variant.is_normally_frozen,
                        purchase_price: line.unit_price,
                        created_at: now,
                        updated_at: now,
                        deleted_at: None,
                    };
                    let created = self.details.create(ctx, detail).await?;
                    let event = FoodfolioEvent::ItemDetailCreated { id: created.id.clone(), variant_id: created.variant_id.clone() };
                    self.events.publish(&event.topic(), &created.id, &event).await;
                    created_count += 1;
                }
            }

            cmd.created_count = Some(created_count);
            Ok(())
        })
    }
}

/// Handles [`CreateShoppinglist`].
pub struct CreateShoppinglistHandler {
    lists: Arc<dyn ShoppinglistRepository>,
    events: Arc<EventPublisher>,
}

impl CreateShoppinglistHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(lists: Arc<dyn ShoppinglistRepository>, events: Arc<EventPublisher>) -> Self {
        Self { lists, events }
    }
}

impl CommandHandler<CreateShoppinglist> for CreateShoppinglistHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateShoppinglist,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();
            let list = Shoppinglist {
                id: new_id(),
                name: cmd.name.clone(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            let created = self.lists.create(ctx, list).await?;
            let event = FoodfolioEvent::ShoppinglistCreated { id: created.id.clone() };
            self.events.publish(&event.topic(), &created.id, &event).await;

            cmd.aggregate_id = Some(created.id.clone());
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`AddShoppinglistItem`].
pub struct AddShoppinglistItemHandler {
    lists: Arc<dyn ShoppinglistRepository>,
    items: Arc<dyn ShoppinglistItemRepository>,
    events: Arc<EventPublisher>,
}

impl AddShoppinglistItemHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        lists: Arc<dyn ShoppinglistRepository>,
        items: Arc<dyn ShoppinglistItemRepository>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self { lists, items, events }
    }
}

impl CommandHandler<AddShoppinglistItem> for AddShoppinglistItemHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut AddShoppinglistItem,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            if self.lists.get_by_id(ctx, &cmd.shoppinglist_id).await?.is_none() {
                return Err(CoreError::not_found("Shoppinglist"));
            }

            let now = Utc::now();
            let item = ShoppinglistItem {
                id: new_id(),
                shoppinglist_id: cmd.shoppinglist_id.clone(),
                variant_id: cmd.variant_id.clone(),
                quantity: cmd.quantity,
                is_purchased: false,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            let created = self.items.create(ctx, item).await?;
            let event = FoodfolioEvent::ShoppinglistItemAdded {
                id: created.id.clone(),
                shoppinglist_id: created.shoppinglist_id.clone(),
            };
            self.events.publish(&event.topic(), &created.id, &event).await;

            cmd.aggregate_id = Some(created.id.clone());
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`MarkShoppinglistItemPurchased`].
pub struct MarkShoppinglistItemPurchasedHandler {
    items: Arc<dyn ShoppinglistItemRepository>,
    events: Arc<EventPublisher>,
}

impl MarkShoppinglistItemPurchasedHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(items: Arc<dyn ShoppinglistItemRepository>, events: Arc<EventPublisher>) -> Self {
        Self { items, events }
    }
}

impl CommandHandler<MarkShoppinglistItemPurchased> for MarkShoppinglistItemPurchasedHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut MarkShoppinglistItemPurchased,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let mut item = self
                .items
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ShoppinglistItem"))?;
            item.is_purchased = true;
            item.updated_at = Utc::now();
            self.items.update(ctx, item.clone()).await?;

            let event = FoodfolioEvent::ShoppinglistItemPurchased { id: item.id.clone() };
            self.events.publish(&event.topic(), &item.id, &event).await;
            Ok(())
        })
    }
}

/// Handles [`DeleteShoppinglistItem`] (soft-delete).
pub struct DeleteShoppinglistItemHandler {
    items: Arc<dyn ShoppinglistItemRepository>,
}

impl DeleteShoppinglistItemHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(items: Arc<dyn ShoppinglistItemRepository>) -> Self {
        Self { items }
    }
}

impl CommandHandler<DeleteShoppinglistItem> for DeleteShoppinglistItemHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut DeleteShoppinglistItem,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            if self.items.get_by_id(ctx, &cmd.id).await?.is_none() {
                return Err(CoreError::not_found("ShoppinglistItem"));
            }
            self.items.delete(ctx, &cmd.id, Utc::now()).await
        })
    }
}

/// Handles [`GetItemVariant`].
pub struct GetItemVariantHandler {
    variants: Arc<dyn ItemVariantRepository>,
}

impl GetItemVariantHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(variants: Arc<dyn ItemVariantRepository>) -> Self {
        Self { variants }
    }
}

impl QueryHandler<GetItemVariant> for GetItemVariantHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a GetItemVariant,
    ) -> Pin<Box<dyn Future<Output = Result<ItemVariant>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.variants
                .get_by_id(ctx, &query.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ItemVariant"))
        })
    }
}

/// Handles [`ListItemVariants`].
pub struct ListItemVariantsHandler {
    variants: Arc<dyn ItemVariantRepository>,
}

impl ListItemVariantsHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(variants: Arc<dyn ItemVariantRepository>) -> Self {
        Self { variants }
    }
}

impl QueryHandler<ListItemVariants> for ListItemVariantsHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListItemVariants,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemVariant>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.variants.list(ctx, query.page).await
        })
    }
}

/// Handles [`GetCurrentStock`] (spec §3: derived live-unit count).
pub struct GetCurrentStockHandler {
    details: Arc<dyn ItemDetailRepository>,
}

impl GetCurrentStockHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(details: Arc<dyn ItemDetailRepository>) -> Self {
        Self { details }
    }
}

impl QueryHandler<GetCurrentStock> for GetCurrentStockHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a GetCurrentStock,
    ) -> Pin<Box<dyn Future<Output = Result<i64>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.details.count_active_for_variant(ctx, &query.variant_id).await
        })
    }
}

/// Handles [`ListItemDetailsForVariant`].
pub struct ListItemDetailsForVariantHandler {
    details: Arc<dyn ItemDetailRepository>,
}

impl ListItemDetailsForVariantHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(details: Arc<dyn ItemDetailRepository>) -> Self {
        Self { details }
    }
}

impl QueryHandler<ListItemDetailsForVariant> for ListItemDetailsForVariantHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListItemDetailsForVariant,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemDetail>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.details.list_for_variant(ctx, &query.variant_id, query.page).await
        })
    }
}

/// Handles [`GetReceipt`].
pub struct GetReceiptHandler {
    receipts: Arc<dyn ReceiptRepository>,
}

impl GetReceiptHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(receipts: Arc<dyn ReceiptRepository>) -> Self {
        Self { receipts }
    }
}

impl QueryHandler<GetReceipt> for GetReceiptHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a GetReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<Receipt>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.receipts
                .get_by_id(ctx, &query.id)
                .await?
                .ok_or_else(|| CoreError::not_found("Receipt"))
        })
    }
}

/// Handles [`ListReceiptItemsForReceipt`].
pub struct ListReceiptItemsForReceiptHandler {
    receipt_items: Arc<dyn ReceiptItemRepository>,
}

impl ListReceiptItemsForReceiptHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(receipt_items: Arc<dyn ReceiptItemRepository>) -> Self {
        Self { receipt_items }
    }
}

impl QueryHandler<ListReceiptItemsForReceipt> for ListReceiptItemsForReceiptHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListReceiptItemsForReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ReceiptItem>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.receipt_items.list_for_receipt(ctx, &query.receipt_id, query.page).await
        })
    }
}

/// Handles [`ListShoppinglistItems`].
pub struct ListShoppinglistItemsHandler {
    items: Arc<dyn ShoppinglistItemRepository>,
}

impl ListShoppinglistItemsHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(items: Arc<dyn ShoppinglistItemRepository>) -> Self {
        Self { items }
    }
}

impl QueryHandler<ListShoppinglistItems> for ListShoppinglistItemsHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListShoppinglistItems,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ShoppinglistItem>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.items.list_for_list(ctx, &query.shoppinglist_id, query.page).await
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::repository::MatchCandidate;
    use composable_rust_testing::InMemoryEventBus;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryItems {
        by_id: Mutex<HashMap<String, Item>>,
    }

    impl ItemRepository for InMemoryItems {
        fn create<'a>(&'a self, _ctx: &'a RequestContext, item: Item) -> Pin<Box<dyn Future<Output = Result<Item>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(item.id.clone(), item.clone());
                Ok(item)
            })
        }

        fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Item>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.by_id.lock().unwrap().get(id).cloned()) })
        }
    }

    #[derive(Default)]
    struct InMemoryVariants {
        by_id: Mutex<HashMap<String, ItemVariant>>,
    }

    impl ItemVariantRepository for InMemoryVariants {
        fn create<'a>(&'a self, _ctx: &'a RequestContext, variant: ItemVariant) -> Pin<Box<dyn Future<Output = Result<ItemVariant>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(variant.id.clone(), variant.clone());
                Ok(variant)
            })
        }

        fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ItemVariant>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.by_id.lock().unwrap().get(id).cloned()) })
        }

        fn barcode_exists<'a>(&'a self, _ctx: &'a RequestContext, barcode: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
            Box::pin(async move {
                Ok(self.by_id.lock().unwrap().values().any(|v| v.barcode.as_deref() == Some(barcode)))
            })
        }

        fn list<'a>(&'a self, _ctx: &'a RequestContext, _page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemVariant>>> + Send + 'a>> {
            Box::pin(async move { Ok(Paginated::new(vec![], 0)) })
        }

        fn list_match_candidates<'a>(&'a self, _ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Vec<MatchCandidate>>> + Send + 'a>> {
            Box::pin(async move {
                if page.offset > 0 {
                    return Ok(vec![]);
                }
                let candidates = self
                    .by_id
                    .lock()
                    .unwrap()
                    .values()
                    .map(|v| MatchCandidate {
                        variant_id: v.id.clone(),
                        search_text: v.variant_name.to_lowercase(),
                    })
                    .collect();
                Ok(candidates)
            })
        }

        fn update<'a>(&'a self, _ctx: &'a RequestContext, variant: ItemVariant) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(variant.id.clone(), variant);
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct InMemoryDetails {
        by_id: Mutex<HashMap<String, ItemDetail>>,
    }

    impl ItemDetailRepository for InMemoryDetails {
        fn create<'a>(&'a self, _ctx: &'a RequestContext, detail: ItemDetail) -> Pin<Box<dyn Future<Output = Result<ItemDetail>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(detail.id.clone(), detail.clone());
                Ok(detail)
            })
        }

        fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ItemDetail>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.by_id.lock().unwrap().get(id).cloned()) })
        }

        fn count_active_for_variant<'a>(&'a self, _ctx: &'a RequestContext, variant_id: &'a str) -> Pin<Box<dyn Future<Output = Result<i64>> + Send + 'a>> {
            Box::pin(async move {
                let count = self
                    .by_id
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|d| d.variant_id == variant_id && d.deleted_at.is_none())
                    .count();
                Ok(i64::try_from(count).unwrap())
            })
        }

        fn list_for_variant<'a>(&'a self, _ctx: &'a RequestContext, _variant_id: &'a str, _page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemDetail>>> + Send + 'a>> {
            Box::pin(async move { Ok(Paginated::new(vec![], 0)) })
        }

        fn update<'a>(&'a self, _ctx: &'a RequestContext, detail: ItemDetail) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(detail.id.clone(), detail);
                Ok(())
            })
        }

        fn delete<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str, now: chrono::DateTime<Utc>) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                if let Some(d) = self.by_id.lock().unwrap().get_mut(id) {
                    d.deleted_at = Some(now);
                }
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct InMemoryReceipts {
        by_id: Mutex<HashMap<String, Receipt>>,
    }

    impl ReceiptRepository for InMemoryReceipts {
        fn create<'a>(&'a self, _ctx: &'a RequestContext, receipt: Receipt) -> Pin<Box<dyn Future<Output = Result<Receipt>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(receipt.id.clone(), receipt.clone());
                Ok(receipt)
            })
        }

        fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Receipt>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.by_id.lock().unwrap().get(id).cloned()) })
        }

        fn update<'a>(&'a self, _ctx: &'a RequestContext, receipt: Receipt) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(receipt.id.clone(), receipt);
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct InMemoryReceiptItems {
        by_id: Mutex<HashMap<String, ReceiptItem>>,
    }

    impl ReceiptItemRepository for InMemoryReceiptItems {
        fn create<'a>(&'a self, _ctx: &'a RequestContext, item: ReceiptItem) -> Pin<Box<dyn Future<Output = Result<ReceiptItem>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(item.id.clone(), item.clone());
                Ok(item)
            })
        }

        fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ReceiptItem>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.by_id.lock().unwrap().get(id).cloned()) })
        }

        fn list_unmatched_for_receipt<'a>(&'a self, _ctx: &'a RequestContext, receipt_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<ReceiptItem>>> + Send + 'a>> {
            Box::pin(async move {
                Ok(self
                    .by_id
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|i| i.receipt_id == receipt_id && !i.is_matched)
                    .cloned()
                    .collect())
            })
        }

        fn list_matched_for_receipt<'a>(&'a self, _ctx: &'a RequestContext, receipt_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<ReceiptItem>>> + Send + 'a>> {
            Box::pin(async move {
                Ok(self
                    .by_id
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|i| i.receipt_id == receipt_id && i.is_matched)
                    .cloned()
                    .collect())
            })
        }

        fn list_for_receipt<'a>(&'a self, _ctx: &'a RequestContext, _receipt_id: &'a str, _page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ReceiptItem>>> + Send + 'a>> {
            Box::pin(async move { Ok(Paginated::new(vec![], 0)) })
        }

        fn update<'a>(&'a self, _ctx: &'a RequestContext, item: ReceiptItem) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(item.id.clone(), item);
                Ok(())
            })
        }
    }

    fn publisher() -> Arc<EventPublisher> {
        Arc::new(EventPublisher::new(Arc::new(InMemoryEventBus::new())))
    }

    fn sample_variant(id: &str, name: &str, min_sku: i64) -> ItemVariant {
        let now = Utc::now();
        ItemVariant {
            id: id.to_string(),
            item_id: "item-1".into(),
            size_id: None,
            variant_name: name.into(),
            barcode: None,
            min_sku,
            max_sku: 0,
            is_normally_frozen: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn create_item_variant_rejects_duplicate_barcode() {
        let variants = Arc::new(InMemoryVariants::default());
        variants.create(&RequestContext::new(None), {
            let mut v = sample_variant("v1", "Cola", 1);
            v.barcode = Some("123".into());
            v
        }).await.unwrap();

        let handler = CreateItemVariantHandler::new(variants, publisher());
        let ctx = RequestContext::new(None);
        let mut cmd = CreateItemVariant {
            item_id: "item-1".into(),
            variant_name: "Cola 0.33L".into(),
            barcode: Some("123".into()),
            min_sku: 1,
            max_sku: 10,
            ..Default::default()
        };
        let err = handler.handle(&ctx, &mut cmd).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn consume_item_detail_emits_stock_empty_when_last_unit_goes() {
        let variants = Arc::new(InMemoryVariants::default());
        let details = Arc::new(InMemoryDetails::default());
        let bus = Arc::new(InMemoryEventBus::new());
        let events = Arc::new(EventPublisher::new(bus.clone()));
        let ctx = RequestContext::new(None);

        variants.create(&ctx, sample_variant("v1", "Cola", 2)).await.unwrap();
        let detail = details
            .create(&ctx, ItemDetail {
                id: "d1".into(),
                variant_id: "v1".into(),
                warehouse_id: "w1".into(),
                location_id: "l1".into(),
                purchased_at: Utc::now(),
                expires_at: None,
                is_opened: false,
                is_frozen: false,
                purchase_price: 1.0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();

        let handler = ConsumeItemDetailHandler::new(variants, details, events);
        let mut cmd = ConsumeItemDetail { id: detail.id };
        handler.handle(&ctx, &mut cmd).await.unwrap();

        let published = bus.published();
        assert!(published.iter().any(|(topic, _)| topic == "foodfolio.variant.stock.empty"));
    }

    #[tokio::test]
    async fn auto_match_receipt_matches_above_threshold_and_counts_unmatched() {
        let receipts = Arc::new(InMemoryReceipts::default());
        let receipt_items = Arc::new(InMemoryReceiptItems::default());
        let variants = Arc::new(InMemoryVariants::default());
        let events = publisher();
        let ctx = RequestContext::new(None);

        let receipt = receipts
            .create(&ctx, Receipt {
                id: "r1".into(),
                warehouse_id: "w1".into(),
                scanned_at: Utc::now(),
                total_price: 0.0,
                ocr_text: None,
                image_path: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();
        variants.create(&ctx, sample_variant("v1", "coca cola", 1)).await.unwrap();

        receipt_items
            .create(&ctx, ReceiptItem {
                id: "ri1".into(),
                receipt_id: receipt.id.clone(),
                item_name: "cola".into(),
                quantity: 1,
                unit_price: 1.5,
                total_price: 1.5,
                article_number: None,
                item_variant_id: None,
                is_matched: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();
        receipt_items
            .create(&ctx, ReceiptItem {
                id: "ri2".into(),
                receipt_id: receipt.id.clone(),
                item_name: "xyzzy snack".into(),
                quantity: 1,
                unit_price: 2.0,
                total_price: 2.0,
                article_number: None,
                item_variant_id: None,
                is_matched: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();

        let handler = AutoMatchReceiptHandler::new(receipts, receipt_items.clone(), variants, events);
        let mut cmd = AutoMatchReceipt { receipt_id: receipt.id, threshold: 0.70, matched_count: None, unmatched_count: None };
        handler.handle(&ctx, &mut cmd).await.unwrap();

        assert_eq!(cmd.matched_count, Some(1));
        assert_eq!(cmd.unmatched_count, Some(1));

        let matched = receipt_items.get_by_id(&ctx, "ri1").await.unwrap().unwrap();
        assert_eq!(matched.item_variant_id.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn create_inventory_from_receipt_skips_unmatched_items_even_when_not_only_matched() {
        let receipts = Arc::new(InMemoryReceipts::default());
        let receipt_items = Arc::new(InMemoryReceiptItems::default());
        let variants = Arc::new(InMemoryVariants::default());
        let details = Arc::new(InMemoryDetails::default());
        let events = publisher();
        let ctx = RequestContext::new(None);

        variants.create(&ctx, sample_variant("v1", "coca cola", 1)).await.unwrap();
        receipts
            .create(&ctx, Receipt {
                id: "r1".into(),
                warehouse_id: "w1".into(),
                scanned_at: Utc::now(),
                total_price: 3.0,
                ocr_text: None,
                image_path: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();
        receipt_items
            .create(&ctx, ReceiptItem {
                id: "ri1".into(),
                receipt_id: "r1".into(),
                item_name: "cola".into(),
                quantity: 2,
                unit_price: 1.5,
                total_price: 3.0,
                article_number: None,
                item_variant_id: Some("v1".into()),
                is_matched: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();

        let handler = CreateInventoryFromReceiptHandler::new(receipts, receipt_items, variants, details.clone(), events);
        let mut cmd = CreateInventoryFromReceipt {
            receipt_id: "r1".into(),
            location_id: "l1".into(),
            default_expiry: None,
            only_matched: false,
            created_count: None,
        };
        handler.handle(&ctx, &mut cmd).await.unwrap();
        assert_eq!(cmd.created_count, Some(2));
        assert!(details.by_id.lock().unwrap().values().all(|d| d.warehouse_id == "w1"));
    }
}
