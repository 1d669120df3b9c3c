//! `PostgreSQL`-backed implementations of the inventory/receipt repository
//! ports (spec §4.3), grounded on `twitchbot_service::postgres`'s row-mapping
//! and shared-migrator conventions.

use crate::model::{Item, ItemDetail, ItemVariant, Receipt, ReceiptItem, Shoppinglist, ShoppinglistItem};
use crate::repository::{
    ItemDetailRepository, ItemRepository, ItemVariantRepository, MatchCandidate,
    ReceiptItemRepository, ReceiptRepository, ShoppinglistItemRepository, ShoppinglistRepository,
};
use chrono::{DateTime, Utc};
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::{CoreError, Result};
use composable_rust_core::pagination::{Page, Paginated};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::future::Future;
use std::pin::Pin;

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {e}"))
}

fn row_to_item(row: &PgRow) -> Item {
    Item {
        id: row.get("id"),
        name: row.get("name"),
        category_id: row.get("category_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_variant(row: &PgRow) -> ItemVariant {
    ItemVariant {
        id: row.get("id"),
        item_id: row.get("item_id"),
        size_id: row.get("size_id"),
        variant_name: row.get("variant_name"),
        barcode: row.get("barcode"),
        min_sku: row.get("min_sku"),
        max_sku: row.get("max_sku"),
        is_normally_frozen: row.get("is_normally_frozen"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_detail(row: &PgRow) -> ItemDetail {
    ItemDetail {
        id: row.get("id"),
        variant_id: row.get("variant_id"),
        warehouse_id: row.get("warehouse_id"),
        location_id: row.get("location_id"),
        purchased_at: row.get("purchased_at"),
        expires_at: row.get("expires_at"),
        is_opened: row.get("is_opened"),
        is_frozen: row.get("is_frozen"),
        purchase_price: row.get("purchase_price"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_receipt(row: &PgRow) -> Receipt {
    Receipt {
        id: row.get("id"),
        warehouse_id: row.get("warehouse_id"),
        scanned_at: row.get("scanned_at"),
        total_price: row.get("total_price"),
        ocr_text: row.get("ocr_text"),
        image_path: row.get("image_path"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_receipt_item(row: &PgRow) -> ReceiptItem {
    ReceiptItem {
        id: row.get("id"),
        receipt_id: row.get("receipt_id"),
        item_name: row.get("item_name"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        total_price: row.get("total_price"),
        article_number: row.get("article_number"),
        item_variant_id: row.get("item_variant_id"),
        is_matched: row.get("is_matched"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_shoppinglist(row: &PgRow) -> Shoppinglist {
    Shoppinglist {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_shoppinglist_item(row: &PgRow) -> ShoppinglistItem {
    ShoppinglistItem {
        id: row.get("id"),
        shoppinglist_id: row.get("shoppinglist_id"),
        variant_id: row.get("variant_id"),
        quantity: row.get("quantity"),
        is_purchased: row.get("is_purchased"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

/// Shared migration runner for every inventory/receipt repository (they
/// share one migrations directory).
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    /// Build a new migrator over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run this crate's migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the migration run fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("migration failed: {e}")))
    }
}

/// `PostgreSQL`-backed [`ItemRepository`].
pub struct PostgresItemRepository {
    pool: PgPool,
}

impl PostgresItemRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ItemRepository for PostgresItemRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, item: Item) -> Pin<Box<dyn Future<Output = Result<Item>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO items (id, name, category_id, created_at, updated_at, deleted_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(&item.id)
            .bind(&item.name)
            .bind(&item.category_id)
            .bind(item.created_at)
            .bind(item.updated_at)
            .bind(item.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(item)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Item>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"SELECT id, name, category_id, created_at, updated_at, deleted_at
                   FROM items WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_item))
        })
    }
}

/// `PostgreSQL`-backed [`ItemVariantRepository`].
pub struct PostgresItemVariantRepository {
    pool: PgPool,
}

impl PostgresItemVariantRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ItemVariantRepository for PostgresItemVariantRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, variant: ItemVariant) -> Pin<Box<dyn Future<Output = Result<ItemVariant>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO item_variants (
                    id, item_id, size_id, variant_name, barcode, min_sku, max_sku,
                    is_normally_frozen, created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ",
            )
            .bind(&variant.id)
            .bind(&variant.item_id)
            .bind(&variant.size_id)
            .bind(&variant.variant_name)
            .bind(&variant.barcode)
            .bind(variant.min_sku)
            .bind(variant.max_sku)
            .bind(variant.is_normally_frozen)
            .bind(variant.created_at)
            .bind(variant.updated_at)
            .bind(variant.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(variant)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ItemVariant>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"SELECT id, item_id, size_id, variant_name, barcode, min_sku, max_sku,
                         is_normally_frozen, created_at, updated_at, deleted_at
                   FROM item_variants WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_variant))
        })
    }

    fn barcode_exists<'a>(&'a self, _ctx: &'a RequestContext, barcode: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let (exists,): (bool,) = sqlx::query_as(
                r"SELECT EXISTS(SELECT 1 FROM item_variants WHERE barcode = $1 AND deleted_at IS NULL)",
            )
            .bind(barcode)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(exists)
        })
    }

    fn list<'a>(&'a self, _ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemVariant>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"SELECT id, item_id, size_id, variant_name, barcode, min_sku, max_sku,
                         is_normally_frozen, created_at, updated_at, deleted_at
                   FROM item_variants
                   WHERE deleted_at IS NULL
                   ORDER BY created_at DESC
                   OFFSET $1 LIMIT $2",
            )
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM item_variants WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_variant).collect(), total))
        })
    }

    fn list_match_candidates<'a>(&'a self, _ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Vec<MatchCandidate>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT v.id AS variant_id, LOWER(i.name || ' ' || v.variant_name) AS search_text
                FROM item_variants v
                JOIN items i ON i.id = v.item_id
                WHERE v.deleted_at IS NULL AND i.deleted_at IS NULL
                ORDER BY v.id ASC
                OFFSET $1 LIMIT $2
                ",
            )
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(rows
                .iter()
                .map(|row| MatchCandidate {
                    variant_id: row.get("variant_id"),
                    search_text: row.get("search_text"),
                })
                .collect())
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, variant: ItemVariant) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE item_variants
                SET variant_name = $1, barcode = $2, min_sku = $3, max_sku = $4,
                    is_normally_frozen = $5, updated_at = $6, deleted_at = $7
                WHERE id = $8
                ",
            )
            .bind(&variant.variant_name)
            .bind(&variant.barcode)
            .bind(variant.min_sku)
            .bind(variant.max_sku)
            .bind(variant.is_normally_frozen)
            .bind(variant.updated_at)
            .bind(variant.deleted_at)
            .bind(&variant.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`ItemDetailRepository`].
pub struct PostgresItemDetailRepository {
    pool: PgPool,
}

impl PostgresItemDetailRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ItemDetailRepository for PostgresItemDetailRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, detail: ItemDetail) -> Pin<Box<dyn Future<Output = Result<ItemDetail>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO item_details (
                    id, variant_id, warehouse_id, location_id, purchased_at, expires_at,
                    is_opened, is_frozen, purchase_price, created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(&detail.id)
            .bind(&detail.variant_id)
            .bind(&detail.warehouse_id)
            .bind(&detail.location_id)
            .bind(detail.purchased_at)
            .bind(detail.expires_at)
            .bind(detail.is_opened)
            .bind(detail.is_frozen)
            .bind(detail.purchase_price)
            .bind(detail.created_at)
            .bind(detail.updated_at)
            .bind(detail.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(detail)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ItemDetail>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"SELECT id, variant_id, warehouse_id, location_id, purchased_at, expires_at,
                         is_opened, is_frozen, purchase_price, created_at, updated_at, deleted_at
                   FROM item_details WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_detail))
        })
    }

    fn count_active_for_variant<'a>(&'a self, _ctx: &'a RequestContext, variant_id: &'a str) -> Pin<Box<dyn Future<Output = Result<i64>> + Send + 'a>> {
        Box::pin(async move {
            let (count,): (i64,) = sqlx::query_as(
                r"SELECT COUNT(*) FROM item_details WHERE variant_id = $1 AND deleted_at IS NULL",
            )
            .bind(variant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(count)
        })
    }

    fn list_for_variant<'a>(&'a self, _ctx: &'a RequestContext, variant_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ItemDetail>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"SELECT id, variant_id, warehouse_id, location_id, purchased_at, expires_at,
                         is_opened, is_frozen, purchase_price, created_at, updated_at, deleted_at
                   FROM item_details
                   WHERE variant_id = $1 AND deleted_at IS NULL
                   ORDER BY purchased_at ASC
                   OFFSET $2 LIMIT $3",
            )
            .bind(variant_id)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(
                r"SELECT COUNT(*) FROM item_details WHERE variant_id = $1 AND deleted_at IS NULL",
            )
            .bind(variant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_detail).collect(), total))
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, detail: ItemDetail) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE item_details
                SET location_id = $1, expires_at = $2, is_opened = $3, is_frozen = $4, updated_at = $5
                WHERE id = $6
                ",
            )
            .bind(&detail.location_id)
            .bind(detail.expires_at)
            .bind(detail.is_opened)
            .bind(detail.is_frozen)
            .bind(detail.updated_at)
            .bind(&detail.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }

    fn delete<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str, now: DateTime<Utc>) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(r"UPDATE item_details SET deleted_at = $1 WHERE id = $2")
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`ReceiptRepository`].
pub struct PostgresReceiptRepository {
    pool: PgPool,
}

impl PostgresReceiptRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReceiptRepository for PostgresReceiptRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, receipt: Receipt) -> Pin<Box<dyn Future<Output = Result<Receipt>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO receipts (
                    id, warehouse_id, scanned_at, total_price, ocr_text, image_path,
                    created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(&receipt.id)
            .bind(&receipt.warehouse_id)
            .bind(receipt.scanned_at)
            .bind(receipt.total_price)
            .bind(&receipt.ocr_text)
            .bind(&receipt.image_path)
            .bind(receipt.created_at)
            .bind(receipt.updated_at)
            .bind(receipt.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(receipt)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Receipt>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"SELECT id, warehouse_id, scanned_at, total_price, ocr_text, image_path,
                         created_at, updated_at, deleted_at
                   FROM receipts WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_receipt))
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, receipt: Receipt) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE receipts
                SET total_price = $1, ocr_text = $2, image_path = $3, updated_at = $4
                WHERE id = $5
                ",
            )
            .bind(receipt.total_price)
            .bind(&receipt.ocr_text)
            .bind(&receipt.image_path)
            .bind(receipt.updated_at)
            .bind(&receipt.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`ReceiptItemRepository`].
pub struct PostgresReceiptItemRepository {
    pool: PgPool,
}

impl PostgresReceiptItemRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReceiptItemRepository for PostgresReceiptItemRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, item: ReceiptItem) -> Pin<Box<dyn Future<Output = Result<ReceiptItem>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO receipt_items (
                    id, receipt_id, item_name, quantity, unit_price, total_price,
                    article_number, item_variant_id, is_matched, created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(&item.id)
            .bind(&item.receipt_id)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .bind(&item.article_number)
            .bind(&item.item_variant_id)
            .bind(item.is_matched)
            .bind(item.created_at)
            .bind(item.updated_at)
            .bind(item.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(item)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ReceiptItem>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"SELECT id, receipt_id, item_name, quantity, unit_price, total_price,
                         article_number, item_variant_id, is_matched, created_at, updated_at, deleted_at
                   FROM receipt_items WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_receipt_item))
        })
    }

    fn list_unmatched_for_receipt<'a>(&'a self, _ctx: &'a RequestContext, receipt_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<ReceiptItem>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"SELECT id, receipt_id, item_name, quantity, unit_price, total_price,
                         article_number, item_variant_id, is_matched, created_at, updated_at, deleted_at
                   FROM receipt_items
                   WHERE receipt_id = $1 AND is_matched = FALSE AND deleted_at IS NULL
                   ORDER BY id ASC",
            )
            .bind(receipt_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(rows.iter().map(row_to_receipt_item).collect())
        })
    }

    fn list_matched_for_receipt<'a>(&'a self, _ctx: &'a RequestContext, receipt_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<ReceiptItem>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"SELECT id, receipt_id, item_name, quantity, unit_price, total_price,
                         article_number, item_variant_id, is_matched, created_at, updated_at, deleted_at
                   FROM receipt_items
                   WHERE receipt_id = $1 AND is_matched = TRUE AND deleted_at IS NULL
                   ORDER BY id ASC",
            )
            .bind(receipt_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(rows.iter().map(row_to_receipt_item).collect())
        })
    }

    fn list_for_receipt<'a>(&'a self, _ctx: &'a RequestContext, receipt_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ReceiptItem>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"SELECT id, receipt_id, item_name, quantity, unit_price, total_price,
                         article_number, item_variant_id, is_matched, created_at, updated_at, deleted_at
                   FROM receipt_items
                   WHERE receipt_id = $1 AND deleted_at IS NULL
                   ORDER BY id ASC
                   OFFSET $2 LIMIT $3",
            )
            .bind(receipt_id)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(
                r"SELECT COUNT(*) FROM receipt_items WHERE receipt_id = $1 AND deleted_at IS NULL",
            )
            .bind(receipt_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_receipt_item).collect(), total))
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, item: ReceiptItem) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE receipt_items
                SET item_variant_id = $1, is_matched = $2, updated_at = $3
                WHERE id = $4
                ",
            )
            .bind(&item.item_variant_id)
            .bind(item.is_matched)
            .bind(item.updated_at)
            .bind(&item.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`ShoppinglistRepository`].
pub struct PostgresShoppinglistRepository {
    pool: PgPool,
}

impl PostgresShoppinglistRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ShoppinglistRepository for PostgresShoppinglistRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, list: Shoppinglist) -> Pin<Box<dyn Future<Output = Result<Shoppinglist>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"INSERT INTO shoppinglists (id, name, created_at, updated_at, deleted_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&list.id)
            .bind(&list.name)
            .bind(list.created_at)
            .bind(list.updated_at)
            .bind(list.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(list)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Shoppinglist>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"SELECT id, name, created_at, updated_at, deleted_at FROM shoppinglists WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_shoppinglist))
        })
    }

    fn list<'a>(&'a self, _ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Shoppinglist>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"SELECT id, name, created_at, updated_at, deleted_at
                   FROM shoppinglists WHERE deleted_at IS NULL ORDER BY created_at DESC OFFSET $1 LIMIT $2",
            )
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM shoppinglists WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_shoppinglist).collect(), total))
        })
    }
}

/// `PostgreSQL`-backed [`ShoppinglistItemRepository`].
pub struct PostgresShoppinglistItemRepository {
    pool: PgPool,
}

impl PostgresShoppinglistItemRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ShoppinglistItemRepository for PostgresShoppinglistItemRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, item: ShoppinglistItem) -> Pin<Box<dyn Future<Output = Result<ShoppinglistItem>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO shoppinglist_items (
                    id, shoppinglist_id, variant_id, quantity, is_purchased, created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(&item.id)
            .bind(&item.shoppinglist_id)
            .bind(&item.variant_id)
            .bind(item.quantity)
            .bind(item.is_purchased)
            .bind(item.created_at)
            .bind(item.updated_at)
            .bind(item.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(item)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ShoppinglistItem>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"SELECT id, shoppinglist_id, variant_id, quantity, is_purchased, created_at, updated_at, deleted_at
                   FROM shoppinglist_items WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_shoppinglist_item))
        })
    }

    fn list_for_list<'a>(&'a self, _ctx: &'a RequestContext, shoppinglist_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ShoppinglistItem>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"SELECT id, shoppinglist_id, variant_id, quantity, is_purchased, created_at, updated_at, deleted_at
                   FROM shoppinglist_items
                   WHERE shoppinglist_id = $1 AND deleted_at IS NULL
                   ORDER BY created_at ASC
                   OFFSET $2 LIMIT $3",
            )
            .bind(shoppinglist_id)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(
                r"SELECT COUNT(*) FROM shoppinglist_items WHERE shoppinglist_id = $1 AND deleted_at IS NULL",
            )
            .bind(shoppinglist_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_shoppinglist_item).collect(), total))
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, item: ShoppinglistItem) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"UPDATE shoppinglist_items SET quantity = $1, is_purchased = $2, updated_at = $3 WHERE id = $4",
            )
            .bind(item.quantity)
            .bind(item.is_purchased)
            .bind(item.updated_at)
            .bind(&item.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }

    fn delete<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str, now: DateTime<Utc>) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(r"UPDATE shoppinglist_items SET deleted_at = $1 WHERE id = $2")
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(())
        })
    }
}
