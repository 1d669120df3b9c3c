//! The representative RPC subset for the foodfolio service (spec §6),
//! exposed as Axum JSON routes.

use crate::commands::{AddShoppinglistItem, CreateInventoryFromReceipt, CreateItemVariant, UploadReceipt};
use crate::model::{ItemVariant, Receipt};
use crate::queries::{GetCurrentStock, GetItemVariant, GetReceipt};
use composable_rust_core::bus::{CommandBus, QueryBus};
use composable_rust_core::context::RequestContext;
use composable_rust_transport::handlers::{health_check, readiness_check};
use composable_rust_transport::{AppError, TransportResult};
use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state threaded through every handler in this router.
#[derive(Clone)]
pub struct FoodfolioServiceState {
    /// The command bus, pre-registered with every foodfolio command handler.
    pub commands: Arc<CommandBus>,
    /// The query bus, pre-registered with every foodfolio query handler.
    pub queries: Arc<QueryBus>,
    /// Readiness-probe database pool.
    pub pool: PgPool,
}

impl axum::extract::FromRef<FoodfolioServiceState> for PgPool {
    fn from_ref(state: &FoodfolioServiceState) -> Self {
        state.pool.clone()
    }
}

/// Build the foodfolio service's Axum router.
#[must_use]
pub fn router(state: FoodfolioServiceState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check))
        .route("/variants", post(create_item_variant))
        .route("/variants/{id}", get(get_item_variant))
        .route("/variants/{id}/stock", get(get_current_stock))
        .route("/receipts/upload", post(upload_receipt))
        .route("/receipts/{id}", get(get_receipt))
        .route("/receipts/{id}/inventory", post(create_inventory_from_receipt))
        .route("/shoppinglists/{id}/items", post(add_shoppinglist_item))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ItemVariantDto {
    id: String,
    item_id: String,
    variant_name: String,
    barcode: Option<String>,
    min_sku: i64,
    max_sku: i64,
    is_normally_frozen: bool,
}

impl From<ItemVariant> for ItemVariantDto {
    fn from(variant: ItemVariant) -> Self {
        Self {
            id: variant.id,
            item_id: variant.item_id,
            variant_name: variant.variant_name,
            barcode: variant.barcode,
            min_sku: variant.min_sku,
            max_sku: variant.max_sku,
            is_normally_frozen: variant.is_normally_frozen,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReceiptDto {
    id: String,
    warehouse_id: String,
    total_price: f64,
    ocr_text: Option<String>,
}

impl From<Receipt> for ReceiptDto {
    fn from(receipt: Receipt) -> Self {
        Self {
            id: receipt.id,
            warehouse_id: receipt.warehouse_id,
            total_price: receipt.total_price,
            ocr_text: receipt.ocr_text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateItemVariantBody {
    item_id: String,
    size_id: Option<String>,
    variant_name: String,
    barcode: Option<String>,
    min_sku: i64,
    max_sku: i64,
    is_normally_frozen: bool,
}

async fn create_item_variant(
    State(state): State<FoodfolioServiceState>,
    Json(body): Json<CreateItemVariantBody>,
) -> TransportResult<Json<ItemVariantDto>> {
    let ctx = RequestContext::new(None);
    let mut cmd = CreateItemVariant {
        item_id: body.item_id,
        size_id: body.size_id,
        variant_name: body.variant_name,
        barcode: body.barcode,
        min_sku: body.min_sku,
        max_sku: body.max_sku,
        is_normally_frozen: body.is_normally_frozen,
        aggregate_id: None,
        created: None,
    };
    state.commands.dispatch(&ctx, &mut cmd).await?;
    let created = cmd.created.ok_or_else(|| AppError::internal("handler did not populate created variant"))?;
    Ok(Json(created.into()))
}

async fn get_item_variant(
    State(state): State<FoodfolioServiceState>,
    Path(id): Path<String>,
) -> TransportResult<Json<ItemVariantDto>> {
    let ctx = RequestContext::new(None);
    let variant = state.queries.dispatch(&ctx, &GetItemVariant { id }).await?;
    Ok(Json(variant.into()))
}

async fn get_current_stock(
    State(state): State<FoodfolioServiceState>,
    Path(id): Path<String>,
) -> TransportResult<Json<serde_json::Value>> {
    let ctx = RequestContext::new(None);
    let stock = state.queries.dispatch(&ctx, &GetCurrentStock { variant_id: id }).await?;
    Ok(Json(serde_json::json!({ "current_stock": stock })))
}

/// Accepts a multipart upload (spec §6): a single `warehouse_id` field plus
/// an `image` file field.
async fn upload_receipt(
    State(state): State<FoodfolioServiceState>,
    mut multipart: Multipart,
) -> TransportResult<Json<serde_json::Value>> {
    let mut warehouse_id = None;
    let mut image_bytes = Vec::new();
    let mut filename = String::from("receipt");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("warehouse_id") => {
                warehouse_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::bad_request(format!("invalid warehouse_id: {e}")))?,
                );
            }
            Some("image") => {
                filename = field.file_name().unwrap_or("receipt").to_string();
                image_bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("invalid image: {e}")))?
                    .to_vec();
            }
            _ => {}
        }
    }

    let ctx = RequestContext::new(None);
    let mut cmd = UploadReceipt {
        warehouse_id: warehouse_id.ok_or_else(|| AppError::bad_request("warehouse_id is required"))?,
        image_bytes,
        filename,
        aggregate_id: None,
        created: None,
        matched_count: None,
        unmatched_count: None,
    };
    state.commands.dispatch(&ctx, &mut cmd).await?;
    let created = cmd.created.ok_or_else(|| AppError::internal("handler did not populate created receipt"))?;

    Ok(Json(serde_json::json!({
        "receipt": ReceiptDto::from(created),
        "matched_count": cmd.matched_count,
        "unmatched_count": cmd.unmatched_count,
    })))
}

async fn get_receipt(
    State(state): State<FoodfolioServiceState>,
    Path(id): Path<String>,
) -> TransportResult<Json<ReceiptDto>> {
    let ctx = RequestContext::new(None);
    let receipt = state.queries.dispatch(&ctx, &GetReceipt { id }).await?;
    Ok(Json(receipt.into()))
}

#[derive(Debug, Deserialize)]
struct CreateInventoryFromReceiptBody {
    location_id: String,
    default_expiry: Option<chrono::DateTime<chrono::Utc>>,
    only_matched: bool,
}

async fn create_inventory_from_receipt(
    State(state): State<FoodfolioServiceState>,
    Path(id): Path<String>,
    Json(body): Json<CreateInventoryFromReceiptBody>,
) -> TransportResult<Json<serde_json::Value>> {
    let ctx = RequestContext::new(None);
    let mut cmd = CreateInventoryFromReceipt {
        receipt_id: id,
        location_id: body.location_id,
        default_expiry: body.default_expiry,
        only_matched: body.only_matched,
        created_count: None,
    };
    state.commands.dispatch(&ctx, &mut cmd).await?;
    Ok(Json(serde_json::json!({ "created_count": cmd.created_count })))
}

#[derive(Debug, Deserialize)]
struct AddShoppinglistItemBody {
    variant_id: String,
    quantity: i64,
}

async fn add_shoppinglist_item(
    State(state): State<FoodfolioServiceState>,
    Path(id): Path<String>,
    Json(body): Json<AddShoppinglistItemBody>,
) -> TransportResult<Json<serde_json::Value>> {
    let ctx = RequestContext::new(None);
    let mut cmd = AddShoppinglistItem {
        shoppinglist_id: id,
        variant_id: body.variant_id,
        quantity: body.quantity,
        aggregate_id: None,
        created: None,
    };
    state.commands.dispatch(&ctx, &mut cmd).await?;
    Ok(Json(serde_json::json!({ "status": "ok", "id": cmd.aggregate_id })))
}
