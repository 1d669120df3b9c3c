//! Foodfolio service binary: wires the command/query buses, Postgres
//! repositories, the stub OCR engine, the Redpanda event bus, and the HTTP
//! surface, then serves until an interrupt signal (spec §5: graceful
//! shutdown).

use composable_rust_core::bus::{CommandBus, QueryBus};
use composable_rust_core::publisher::EventPublisher;
use composable_rust_redpanda::RedpandaEventBus;
use foodfolio_service::commands::{
    AddShoppinglistItem, AutoMatchReceipt, ConsumeItemDetail, CreateInventoryFromReceipt, CreateItem, CreateItemDetail,
    CreateItemVariant, CreateShoppinglist, DeleteItemVariant, DeleteShoppinglistItem, MarkShoppinglistItemPurchased,
    UpdateItemDetail, UpdateItemVariant, UploadReceipt,
};
use foodfolio_service::handlers::{
    AddShoppinglistItemHandler, AutoMatchReceiptHandler, ConsumeItemDetailHandler, CreateInventoryFromReceiptHandler,
    CreateItemDetailHandler, CreateItemHandler, CreateItemVariantHandler, CreateShoppinglistHandler,
    DeleteItemVariantHandler, DeleteShoppinglistItemHandler, GetCurrentStockHandler, GetItemVariantHandler,
    GetReceiptHandler, ListItemDetailsForVariantHandler, ListItemVariantsHandler, ListReceiptItemsForReceiptHandler,
    ListShoppinglistItemsHandler, MarkShoppinglistItemPurchasedHandler, UpdateItemDetailHandler, UpdateItemVariantHandler,
    UploadReceiptHandler,
};
use foodfolio_service::ocr::{OcrEngine, StubOcrEngine};
use foodfolio_service::postgres::{
    PostgresItemDetailRepository, PostgresItemRepository, PostgresItemVariantRepository, PostgresMigrator,
    PostgresReceiptItemRepository, PostgresReceiptRepository, PostgresShoppinglistItemRepository,
    PostgresShoppinglistRepository,
};
use foodfolio_service::queries::{
    GetCurrentStock, GetItemVariant, GetReceipt, ListItemDetailsForVariant, ListItemVariants, ListReceiptItemsForReceipt,
    ListShoppinglistItems,
};
use foodfolio_service::router::{router, FoodfolioServiceState};
use foodfolio_service::FoodfolioServiceConfig;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FoodfolioServiceConfig::from_env();
    tracing::info!(bind_address = %config.bind_address, "starting foodfolio service");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let migrator = PostgresMigrator::new(pool.clone());
    migrator.migrate().await?;

    let items = Arc::new(PostgresItemRepository::new(pool.clone()));
    let variants = Arc::new(PostgresItemVariantRepository::new(pool.clone()));
    let details = Arc::new(PostgresItemDetailRepository::new(pool.clone()));
    let receipts = Arc::new(PostgresReceiptRepository::new(pool.clone()));
    let receipt_items = Arc::new(PostgresReceiptItemRepository::new(pool.clone()));
    let shoppinglists = Arc::new(PostgresShoppinglistRepository::new(pool.clone()));
    let shoppinglist_items = Arc::new(PostgresShoppinglistItemRepository::new(pool.clone()));

    let ocr: Arc<dyn OcrEngine> = Arc::new(StubOcrEngine);

    let event_bus = Arc::new(RedpandaEventBus::new(&config.kafka_brokers)?);
    let events = Arc::new(EventPublisher::new(event_bus));

    // `UploadReceiptHandler` dispatches `AutoMatchReceipt` against an
    // `Arc<CommandBus>`, so it needs a fully-built bus to hold a reference
    // to — but it must itself be registered in the bus the router uses.
    // Build the inner bus first (everything `UploadReceipt` might reach),
    // then build the outer bus the router actually dispatches against,
    // adding `UploadReceipt` on top.
    let register_base_handlers = |bus: &mut CommandBus| {
        bus.register::<CreateItem>(CreateItemHandler::new(items.clone()));
        bus.register::<CreateItemVariant>(CreateItemVariantHandler::new(variants.clone(), events.clone()));
        bus.register::<UpdateItemVariant>(UpdateItemVariantHandler::new(variants.clone(), details.clone(), events.clone()));
        bus.register::<DeleteItemVariant>(DeleteItemVariantHandler::new(variants.clone()));
        bus.register::<CreateItemDetail>(CreateItemDetailHandler::new(variants.clone(), details.clone(), events.clone()));
        bus.register::<UpdateItemDetail>(UpdateItemDetailHandler::new(details.clone(), events.clone()));
        bus.register::<ConsumeItemDetail>(ConsumeItemDetailHandler::new(variants.clone(), details.clone(), events.clone()));
        bus.register::<CreateShoppinglist>(CreateShoppinglistHandler::new(shoppinglists.clone(), events.clone()));
        bus.register::<AddShoppinglistItem>(AddShoppinglistItemHandler::new(
            shoppinglists.clone(),
            shoppinglist_items.clone(),
            events.clone(),
        ));
        bus.register::<MarkShoppinglistItemPurchased>(MarkShoppinglistItemPurchasedHandler::new(
            shoppinglist_items.clone(),
            events.clone(),
        ));
        bus.register::<DeleteShoppinglistItem>(DeleteShoppinglistItemHandler::new(shoppinglist_items.clone()));
        bus.register::<AutoMatchReceipt>(AutoMatchReceiptHandler::new(
            receipts.clone(),
            receipt_items.clone(),
            variants.clone(),
            events.clone(),
        ));
        bus.register::<CreateInventoryFromReceipt>(CreateInventoryFromReceiptHandler::new(
            receipts.clone(),
            receipt_items.clone(),
            variants.clone(),
            details.clone(),
            events.clone(),
        ));
    };

    let mut inner_commands = CommandBus::new();
    register_base_handlers(&mut inner_commands);
    let inner_commands = Arc::new(inner_commands);

    let mut commands = CommandBus::new();
    register_base_handlers(&mut commands);
    commands.register::<UploadReceipt>(UploadReceiptHandler::new(
        receipts.clone(),
        receipt_items.clone(),
        ocr.clone(),
        events.clone(),
        inner_commands,
    ));
    let commands = Arc::new(commands);

    let mut queries = QueryBus::new();
    queries.register::<GetItemVariant>(GetItemVariantHandler::new(variants.clone()));
    queries.register::<ListItemVariants>(ListItemVariantsHandler::new(variants.clone()));
    queries.register::<GetCurrentStock>(GetCurrentStockHandler::new(details.clone()));
    queries.register::<ListItemDetailsForVariant>(ListItemDetailsForVariantHandler::new(details.clone()));
    queries.register::<GetReceipt>(GetReceiptHandler::new(receipts.clone()));
    queries.register::<ListReceiptItemsForReceipt>(ListReceiptItemsForReceiptHandler::new(receipt_items.clone()));
    queries.register::<ListShoppinglistItems>(ListShoppinglistItemsHandler::new(shoppinglist_items.clone()));
    let queries = Arc::new(queries);

    let shutdown = CancellationToken::new();

    let state = FoodfolioServiceState { commands, queries, pool };
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    tracing::info!(bind_address = %config.bind_address, "foodfolio service listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown.clone())).await?;

    shutdown.cancel();

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    ctrl_c.await;
    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
