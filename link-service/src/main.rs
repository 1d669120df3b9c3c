//! Link service binary: wires the command/query buses, Postgres
//! repositories, the Redpanda event bus, the expiration sweeper, and the
//! HTTP surface, then serves until an interrupt signal (spec §5: graceful
//! shutdown).

use composable_rust_core::bus::{CommandBus, QueryBus};
use composable_rust_core::publisher::EventPublisher;
use composable_rust_redpanda::RedpandaEventBus;
use link_service::commands::{
    CreateShortLink, DeactivateExpiredLink, DeleteShortLink, IncrementClick, RecordClick,
    UpdateShortLink,
};
use link_service::handlers::{
    CreateShortLinkHandler, DeactivateExpiredLinkHandler, DeleteShortLinkHandler,
    GetLinkStatsHandler, GetShortLinkByCodeHandler, IncrementClickHandler, ListShortLinksHandler,
    RecordClickHandler, UpdateShortLinkHandler,
};
use link_service::postgres::{PostgresClickRepository, PostgresShortLinkRepository};
use link_service::queries::{GetLinkStats, GetShortLinkByCode, ListShortLinks};
use link_service::reconcile::ExpiredLinkSweeper;
use link_service::router::{router, LinkServiceState};
use link_service::LinkServiceConfig;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = LinkServiceConfig::from_env();
    tracing::info!(bind_address = %config.bind_address, "starting link service");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let links = Arc::new(PostgresShortLinkRepository::new(pool.clone()));
    links.migrate().await?;
    let clicks = Arc::new(PostgresClickRepository::new(pool.clone()));

    let event_bus = Arc::new(RedpandaEventBus::new(&config.kafka_brokers)?);
    let events = Arc::new(EventPublisher::new(event_bus));

    let mut commands = CommandBus::new();
    commands.register::<CreateShortLink>(CreateShortLinkHandler::new(links.clone(), events.clone()));
    commands.register::<UpdateShortLink>(UpdateShortLinkHandler::new(links.clone(), events.clone()));
    commands.register::<DeleteShortLink>(DeleteShortLinkHandler::new(links.clone(), events.clone()));
    commands.register::<DeactivateExpiredLink>(DeactivateExpiredLinkHandler::new(links.clone(), events.clone()));
    commands.register::<IncrementClick>(IncrementClickHandler::new(links.clone(), events.clone()));
    commands.register::<RecordClick>(RecordClickHandler::new(links.clone(), clicks.clone()));
    let commands = Arc::new(commands);

    let mut queries = QueryBus::new();
    queries.register::<GetShortLinkByCode>(GetShortLinkByCodeHandler::new(links.clone()));
    queries.register::<ListShortLinks>(ListShortLinksHandler::new(links.clone()));
    queries.register::<GetLinkStats>(GetLinkStatsHandler::new(clicks.clone()));
    let queries = Arc::new(queries);

    let shutdown = CancellationToken::new();

    let sweeper_handle = if config.expiration_sweeper_enabled {
        let sweeper = ExpiredLinkSweeper::new(links.clone(), commands.clone());
        let interval = config.expiration_sweep_interval;
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            composable_rust_core::reconciler::run_periodic(sweeper, interval, shutdown).await;
        }))
    } else {
        tracing::info!("expiration sweeper disabled by configuration");
        None
    };

    let state = LinkServiceState {
        commands,
        queries,
        pool,
        base_url: config.base_url.clone(),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    tracing::info!(bind_address = %config.bind_address, "link service listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }

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
