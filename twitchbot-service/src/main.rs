//! Twitchbot service binary: wires the command/query buses, Postgres
//! repositories, the Redpanda event bus, the three background reconcilers,
//! the chat session (when configured), and the HTTP surface, then serves
//! until an interrupt signal (spec §5: graceful shutdown).

use chrono::Duration as ChronoDuration;
use composable_rust_core::bus::{CommandBus, QueryBus};
use composable_rust_core::publisher::EventPublisher;
use composable_rust_redpanda::RedpandaEventBus;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use twitchbot_service::chat::session::{ChatSession, ChatSessionConfig};
use twitchbot_service::chat::token::TokenManager;
use twitchbot_service::chat::ChannelRegistry;
use twitchbot_service::commands::{
    CreateChatCommand, CreateClip, CreateMessage, CreateStream, DeleteChatCommand, EndStream,
    ExecuteChatCommand, UpdateChatCommand, UpdateStream,
};
use twitchbot_service::handlers::{
    CreateChatCommandHandler, CreateClipHandler, CreateMessageHandler, CreateStreamHandler,
    DeleteChatCommandHandler, EndStreamHandler, ExecuteChatCommandHandler,
    GetActiveStreamHandler, ListChatCommandsHandler, ListClipsForStreamHandler,
    ListMessagesForStreamHandler, ListStreamsHandler, UpdateChatCommandHandler,
    UpdateStreamHandler,
};
use twitchbot_service::platform::HttpPlatformClient;
use twitchbot_service::postgres::{
    PostgresChannelViewerRepository, PostgresChatCommandRepository, PostgresClipRepository,
    PostgresMessageRepository, PostgresMigrator, PostgresStreamRepository, PostgresViewerRepository,
};
use twitchbot_service::queries::{
    GetActiveStream, ListChatCommands, ListClipsForStream, ListMessagesForStream, ListStreams,
};
use twitchbot_service::reconcile::{InactiveStreamCloser, MessageRetentionCleaner, StreamPoller, STREAM_POLL_INTERVAL};
use twitchbot_service::router::{router, TwitchbotServiceState};
use twitchbot_service::TwitchbotServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TwitchbotServiceConfig::from_env();
    tracing::info!(bind_address = %config.bind_address, "starting twitchbot service");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let migrator = PostgresMigrator::new(pool.clone());
    migrator.migrate().await?;

    let streams = Arc::new(PostgresStreamRepository::new(pool.clone()));
    let messages = Arc::new(PostgresMessageRepository::new(pool.clone()));
    let viewers = Arc::new(PostgresViewerRepository::new(pool.clone()));
    let channel_viewers = Arc::new(PostgresChannelViewerRepository::new(pool.clone()));
    let clips = Arc::new(PostgresClipRepository::new(pool.clone()));
    let chat_commands = Arc::new(PostgresChatCommandRepository::new(pool.clone()));

    let event_bus = Arc::new(RedpandaEventBus::new(&config.kafka_brokers)?);
    let events = Arc::new(EventPublisher::new(event_bus));

    let mut commands = CommandBus::new();
    commands.register::<CreateStream>(CreateStreamHandler::new(streams.clone(), events.clone()));
    commands.register::<UpdateStream>(UpdateStreamHandler::new(streams.clone(), events.clone()));
    commands.register::<EndStream>(EndStreamHandler::new(streams.clone(), events.clone()));
    commands.register::<CreateMessage>(CreateMessageHandler::new(
        streams.clone(),
        messages.clone(),
        viewers.clone(),
        channel_viewers.clone(),
        events.clone(),
    ));
    commands.register::<ExecuteChatCommand>(ExecuteChatCommandHandler::new(chat_commands.clone(), events.clone()));
    commands.register::<CreateChatCommand>(CreateChatCommandHandler::new(chat_commands.clone()));
    commands.register::<UpdateChatCommand>(UpdateChatCommandHandler::new(chat_commands.clone()));
    commands.register::<DeleteChatCommand>(DeleteChatCommandHandler::new(chat_commands.clone()));
    commands.register::<CreateClip>(CreateClipHandler::new(streams.clone(), clips.clone()));
    let commands = Arc::new(commands);

    let mut queries = QueryBus::new();
    queries.register::<GetActiveStream>(GetActiveStreamHandler::new(streams.clone()));
    queries.register::<ListStreams>(ListStreamsHandler::new(streams.clone()));
    queries.register::<ListMessagesForStream>(ListMessagesForStreamHandler::new(messages.clone()));
    queries.register::<ListClipsForStream>(ListClipsForStreamHandler::new(clips.clone()));
    queries.register::<ListChatCommands>(ListChatCommandsHandler::new(chat_commands.clone()));
    let queries = Arc::new(queries);

    let shutdown = CancellationToken::new();
    let mut background_handles = Vec::new();

    let channels = Arc::new(ChannelRegistry::new());

    if config.stream_closer_enabled {
        let closer = InactiveStreamCloser::new(
            streams.clone(),
            messages.clone(),
            commands.clone(),
            ChronoDuration::from_std(config.stream_closer_inactive_timeout).unwrap_or(ChronoDuration::hours(24)),
        );
        let interval = config.stream_closer_interval;
        let shutdown = shutdown.clone();
        background_handles.push(tokio::spawn(async move {
            composable_rust_core::reconciler::run_periodic(closer, interval, shutdown).await;
        }));
    } else {
        tracing::info!("inactive-stream closer disabled by configuration");
    }

    if config.message_cleanup_enabled {
        let cleaner = MessageRetentionCleaner::new(
            messages.clone(),
            ChronoDuration::days(config.message_cleanup_retention_days),
        );
        let interval = config.message_cleanup_interval;
        let shutdown = shutdown.clone();
        background_handles.push(tokio::spawn(async move {
            composable_rust_core::reconciler::run_periodic(cleaner, interval, shutdown).await;
        }));
    } else {
        tracing::info!("message-retention cleaner disabled by configuration");
    }

    if let Some(chat_config) = &config.chat {
        let platform: Arc<dyn twitchbot_service::platform::PlatformClient> = Arc::new(HttpPlatformClient::new(
            chat_config.api_base.clone(),
            chat_config.oauth_base.clone(),
            chat_config.client_id.clone(),
        ));

        let tokens = Arc::new(TokenManager::new(
            platform.clone(),
            chat_config.client_id.clone(),
            chat_config.client_secret.clone(),
            chat_config.access_token.clone(),
            chat_config.refresh_token.clone(),
        ));

        for channel in &chat_config.channels {
            channels.join(channel).await;
        }

        let poller_tokens = tokens.clone();
        let poller = StreamPoller::new(
            channels.clone(),
            streams.clone(),
            platform.clone(),
            commands.clone(),
            Arc::new(move || {
                let tokens = poller_tokens.clone();
                Box::pin(async move { tokens.current_token().await }) as std::pin::Pin<Box<dyn std::future::Future<Output = String> + Send>>
            }),
        );
        let shutdown = shutdown.clone();
        background_handles.push(tokio::spawn(async move {
            composable_rust_core::reconciler::run_periodic(poller, STREAM_POLL_INTERVAL, shutdown).await;
        }));

        let session = ChatSession::new(
            ChatSessionConfig {
                irc_host: chat_config.irc_host.clone(),
                irc_port: chat_config.irc_port,
                bot_username: chat_config.bot_username.clone(),
                channels: chat_config.channels.clone(),
            },
            tokens,
            platform,
            channels.clone(),
            commands.clone(),
        );
        let session_shutdown = shutdown.clone();
        background_handles.push(tokio::spawn(async move {
            session.run(session_shutdown).await;
        }));

        tracing::info!(channels = ?chat_config.channels, "chat session starting");
    } else {
        tracing::info!("chat session not configured, running in API-only mode");
    }

    let state = TwitchbotServiceState { commands, queries, pool };
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    tracing::info!(bind_address = %config.bind_address, "twitchbot service listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown.clone())).await?;

    shutdown.cancel();
    for handle in background_handles {
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
