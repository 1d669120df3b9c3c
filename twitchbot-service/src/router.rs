//! The representative RPC subset for the twitchbot service (spec §6),
//! exposed as Axum JSON routes.

use crate::commands::{CreateStream, EndStream, UpdateStream};
use crate::model::Stream;
use crate::queries::GetActiveStream;
use composable_rust_core::bus::{CommandBus, QueryBus};
use composable_rust_core::context::RequestContext;
use composable_rust_core::patch::Patch;
use composable_rust_transport::handlers::{health_check, readiness_check};
use composable_rust_transport::{AppError, TransportResult};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state threaded through every handler in this router.
#[derive(Clone)]
pub struct TwitchbotServiceState {
    /// The command bus, pre-registered with every twitchbot command handler.
    pub commands: Arc<CommandBus>,
    /// The query bus, pre-registered with every twitchbot query handler.
    pub queries: Arc<QueryBus>,
    /// Readiness-probe database pool.
    pub pool: PgPool,
}

impl axum::extract::FromRef<TwitchbotServiceState> for PgPool {
    fn from_ref(state: &TwitchbotServiceState) -> Self {
        state.pool.clone()
    }
}

/// Build the twitchbot service's Axum router.
#[must_use]
pub fn router(state: TwitchbotServiceState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check))
        .route("/streams", post(create_stream))
        .route("/streams/{id}", axum::routing::patch(update_stream))
        .route("/streams/{id}/end", post(end_stream))
        .route("/channels/{channel}/active-stream", get(get_active_stream))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StreamDto {
    id: String,
    channel: String,
    title: String,
    game_name: String,
    game_id: String,
    started_at: chrono::DateTime<chrono::Utc>,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
    peak_viewers: i64,
    rolling_avg_viewers: i64,
    total_message_count: i64,
    is_active: bool,
}

impl From<Stream> for StreamDto {
    fn from(stream: Stream) -> Self {
        Self {
            id: stream.id,
            channel: stream.channel,
            title: stream.title,
            game_name: stream.game_name,
            game_id: stream.game_id,
            started_at: stream.started_at,
            ended_at: stream.ended_at,
            peak_viewers: stream.peak_viewers,
            rolling_avg_viewers: stream.rolling_avg_viewers,
            total_message_count: stream.total_message_count,
            is_active: stream.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateStreamBody {
    channel: String,
    title: String,
    game_name: String,
    game_id: String,
    initial_viewers: i64,
}

async fn create_stream(
    State(state): State<TwitchbotServiceState>,
    Json(body): Json<CreateStreamBody>,
) -> TransportResult<Json<StreamDto>> {
    let ctx = RequestContext::new(None);
    let mut cmd = CreateStream {
        channel: body.channel,
        title: body.title,
        game_name: body.game_name,
        game_id: body.game_id,
        initial_viewers: body.initial_viewers,
        aggregate_id: None,
        created: None,
    };

    state.commands.dispatch(&ctx, &mut cmd).await?;
    let created = cmd
        .created
        .ok_or_else(|| AppError::internal("handler did not populate created stream"))?;
    Ok(Json(created.into()))
}

#[derive(Debug, Deserialize, Default)]
struct UpdateStreamBody {
    title: Option<String>,
    game_name: Option<String>,
    game_id: Option<String>,
    current_viewers: Option<i64>,
}

async fn update_stream(
    State(state): State<TwitchbotServiceState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStreamBody>,
) -> TransportResult<Json<serde_json::Value>> {
    let ctx = RequestContext::new(None);
    let mut cmd = UpdateStream {
        id,
        title: body.title.map_or(Patch::Unset, Patch::Set),
        game_name: body.game_name.map_or(Patch::Unset, Patch::Set),
        game_id: body.game_id.map_or(Patch::Unset, Patch::Set),
        current_viewers: body.current_viewers,
    };
    state.commands.dispatch(&ctx, &mut cmd).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

async fn end_stream(
    State(state): State<TwitchbotServiceState>,
    Path(id): Path<String>,
) -> TransportResult<Json<serde_json::Value>> {
    let ctx = RequestContext::new(None);
    let mut cmd = EndStream { id };
    state.commands.dispatch(&ctx, &mut cmd).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

async fn get_active_stream(
    State(state): State<TwitchbotServiceState>,
    Path(channel): Path<String>,
) -> TransportResult<Json<Option<StreamDto>>> {
    let ctx = RequestContext::new(None);
    let stream = state.queries.dispatch(&ctx, &GetActiveStream { channel }).await?;
    Ok(Json(stream.map(std::convert::Into::into)))
}
