//! The representative RPC subset for the link service (spec §6), exposed
//! as Axum JSON routes (spec §7). Only the operations spec §6 names get a
//! bespoke route; the rest of the command/query surface is exercised
//! directly through the bus.

use crate::commands::{CreateShortLink, IncrementClick, RecordClick};
use crate::model::{Click, ShortLink};
use crate::queries::{GetLinkStats, GetShortLinkByCode, LinkStats};
use composable_rust_core::bus::{CommandBus, QueryBus};
use composable_rust_core::context::RequestContext;
use composable_rust_transport::handlers::{health_check, readiness_check};
use composable_rust_transport::{AppError, TransportResult};
use axum::extract::{ConnectInfo, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared application state threaded through every handler in this router.
#[derive(Clone)]
pub struct LinkServiceState {
    /// The command bus, pre-registered with every link command handler.
    pub commands: Arc<CommandBus>,
    /// The query bus, pre-registered with every link query handler.
    pub queries: Arc<QueryBus>,
    /// Readiness-probe database pool.
    pub pool: PgPool,
    /// Base URL prefixed onto short codes when composing `full_short_url`.
    pub base_url: String,
}

impl axum::extract::FromRef<LinkServiceState> for PgPool {
    fn from_ref(state: &LinkServiceState) -> Self {
        state.pool.clone()
    }
}

/// Build the link service's Axum router.
#[must_use]
pub fn router(state: LinkServiceState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check))
        .route("/links", post(create_short_link))
        .route("/links/{short_code}", get(get_short_link_by_code))
        .route("/links/{short_code}/click", post(increment_click))
        .route("/links/{link_id}/clicks", post(record_click))
        .route("/links/{link_id}/stats", get(get_link_stats))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateShortLinkBody {
    original_url: String,
    custom_alias: Option<String>,
    title: Option<String>,
    description: Option<String>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
struct CreateShortLinkResponse {
    #[serde(flatten)]
    link: ShortLinkDto,
    full_short_url: String,
}

#[derive(Debug, Serialize)]
struct ShortLinkDto {
    id: String,
    original_url: String,
    short_code: String,
    title: Option<String>,
    description: Option<String>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    is_active: bool,
    click_count: i64,
}

impl From<ShortLink> for ShortLinkDto {
    fn from(link: ShortLink) -> Self {
        Self {
            id: link.id,
            original_url: link.original_url,
            short_code: link.short_code,
            title: link.title,
            description: link.description,
            expires_at: link.expires_at,
            is_active: link.is_active,
            click_count: link.click_count,
        }
    }
}

async fn create_short_link(
    State(state): State<LinkServiceState>,
    Json(body): Json<CreateShortLinkBody>,
) -> TransportResult<Json<CreateShortLinkResponse>> {
    let ctx = RequestContext::new(None);
    let mut cmd = CreateShortLink {
        original_url: body.original_url,
        custom_alias: body.custom_alias,
        title: body.title,
        description: body.description,
        expires_at: body.expires_at,
        aggregate_id: None,
        created: None,
    };

    state.commands.dispatch(&ctx, &mut cmd).await?;
    let created = cmd
        .created
        .ok_or_else(|| AppError::internal("handler did not populate created link"))?;

    let full_short_url = format!("{}/{}", state.base_url.trim_end_matches('/'), created.short_code);
    Ok(Json(CreateShortLinkResponse {
        link: created.into(),
        full_short_url,
    }))
}

async fn get_short_link_by_code(
    State(state): State<LinkServiceState>,
    Path(short_code): Path<String>,
) -> TransportResult<Json<ShortLinkDto>> {
    let ctx = RequestContext::new(None);
    let link = state
        .queries
        .dispatch(&ctx, &GetShortLinkByCode { short_code })
        .await?;
    Ok(Json(link.into()))
}

#[derive(Debug, Serialize)]
struct IncrementClickResponse {
    new_click_count: i64,
}

async fn increment_click(
    State(state): State<LinkServiceState>,
    Path(short_code): Path<String>,
) -> TransportResult<Json<IncrementClickResponse>> {
    let ctx = RequestContext::new(None);
    let mut cmd = IncrementClick { short_code, new_click_count: None };
    state.commands.dispatch(&ctx, &mut cmd).await?;
    let new_click_count = cmd
        .new_click_count
        .ok_or_else(|| AppError::internal("handler did not populate click count"))?;
    Ok(Json(IncrementClickResponse { new_click_count }))
}

#[derive(Debug, Deserialize)]
struct RecordClickBody {
    ip: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    country: Option<String>,
    city: Option<String>,
    device_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClickDto {
    id: String,
    link_id: String,
    ip: String,
    user_agent: String,
    referer: Option<String>,
    country: Option<String>,
    city: Option<String>,
    device_type: Option<String>,
    clicked_at: chrono::DateTime<chrono::Utc>,
}

impl From<Click> for ClickDto {
    fn from(click: Click) -> Self {
        Self {
            id: click.id,
            link_id: click.link_id,
            ip: click.ip,
            user_agent: click.user_agent,
            referer: click.referer,
            country: click.country,
            city: click.city,
            device_type: click.device_type,
            clicked_at: click.clicked_at,
        }
    }
}

async fn record_click(
    State(state): State<LinkServiceState>,
    Path(link_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<RecordClickBody>,
) -> TransportResult<Json<ClickDto>> {
    let ctx = RequestContext::new(None);
    let mut cmd = RecordClick {
        link_id,
        ip: body.ip.unwrap_or_else(|| addr.ip().to_string()),
        user_agent: body.user_agent.unwrap_or_default(),
        referer: body.referer,
        country: body.country,
        city: body.city,
        device_type: body.device_type,
        created: None,
    };

    state.commands.dispatch(&ctx, &mut cmd).await?;
    let created = cmd
        .created
        .ok_or_else(|| AppError::internal("handler did not populate click"))?;
    Ok(Json(created.into()))
}

async fn get_link_stats(
    State(state): State<LinkServiceState>,
    Path(link_id): Path<String>,
) -> TransportResult<Json<LinkStats>> {
    let ctx = RequestContext::new(None);
    let stats = state
        .queries
        .dispatch(&ctx, &GetLinkStats { link_id })
        .await?;
    Ok(Json(stats))
}
