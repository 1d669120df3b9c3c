//! Thin REST client for the third-party chat/streaming platform (spec §4.5
//! stream poller, §4.8 chatter-list hydration, token refresh). Every
//! outbound call carries a bounded deadline (spec §5: "order 10 s").

use composable_rust_core::error::{CoreError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Outbound HTTP deadline for every platform call (spec §5).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Live-status snapshot for a channel, as returned by the platform's
/// streams API.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStreamInfo {
    /// Current stream title.
    pub title: String,
    /// Current game name.
    pub game_name: String,
    /// Current game id.
    pub game_id: String,
    /// Current viewer count.
    pub viewer_count: i64,
}

/// A single entry from the chatter-list endpoint, used for viewer
/// hydration on channel join (spec §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct ChatterInfo {
    /// Platform user id.
    pub user_id: String,
    /// Login username.
    pub username: String,
    /// Display name.
    pub display_name: String,
}

/// A refreshed bearer token and its known expiry, returned by an OAuth grant.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedToken {
    /// The new bearer access token.
    pub access_token: String,
    /// A rotated refresh token, if the platform issued one.
    pub refresh_token: Option<String>,
    /// Seconds until this token expires, as reported by the platform.
    pub expires_in_seconds: i64,
}

/// REST surface this service depends on from the chat platform. An
/// interface rather than a concrete client so the stream poller and chat
/// session can be unit-tested against a fake.
pub trait PlatformClient: Send + Sync {
    /// Current live status for `channel`, or `None` if it is offline.
    fn get_stream_status<'a>(
        &'a self,
        channel: &'a str,
        access_token: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<LiveStreamInfo>>> + Send + 'a>>;

    /// The current chatter list for `channel` (requires moderator scope).
    fn get_chatters<'a>(
        &'a self,
        channel: &'a str,
        access_token: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<ChatterInfo>>> + Send + 'a>>;

    /// Exchange a refresh token for a new access token (spec §4.8 order 1).
    fn refresh_with_refresh_token<'a>(
        &'a self,
        client_id: &'a str,
        client_secret: &'a str,
        refresh_token: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RefreshedToken>> + Send + 'a>>;

    /// Obtain a new token via the client-credentials grant (spec §4.8 order 2).
    fn client_credentials_grant<'a>(
        &'a self,
        client_id: &'a str,
        client_secret: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RefreshedToken>> + Send + 'a>>;
}

#[derive(Deserialize)]
struct StreamsResponse {
    data: Vec<StreamEntry>,
}

#[derive(Deserialize)]
struct StreamEntry {
    title: String,
    game_name: String,
    game_id: String,
    viewer_count: i64,
}

#[derive(Deserialize)]
struct ChattersResponse {
    data: Vec<ChatterEntry>,
}

#[derive(Deserialize)]
struct ChatterEntry {
    user_id: String,
    user_login: String,
    user_name: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// `reqwest`-backed [`PlatformClient`] against the platform's Helix-style
/// REST API.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    client_id: String,
}

impl HttpPlatformClient {
    /// Build a new client. `client_id` is sent as the `Client-Id` header on
    /// every authenticated API call, per the platform's convention.
    #[must_use]
    pub fn new(api_base: String, oauth_base: String, client_id: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, api_base, oauth_base, client_id }
    }

    fn http_err(e: reqwest::Error) -> CoreError {
        CoreError::Internal(format!("platform request failed: {e}"))
    }
}

impl PlatformClient for HttpPlatformClient {
    fn get_stream_status<'a>(
        &'a self,
        channel: &'a str,
        access_token: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<LiveStreamInfo>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .get(format!("{}/streams", self.api_base))
                .query(&[("user_login", channel)])
                .bearer_auth(access_token)
                .header("Client-Id", &self.client_id)
                .send()
                .await
                .map_err(Self::http_err)?;

            if response.status() == reqwest::StatusCode::UNAUTHORIZED {
                return Err(CoreError::NotAuthorized("platform access token rejected".into()));
            }

            let body: StreamsResponse = response.json().await.map_err(Self::http_err)?;
            Ok(body.data.into_iter().next().map(|entry| LiveStreamInfo {
                title: entry.title,
                game_name: entry.game_name,
                game_id: entry.game_id,
                viewer_count: entry.viewer_count,
            }))
        })
    }

    fn get_chatters<'a>(
        &'a self,
        channel: &'a str,
        access_token: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<ChatterInfo>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .get(format!("{}/chat/chatters", self.api_base))
                .query(&[("broadcaster_login", channel)])
                .bearer_auth(access_token)
                .header("Client-Id", &self.client_id)
                .send()
                .await
                .map_err(Self::http_err)?;

            if response.status() == reqwest::StatusCode::UNAUTHORIZED {
                return Err(CoreError::NotAuthorized("platform access token rejected".into()));
            }

            let body: ChattersResponse = response.json().await.map_err(Self::http_err)?;
            Ok(body
                .data
                .into_iter()
                .map(|entry| ChatterInfo {
                    user_id: entry.user_id,
                    username: entry.user_login,
                    display_name: entry.user_name,
                })
                .collect())
        })
    }

    fn refresh_with_refresh_token<'a>(
        &'a self,
        client_id: &'a str,
        client_secret: &'a str,
        refresh_token: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RefreshedToken>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .post(format!("{}/token", self.oauth_base))
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ])
                .send()
                .await
                .map_err(Self::http_err)?;

            let body: TokenResponse = response.json().await.map_err(Self::http_err)?;
            Ok(RefreshedToken {
                access_token: body.access_token,
                refresh_token: body.refresh_token,
                expires_in_seconds: body.expires_in,
            })
        })
    }

    fn client_credentials_grant<'a>(
        &'a self,
        client_id: &'a str,
        client_secret: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RefreshedToken>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .post(format!("{}/token", self.oauth_base))
                .form(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ])
                .send()
                .await
                .map_err(Self::http_err)?;

            let body: TokenResponse = response.json().await.map_err(Self::http_err)?;
            Ok(RefreshedToken {
                access_token: body.access_token,
                refresh_token: body.refresh_token,
                expires_in_seconds: body.expires_in,
            })
        })
    }
}
