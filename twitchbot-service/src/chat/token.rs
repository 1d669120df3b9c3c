//! Token refresh manager (spec §4.8, §5): holds the chat session's current
//! bearer token and its expiry behind a mutex; callers read under a shared
//! lock and refresh under an exclusive one.

use crate::platform::PlatformClient;
use chrono::{DateTime, Utc};
use composable_rust_core::error::{CoreError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

struct TokenState {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// Manages the chat session's OAuth bearer token, refreshing it on demand
/// (spec §4.8: "On any HTTP request... that returns unauthorized, and on
/// any explicit token-expired signal... attempt refresh").
pub struct TokenManager {
    platform: Arc<dyn PlatformClient>,
    client_id: String,
    client_secret: Option<String>,
    state: RwLock<TokenState>,
}

impl TokenManager {
    /// Seed the manager with the initial access token from configuration.
    #[must_use]
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        client_id: String,
        client_secret: Option<String>,
        initial_access_token: String,
        initial_refresh_token: Option<String>,
    ) -> Self {
        Self {
            platform,
            client_id,
            client_secret,
            state: RwLock::new(TokenState {
                access_token: initial_access_token,
                refresh_token: initial_refresh_token,
                expires_at: None,
            }),
        }
    }

    /// The current bearer token, for use on an outbound request.
    pub async fn current_token(&self) -> String {
        self.state.read().await.access_token.clone()
    }

    /// Attempt a refresh in the order spec §4.8 mandates: (1) the OAuth
    /// refresh-token grant if a refresh token is held, (2) the
    /// client-credentials grant if client id and secret are configured.
    /// Returns the new access token so the session can swap its
    /// authentication material without tearing down the connection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FailedPrecondition`] if neither refresh path is
    /// available, or the platform error if the attempted grant fails.
    pub async fn refresh(&self) -> Result<String> {
        let mut state = self.state.write().await;

        if let Some(refresh_token) = state.refresh_token.clone() {
            if let Some(secret) = &self.client_secret {
                let refreshed = self
                    .platform
                    .refresh_with_refresh_token(&self.client_id, secret, &refresh_token)
                    .await?;
                state.access_token = refreshed.access_token.clone();
                state.refresh_token = refreshed.refresh_token.or(Some(refresh_token));
                state.expires_at = Some(Utc::now() + chrono::Duration::seconds(refreshed.expires_in_seconds));
                return Ok(state.access_token.clone());
            }
        }

        if let Some(secret) = &self.client_secret {
            let refreshed = self.platform.client_credentials_grant(&self.client_id, secret).await?;
            state.access_token = refreshed.access_token.clone();
            state.refresh_token = refreshed.refresh_token;
            state.expires_at = Some(Utc::now() + chrono::Duration::seconds(refreshed.expires_in_seconds));
            return Ok(state.access_token.clone());
        }

        Err(CoreError::FailedPrecondition(
            "no refresh token or client credentials configured".into(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::platform::{ChatterInfo, LiveStreamInfo, RefreshedToken};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakePlatform {
        refresh_calls: AtomicU32,
        client_credential_calls: AtomicU32,
    }

    impl PlatformClient for FakePlatform {
        fn get_stream_status<'a>(
            &'a self,
            _channel: &'a str,
            _access_token: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<LiveStreamInfo>>> + Send + 'a>> {
            Box::pin(async move { Ok(None) })
        }

        fn get_chatters<'a>(
            &'a self,
            _channel: &'a str,
            _access_token: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ChatterInfo>>> + Send + 'a>> {
            Box::pin(async move { Ok(vec![]) })
        }

        fn refresh_with_refresh_token<'a>(
            &'a self,
            _client_id: &'a str,
            _client_secret: &'a str,
            _refresh_token: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<RefreshedToken>> + Send + 'a>> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(RefreshedToken {
                    access_token: "refreshed-token".into(),
                    refresh_token: Some("new-refresh-token".into()),
                    expires_in_seconds: 3600,
                })
            })
        }

        fn client_credentials_grant<'a>(
            &'a self,
            _client_id: &'a str,
            _client_secret: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<RefreshedToken>> + Send + 'a>> {
            self.client_credential_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(RefreshedToken {
                    access_token: "client-credentials-token".into(),
                    refresh_token: None,
                    expires_in_seconds: 3600,
                })
            })
        }
    }

    #[tokio::test]
    async fn prefers_refresh_token_grant_when_held() {
        let platform = Arc::new(FakePlatform {
            refresh_calls: AtomicU32::new(0),
            client_credential_calls: AtomicU32::new(0),
        });
        let manager = TokenManager::new(
            platform.clone(),
            "client".into(),
            Some("secret".into()),
            "initial".into(),
            Some("refresh-1".into()),
        );

        let new_token = manager.refresh().await.unwrap();
        assert_eq!(new_token, "refreshed-token");
        assert_eq!(platform.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(platform.client_credential_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_client_credentials_without_refresh_token() {
        let platform = Arc::new(FakePlatform {
            refresh_calls: AtomicU32::new(0),
            client_credential_calls: AtomicU32::new(0),
        });
        let manager = TokenManager::new(platform.clone(), "client".into(), Some("secret".into()), "initial".into(), None);

        let new_token = manager.refresh().await.unwrap();
        assert_eq!(new_token, "client-credentials-token");
        assert_eq!(platform.client_credential_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_fails_precondition_without_any_grant_material() {
        let platform = Arc::new(FakePlatform {
            refresh_calls: AtomicU32::new(0),
            client_credential_calls: AtomicU32::new(0),
        });
        let manager = TokenManager::new(platform, "client".into(), None, "initial".into(), None);

        let err = manager.refresh().await.unwrap_err();
        assert!(matches!(err, CoreError::FailedPrecondition(_)));
    }
}
