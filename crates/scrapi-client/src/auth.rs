//! Bearer token authentication for transparency services.
//!
//! Supports:
//! - Static token (from config or env)
//! - OAuth2 client-credentials exchange (client id + secret), cached until
//!   shortly before expiry

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{ScrapiError, ScrapiResult};
use crate::types::EngineConfig;

/// Path of the client-credentials token endpoint, relative to the service URL.
pub const TOKEN_PATH: &str = "/archivist/iam/v1/appidp/token";

/// Refresh this long before the cached token expires (60s buffer + 30s skew).
const EXPIRY_BUFFER_SECS: i64 = 90;

/// Token provider for service authentication.
#[derive(Debug, Clone)]
pub enum TokenProvider {
    /// Static token (from config or env).
    Static(String),

    /// Client-credentials exchange.
    ClientCredentials(ClientCredentialsProvider),

    /// No authentication.
    None,
}

impl TokenProvider {
    /// Create a static token provider.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Pick a provider from engine configuration.
    ///
    /// A static token wins over client credentials; with neither, requests
    /// go out unauthenticated.
    pub fn from_config(config: &EngineConfig, http: reqwest::Client) -> Self {
        if let Some(token) = config.token.as_ref().filter(|t| !t.is_empty()) {
            return Self::Static(token.clone());
        }

        match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) => {
                let token_url = format!("{}{}", config.url.trim_end_matches('/'), TOKEN_PATH);
                Self::ClientCredentials(ClientCredentialsProvider::new(
                    http,
                    token_url,
                    id.clone(),
                    secret.clone(),
                    config.max_retries,
                ))
            }
            _ => Self::None,
        }
    }

    /// Get the current token.
    ///
    /// For client credentials, may perform the exchange if the cached token
    /// is missing or about to expire.
    pub async fn get_token(&self) -> ScrapiResult<Option<String>> {
        match self {
            Self::Static(token) => Ok(Some(token.clone())),
            Self::ClientCredentials(provider) => provider.get_token().await.map(Some),
            Self::None => Ok(None),
        }
    }

    /// Check if authentication is configured.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    token_type: Option<String>,
}

/// OAuth2 client-credentials provider.
#[derive(Clone)]
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    max_retries: u32,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl fmt::Debug for ClientCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl ClientCredentialsProvider {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            max_retries,
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Get token, refreshing if expired.
    ///
    /// Concurrent callers that miss the cache queue on the write lock; only
    /// the first one exchanges, the rest pick up its token.
    pub async fn get_token(&self) -> ScrapiResult<String> {
        if let Some(token) = fresh_token(self.cached_token.read().await.as_ref()) {
            tracing::debug!("using cached access token");
            return Ok(token);
        }

        let mut cache = self.cached_token.write().await;
        if let Some(token) = fresh_token(cache.as_ref()) {
            tracing::debug!("access token refreshed by another caller");
            return Ok(token);
        }

        tracing::debug!(token_url = %self.token_url, "refreshing access token");
        let fresh = self.exchange_with_retry().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    /// Exchange with exponential backoff on transient failures.
    async fn exchange_with_retry(&self) -> ScrapiResult<CachedToken> {
        let mut retries: u32 = 0;

        loop {
            match self.exchange().await {
                Ok(token) => return Ok(token),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;

                    // 1s, 2s, 4s, capped at 30s
                    let backoff = std::time::Duration::from_secs(1u64 << (retries - 1).min(5));
                    let backoff = backoff.min(std::time::Duration::from_secs(30));

                    tracing::warn!(
                        error = %e,
                        retry = retries,
                        backoff_secs = backoff.as_secs(),
                        "token exchange failed, retrying"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn exchange(&self) -> ScrapiResult<CachedToken> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ScrapiError::Network {
                message: format!("failed to request access token: {}", e),
            })?;

        let status = response.status();

        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapiError::Unauthorized {
                message: format!("token exchange rejected: HTTP {} - {}", status, body),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapiError::Network {
                message: format!("token exchange failed: HTTP {} - {}", status, body),
            });
        }

        let token_response: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| ScrapiError::InvalidResponse {
                    message: format!("failed to parse token response: {}", e),
                })?;

        let expires_at =
            chrono::Utc::now() + chrono::Duration::seconds(token_response.expires_in as i64);

        tracing::info!(
            expires_in = token_response.expires_in,
            token_type = token_response.token_type.as_deref().unwrap_or("Bearer"),
            "obtained access token"
        );

        Ok(CachedToken {
            token: token_response.access_token,
            expires_at,
        })
    }

    /// Clear the cached token.
    pub async fn clear_cache(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }
}

fn fresh_token(cached: Option<&CachedToken>) -> Option<String> {
    let buffer = chrono::Duration::seconds(EXPIRY_BUFFER_SECS);
    cached
        .filter(|c| c.expires_at > chrono::Utc::now() + buffer)
        .map(|c| c.token.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_static_token_wins() {
        let config = EngineConfig::default()
            .with_token("static")
            .with_client_credentials("id", "secret");
        let provider = TokenProvider::from_config(&config, reqwest::Client::new());
        assert!(matches!(provider, TokenProvider::Static(ref t) if t == "static"));
    }

    #[test]
    fn test_client_credentials_selected() {
        let config = EngineConfig::default()
            .with_url("https://ts.example/")
            .with_client_credentials("id", "secret");
        match TokenProvider::from_config(&config, reqwest::Client::new()) {
            TokenProvider::ClientCredentials(p) => {
                assert_eq!(p.token_url, "https://ts.example/archivist/iam/v1/appidp/token");
            }
            other => panic!("expected client credentials, got {:?}", other),
        }
    }

    #[test]
    fn test_no_auth() {
        let config = EngineConfig::default().with_client_credentials("id", "secret");
        let config = EngineConfig {
            client_secret: None,
            ..config
        };
        let provider = TokenProvider::from_config(&config, reqwest::Client::new());
        assert!(!provider.is_authenticated());
    }

    #[tokio::test]
    async fn test_get_static_token() {
        let provider = TokenProvider::static_token("my-token");
        assert_eq!(provider.get_token().await.unwrap(), Some("my-token".into()));
        assert_eq!(TokenProvider::None.get_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_client_credentials_exchange_and_cache() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=my-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "issued-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ClientCredentialsProvider::new(
            reqwest::Client::new(),
            format!("{}{}", server.uri(), TOKEN_PATH),
            "my-client",
            "my-secret",
            0,
        );

        assert_eq!(provider.get_token().await.unwrap(), "issued-token");
        // Served from cache; the mock expects exactly one exchange.
        assert_eq!(provider.get_token().await.unwrap(), "issued-token");
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "short",
                "expires_in": 30
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider = ClientCredentialsProvider::new(
            reqwest::Client::new(),
            format!("{}{}", server.uri(), TOKEN_PATH),
            "id",
            "secret",
            0,
        );

        provider.get_token().await.unwrap();
        provider.get_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let provider = ClientCredentialsProvider::new(
            reqwest::Client::new(),
            format!("{}{}", server.uri(), TOKEN_PATH),
            "id",
            "wrong",
            3,
        );

        let result = provider.get_token().await;
        assert!(matches!(result, Err(ScrapiError::Unauthorized { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_exchange() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "access_token": "shared-token",
                        "expires_in": 3600
                    }))
                    .set_delay(std::time::Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = ClientCredentialsProvider::new(
            reqwest::Client::new(),
            format!("{}{}", server.uri(), TOKEN_PATH),
            "id",
            "secret",
            0,
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move { provider.get_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "shared-token");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_retry_budget_backs_off_without_overflow() {
        let provider = ClientCredentialsProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/token",
            "id",
            "secret",
            70,
        );

        let result = provider.get_token().await;
        assert!(matches!(result, Err(ScrapiError::Network { .. })));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let provider = ClientCredentialsProvider::new(
            reqwest::Client::new(),
            "https://ts.invalid/token",
            "id",
            "secret",
            0,
        );

        {
            let mut cache = provider.cached_token.write().await;
            *cache = Some(CachedToken {
                token: "cached-token".to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            });
        }

        assert_eq!(provider.get_token().await.unwrap(), "cached-token");

        provider.clear_cache().await;
        assert!(provider.cached_token.read().await.is_none());
    }
}
