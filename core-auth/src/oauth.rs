//! OAuth 2.0 Refresh Token Exchange
//!
//! Implements the `refresh_token` grant of RFC 6749 for server-to-server use:
//! a long-lived refresh secret, issued out of band, is traded for short-lived
//! access tokens. There is no interactive consent flow.
//!
//! # Overview
//!
//! - Google (YouTube) expects the client credentials in the form body.
//! - Spotify expects them as an HTTP Basic `Authorization` header.
//! - Server errors (5xx) are retried with exponential backoff; client errors
//!   (4xx) fail immediately.
//! - The refresh secret is never rotated, even when the endpoint returns a
//!   new one.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{RefreshConfig, RefreshTokenExchange, TokenRefresher};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = RefreshConfig::spotify("client-id", "client-secret", "refresh-secret");
//! let exchange = RefreshTokenExchange::new(config, http_client);
//! let grant = exchange.refresh().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::ProviderKind;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Google OAuth token endpoint (YouTube Data API credentials)
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Spotify accounts token endpoint
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

const MAX_ATTEMPTS: u32 = 3;

/// How the client proves its identity to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `client_id` and `client_secret` as form fields
    RequestBody,
    /// `Authorization: Basic base64(client_id:client_secret)`
    BasicHeader,
}

/// Refresh-token grant configuration for one provider.
#[derive(Clone)]
pub struct RefreshConfig {
    pub provider: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    /// Long-lived refresh secret
    pub refresh_token: String,
    /// Token endpoint URL
    pub token_url: String,
    pub client_auth: ClientAuthMethod,
}

impl RefreshConfig {
    /// Google token endpoint, credentials in the request body.
    pub fn youtube(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            provider: ProviderKind::YouTube,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_auth: ClientAuthMethod::RequestBody,
        }
    }

    /// Spotify token endpoint, credentials in a Basic header.
    pub fn spotify(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            provider: ProviderKind::Spotify,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            client_auth: ClientAuthMethod::BasicHeader,
        }
    }

    /// Override the token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

impl fmt::Debug for RefreshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("client_auth", &self.client_auth)
            .finish()
    }
}

/// A freshly issued access token and its lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds, counted from receipt
    pub expires_in: i64,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Source of new access tokens.
///
/// Implemented by [`RefreshTokenExchange`] in production and by counting
/// fakes in tests.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Provider the tokens are issued for
    fn provider(&self) -> ProviderKind;

    /// Obtain a new access token.
    async fn refresh(&self) -> Result<TokenGrant>;
}

/// Refresh-token grant against a provider token endpoint.
pub struct RefreshTokenExchange {
    config: RefreshConfig,
    http_client: Arc<dyn HttpClient>,
}

impl RefreshTokenExchange {
    pub fn new(config: RefreshConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    fn build_request(&self) -> Result<HttpRequest> {
        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", &self.config.refresh_token),
        ];

        if self.config.client_auth == ClientAuthMethod::RequestBody {
            params.push(("client_id", &self.config.client_id));
            params.push(("client_secret", &self.config.client_secret));
        }

        let mut request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Accept", "application/json")
            .form(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        if self.config.client_auth == ClientAuthMethod::BasicHeader {
            let credentials = STANDARD.encode(format!(
                "{}:{}",
                self.config.client_id, self.config.client_secret
            ));
            request = request.header("Authorization", format!("Basic {}", credentials));
        }

        Ok(request)
    }
}

#[async_trait]
impl TokenRefresher for RefreshTokenExchange {
    fn provider(&self) -> ProviderKind {
        self.config.provider
    }

    #[instrument(skip(self), fields(provider = %self.config.provider))]
    async fn refresh(&self) -> Result<TokenGrant> {
        debug!("Refreshing access token");

        let mut attempts = 0;

        loop {
            attempts += 1;

            let request = self.build_request()?;

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

            if response.is_success() {
                let token_response: TokenResponse = response.json().map_err(|e| {
                    AuthError::TokenRefreshFailed(format!("Failed to parse token response: {}", e))
                })?;

                if token_response.refresh_token.is_some() {
                    debug!("Token endpoint returned a rotated refresh secret, keeping the configured one");
                }

                info!(
                    expires_in = token_response.expires_in,
                    "Successfully refreshed access token"
                );

                return Ok(TokenGrant {
                    access_token: token_response.access_token,
                    expires_in: token_response.expires_in,
                });
            }

            let status = response.status;

            if response.is_client_error() {
                let error_body = response
                    .text()
                    .unwrap_or_else(|_| "Unable to read error response".to_string());

                warn!(
                    status = status,
                    error = %error_body,
                    "Token refresh failed without retry"
                );

                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token endpoint returned {}: {}",
                    status, error_body
                )));
            }

            if attempts >= MAX_ATTEMPTS {
                let error_body = response
                    .text()
                    .unwrap_or_else(|_| "Unable to read error response".to_string());

                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {} - {}",
                    attempts, status, error_body
                )));
            }

            let delay = Duration::from_millis(100 * 2u64.pow(attempts - 1));
            warn!(
                status = status,
                attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                "Token refresh failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    struct ScriptedHttpClient {
        responses: Mutex<VecDeque<BridgeResult<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn with(responses: Vec<BridgeResult<HttpResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(BridgeError::OperationFailed("no scripted response".to_string()))
            })
        }
    }

    fn response(status: u16, body: &str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn body_of(request: &HttpRequest) -> String {
        String::from_utf8(request.body.clone().unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_youtube_refresh_sends_credentials_in_body() {
        let http = Arc::new(ScriptedHttpClient::with(vec![response(
            200,
            r#"{"access_token":"ya29.new","expires_in":3599,"token_type":"Bearer"}"#,
        )]));
        let exchange = RefreshTokenExchange::new(
            RefreshConfig::youtube("yt-client", "yt-secret", "1//refresh"),
            http.clone(),
        );

        let grant = exchange.refresh().await.unwrap();
        assert_eq!(grant.access_token, "ya29.new");
        assert_eq!(grant.expires_in, 3599);

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, GOOGLE_TOKEN_URL);
        assert_eq!(requests[0].method, HttpMethod::Post);
        let body = body_of(&requests[0]);
        assert!(body.contains("grant_type=refresh_token"));
        assert!(body.contains("client_id=yt-client"));
        assert!(body.contains("client_secret=yt-secret"));
        assert!(!requests[0].headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn test_spotify_refresh_uses_basic_header() {
        let http = Arc::new(ScriptedHttpClient::with(vec![response(
            200,
            r#"{"access_token":"BQD","token_type":"Bearer","expires_in":3600,"refresh_token":"rotated"}"#,
        )]));
        let exchange = RefreshTokenExchange::new(
            RefreshConfig::spotify("sp-client", "sp-secret", "AQrefresh"),
            http.clone(),
        );

        let grant = exchange.refresh().await.unwrap();
        assert_eq!(grant.access_token, "BQD");
        assert_eq!(exchange.config().refresh_token, "AQrefresh");

        let requests = http.requests();
        let expected = format!("Basic {}", STANDARD.encode("sp-client:sp-secret"));
        assert_eq!(requests[0].headers.get("Authorization"), Some(&expected));
        let body = body_of(&requests[0]);
        assert!(!body.contains("client_secret"));
        assert!(body.contains("refresh_token=AQrefresh"));
    }

    #[tokio::test]
    async fn test_refresh_client_error_is_not_retried() {
        let http = Arc::new(ScriptedHttpClient::with(vec![response(
            400,
            r#"{"error":"invalid_grant"}"#,
        )]));
        let exchange =
            RefreshTokenExchange::new(RefreshConfig::youtube("a", "b", "c"), http.clone());

        let result = exchange.refresh().await;
        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(ref m)) if m.contains("400")));
        assert_eq!(http.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_retries_server_errors() {
        let http = Arc::new(ScriptedHttpClient::with(vec![
            response(503, "unavailable"),
            response(200, r#"{"access_token":"ok"}"#),
        ]));
        let exchange =
            RefreshTokenExchange::new(RefreshConfig::spotify("a", "b", "c"), http.clone());

        let grant = exchange.refresh().await.unwrap();
        assert_eq!(grant.access_token, "ok");
        assert_eq!(grant.expires_in, 3600);
        assert_eq!(http.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_gives_up_after_max_attempts() {
        let http = Arc::new(ScriptedHttpClient::with(vec![
            response(500, "boom"),
            response(502, "boom"),
            response(503, "boom"),
        ]));
        let exchange =
            RefreshTokenExchange::new(RefreshConfig::spotify("a", "b", "c"), http.clone());

        let result = exchange.refresh().await;
        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
        assert_eq!(http.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_transport_error() {
        let http = Arc::new(ScriptedHttpClient::with(vec![Err(BridgeError::Timeout(
            "HTTP request timed out".to_string(),
        ))]));
        let exchange = RefreshTokenExchange::new(RefreshConfig::youtube("a", "b", "c"), http);

        assert!(matches!(
            exchange.refresh().await,
            Err(AuthError::TokenRefreshFailed(_))
        ));
    }

    #[test]
    fn test_refresh_config_debug_redacts() {
        let config = RefreshConfig::youtube("client", "very-secret", "1//refresh-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("1//refresh-secret"));
    }

    #[test]
    fn test_token_response_deserialization_minimal() {
        let json = r#"{
            "access_token": "token"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "token");
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, 3600);
    }
}
