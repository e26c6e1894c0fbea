//! HTTP Client Abstraction
//!
//! Provides async HTTP operations used by the token exchange and the provider
//! connectors. Implementations own TLS and connection pooling; callers decide
//! which requests may be sent again, see [`Replay`].

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Methods used by the token endpoints and the provider REST APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

/// When a failed request may be sent again.
///
/// Reads and deletes can be replayed after any transient failure. A
/// non-idempotent write whose outcome is unknown (timeout, dropped
/// connection, 5xx) may already have been applied, so it is only replayed
/// when the server rejected it outright with a 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    Always,
    RejectedOnly,
}

impl Replay {
    /// Whether a retryable `status` may be answered with another attempt.
    pub fn allows(self, status: u16) -> bool {
        match self {
            Replay::Always => true,
            Replay::RejectedOnly => status == 429,
        }
    }
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Attach an `application/x-www-form-urlencoded` body.
    pub fn form<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(body).map_err(|e| {
            BridgeError::OperationFailed(format!("Form serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(encoded));
        self.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        Ok(self)
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Rate limiting and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || self.is_server_error()
    }
}

/// Async HTTP transport.
///
/// One call is one round trip: implementations return every status code as
/// an [`HttpResponse`] and only fail on transport errors. Retry, backoff and
/// re-authentication belong to the caller, which knows whether a request is
/// safe to repeat.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn first_playlist_page(client: &dyn HttpClient, token: &str) -> Result<String> {
///     let request = HttpRequest::new(
///         HttpMethod::Get,
///         "https://www.googleapis.com/youtube/v3/playlistItems?part=snippet&playlistId=PL1",
///     )
///     .bearer_token(token);
///
///     client.execute(request).await?.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
