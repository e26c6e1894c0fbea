//! # Host Bridge Traits
//!
//! Capability contracts shared by the catalog sync core and its adapters.
//!
//! ## Overview
//!
//! This crate defines the seams between the sync engine and the outside world.
//! Each trait represents a capability the core needs but does not implement
//! itself: HTTP transport, time, log forwarding, and the external media
//! providers.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - One-shot async HTTP round trips
//!
//! ### Media Providers
//! - [`MediaProvider`](media::MediaProvider) - Track search, URL parsing and playlist membership
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Implementations
//!
//! | Capability | Implementation Crate |
//! |------------|---------------------|
//! | `HttpClient` | `bridge-desktop` |
//! | `MediaProvider` (YouTube) | `provider-youtube` |
//! | `MediaProvider` (Spotify) | `provider-spotify` |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Implementations should:
//!
//! - Convert provider-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Report credential failures as `BridgeError::CredentialUnavailable`
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks. Implementations must ensure thread safety.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod media;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, Replay};
pub use media::{MediaProvider, PlaylistEntry, PlaylistPage, TrackMatch};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
