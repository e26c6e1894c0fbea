//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for server and desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use bridge_traits::HttpClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
//!     // Hand to the credential caches and provider connectors
//!     Ok(())
//! }
//! ```

mod http;

pub use http::ReqwestHttpClient;
