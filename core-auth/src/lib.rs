//! # Authentication Module
//!
//! Access credentials for the external media providers.
//!
//! ## Overview
//!
//! Each provider (YouTube, Spotify) is accessed with a short-lived access
//! token obtained from a long-lived refresh secret. This crate performs that
//! exchange and caches the result per provider.
//!
//! ## Features
//!
//! - OAuth 2.0 refresh-token grant with body or Basic client authentication
//! - Lazy refresh with a configurable safety margin before expiry
//! - Single-flight refresh: concurrent callers share one token exchange
//! - Explicit invalidation after the provider rejects a token

pub mod credentials;
pub mod error;
pub mod oauth;
pub mod types;

pub use credentials::{AccessTokenProvider, CredentialCache};
pub use error::{AuthError, Result};
pub use oauth::{ClientAuthMethod, RefreshConfig, RefreshTokenExchange, TokenGrant, TokenRefresher};
pub use types::{AccessToken, ProviderKind, ProviderSession};
