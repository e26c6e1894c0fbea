//! # Core Configuration Module
//!
//! Provides configuration management for the catalog synchronization engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds provider credentials, sync tuning and the optional
//! injected HTTP client. It enforces fail-fast validation so a misconfigured
//! process refuses to start instead of failing on the first song write.
//!
//! ## Providers
//!
//! Each external provider (YouTube, Spotify) is configured through a
//! [`ProviderSettings`] block. A provider without settings is disabled: songs
//! are still stored, but nothing is resolved or reconciled for it. A provider
//! with settings but no playlist id still resolves identifiers; only playlist
//! reconciliation is skipped.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ProviderSettings};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/catalog/songs.db")
//!     .youtube(
//!         ProviderSettings::new("client-id", "client-secret", "refresh-token")
//!             .with_playlist_id("PLrehearsal"),
//!     )
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! [`CoreConfig::from_env`] reads:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `YOUTUBE_CLIENT_ID`, `YOUTUBE_CLIENT_SECRET`, `YOUTUBE_REFRESH_TOKEN` | YouTube credentials |
//! | `YOUTUBE_PLAYLIST_ID` | YouTube rehearsal playlist |
//! | `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, `SPOTIFY_REFRESH_TOKEN` | Spotify credentials |
//! | `SPOTIFY_PLAYLIST_ID` | Spotify rehearsal playlist |
//! | `CATALOG_DATABASE_PATH` | SQLite file, in-memory when unset |
//! | `SYNC_REQUEST_TIMEOUT_SECS` | Per provider call bound (default 15) |
//! | `SYNC_PLAYLIST_SCAN_LIMIT` | Max membership rows scanned (default 500) |
//! | `SYNC_TOKEN_SAFETY_MARGIN_SECS` | Early token refresh margin (default 60) |

use crate::error::{Error, Result};
use crate::logging::mask_identifier;
use bridge_traits::HttpClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default bound on a single provider call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of playlist rows inspected before giving up on a lookup.
pub const DEFAULT_PLAYLIST_SCAN_LIMIT: usize = 500;

/// Default margin before expiry at which a token is treated as expired.
pub const DEFAULT_TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Credentials and target playlist for one external provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Long-lived refresh secret issued out of band
    pub refresh_token: String,
    /// Rehearsal playlist; reconciliation is disabled when absent
    pub playlist_id: Option<String>,
}

impl ProviderSettings {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            playlist_id: None,
        }
    }

    pub fn with_playlist_id(mut self, playlist_id: impl Into<String>) -> Self {
        self.playlist_id = Some(playlist_id.into());
        self
    }

    /// Validates that every credential field is present.
    pub fn validate(&self, provider: &str) -> Result<()> {
        let fields = [
            ("client id", &self.client_id),
            ("client secret", &self.client_secret),
            ("refresh token", &self.refresh_token),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::Config(format!(
                    "{} {} cannot be empty",
                    provider, name
                )));
            }
        }

        if let Some(playlist_id) = &self.playlist_id {
            if playlist_id.trim().is_empty() {
                return Err(Error::Config(format!(
                    "{} playlist id cannot be blank; omit it to disable reconciliation",
                    provider
                )));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &mask_identifier(&self.client_id))
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("playlist_id", &self.playlist_id)
            .finish()
    }
}

/// Timing and sizing knobs for the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Upper bound for any single provider call
    pub request_timeout: Duration,
    /// Maximum playlist rows inspected by a membership lookup
    pub playlist_scan_limit: usize,
    /// Tokens expiring within this margin are refreshed before use
    pub token_safety_margin: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            playlist_scan_limit: DEFAULT_PLAYLIST_SCAN_LIMIT,
            token_safety_margin: DEFAULT_TOKEN_SAFETY_MARGIN,
        }
    }
}

impl SyncSettings {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout > Duration::from_secs(300) {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 300 seconds".to_string(),
            ));
        }

        if self.playlist_scan_limit == 0 {
            return Err(Error::Config(
                "Playlist scan limit must be greater than 0".to_string(),
            ));
        }

        if self.token_safety_margin >= Duration::from_secs(3600) {
            return Err(Error::Config(
                "Token safety margin must be shorter than one hour".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the catalog synchronization engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file, in-memory when `None`
    pub database_path: Option<PathBuf>,

    /// HTTP client for provider calls (desktop default when `None`)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// YouTube credentials, provider disabled when `None`
    pub youtube: Option<ProviderSettings>,

    /// Spotify credentials, provider disabled when `None`
    pub spotify: Option<ProviderSettings>,

    /// Sync tuning
    pub sync: SyncSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("youtube", &self.youtube)
            .field("spotify", &self.spotify)
            .field("sync", &self.sync)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if let Some(youtube) = &self.youtube {
            youtube.validate("YouTube")?;
        }

        if let Some(spotify) = &self.spotify {
            spotify.validate("Spotify")?;
        }

        self.sync.validate()
    }

    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::builder();

        if let Some(path) = read("CATALOG_DATABASE_PATH") {
            builder = builder.database_path(path);
        }

        if let Some(settings) = provider_from_lookup("YOUTUBE", &read) {
            builder = builder.youtube(settings);
        }

        if let Some(settings) = provider_from_lookup("SPOTIFY", &read) {
            builder = builder.spotify(settings);
        }

        if let Some(raw) = read("SYNC_REQUEST_TIMEOUT_SECS") {
            builder = builder.request_timeout(Duration::from_secs(parse_number(
                "SYNC_REQUEST_TIMEOUT_SECS",
                &raw,
            )?));
        }

        if let Some(raw) = read("SYNC_PLAYLIST_SCAN_LIMIT") {
            builder = builder
                .playlist_scan_limit(parse_number("SYNC_PLAYLIST_SCAN_LIMIT", &raw)? as usize);
        }

        if let Some(raw) = read("SYNC_TOKEN_SAFETY_MARGIN_SECS") {
            builder = builder.token_safety_margin(Duration::from_secs(parse_number(
                "SYNC_TOKEN_SAFETY_MARGIN_SECS",
                &raw,
            )?));
        }

        builder.build()
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

/// Reads `{PREFIX}_CLIENT_ID` and friends. A provider with no credential
/// variables at all is silently disabled; a partially configured one is
/// disabled with a warning.
fn provider_from_lookup<F>(prefix: &str, read: &F) -> Option<ProviderSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let client_id = read(&format!("{}_CLIENT_ID", prefix));
    let client_secret = read(&format!("{}_CLIENT_SECRET", prefix));
    let refresh_token = read(&format!("{}_REFRESH_TOKEN", prefix));
    let playlist_id = read(&format!("{}_PLAYLIST_ID", prefix));

    match (client_id, client_secret, refresh_token) {
        (Some(id), Some(secret), Some(refresh)) => {
            let mut settings = ProviderSettings::new(id, secret, refresh);
            settings.playlist_id = playlist_id;
            Some(settings)
        }
        (None, None, None) => None,
        _ => {
            warn!(
                provider = prefix,
                "Incomplete provider credentials, provider disabled"
            );
            None
        }
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    youtube: Option<ProviderSettings>,
    spotify: Option<ProviderSettings>,
    sync: SyncSettings,
}

impl CoreConfigBuilder {
    /// Sets the SQLite database path.
    ///
    /// When not set the catalog lives in an in-memory database.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based desktop client is used.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Enables the YouTube provider.
    pub fn youtube(mut self, settings: ProviderSettings) -> Self {
        self.youtube = Some(settings);
        self
    }

    /// Enables the Spotify provider.
    pub fn spotify(mut self, settings: ProviderSettings) -> Self {
        self.spotify = Some(settings);
        self
    }

    /// Default: 15 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.sync.request_timeout = timeout;
        self
    }

    /// Default: 500 rows
    pub fn playlist_scan_limit(mut self, limit: usize) -> Self {
        self.sync.playlist_scan_limit = limit;
        self
    }

    /// Default: 60 seconds
    pub fn token_safety_margin(mut self, margin: Duration) -> Self {
        self.sync.token_safety_margin = margin;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<CoreConfig> {
        let config = CoreConfig {
            database_path: self.database_path,
            http_client: self.http_client,
            youtube: self.youtube,
            spotify: self.spotify,
            sync: self.sync,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_builder_defaults() {
        let config = CoreConfig::builder().build().unwrap();

        assert!(config.database_path.is_none());
        assert!(config.youtube.is_none());
        assert!(config.spotify.is_none());
        assert_eq!(config.sync, SyncSettings::default());
        assert_eq!(config.sync.request_timeout, Duration::from_secs(15));
        assert_eq!(config.sync.playlist_scan_limit, 500);
    }

    #[test]
    fn test_builder_with_providers() {
        let config = CoreConfig::builder()
            .database_path("/tmp/catalog.db")
            .youtube(ProviderSettings::new("yt-id", "yt-secret", "yt-refresh").with_playlist_id("PL1"))
            .spotify(ProviderSettings::new("sp-id", "sp-secret", "sp-refresh"))
            .build()
            .unwrap();

        assert_eq!(
            config.youtube.as_ref().and_then(|s| s.playlist_id.as_deref()),
            Some("PL1")
        );
        assert!(config.spotify.as_ref().unwrap().playlist_id.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let result = CoreConfig::builder()
            .spotify(ProviderSettings::new("sp-id", "  ", "sp-refresh"))
            .build();

        match result {
            Err(Error::Config(message)) => assert!(message.contains("Spotify client secret")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let result = CoreConfig::builder()
            .request_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_scan_limit() {
        let result = CoreConfig::builder().playlist_scan_limit(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup_full() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("YOUTUBE_CLIENT_ID", "yt-id"),
            ("YOUTUBE_CLIENT_SECRET", "yt-secret"),
            ("YOUTUBE_REFRESH_TOKEN", "yt-refresh"),
            ("YOUTUBE_PLAYLIST_ID", "PLrehearsal"),
            ("SPOTIFY_CLIENT_ID", "sp-id"),
            ("SPOTIFY_CLIENT_SECRET", "sp-secret"),
            ("SPOTIFY_REFRESH_TOKEN", "sp-refresh"),
            ("CATALOG_DATABASE_PATH", "/srv/songs.db"),
            ("SYNC_REQUEST_TIMEOUT_SECS", "5"),
            ("SYNC_PLAYLIST_SCAN_LIMIT", "200"),
        ]))
        .unwrap();

        let youtube = config.youtube.unwrap();
        assert_eq!(youtube.client_id, "yt-id");
        assert_eq!(youtube.playlist_id.as_deref(), Some("PLrehearsal"));

        let spotify = config.spotify.unwrap();
        assert!(spotify.playlist_id.is_none());

        assert_eq!(config.database_path, Some(PathBuf::from("/srv/songs.db")));
        assert_eq!(config.sync.request_timeout, Duration::from_secs(5));
        assert_eq!(config.sync.playlist_scan_limit, 200);
    }

    #[test]
    fn test_from_lookup_partial_credentials_disable_provider() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("SPOTIFY_CLIENT_ID", "sp-id"),
            ("SPOTIFY_PLAYLIST_ID", "37i9"),
        ]))
        .unwrap();

        assert!(config.spotify.is_none());
    }

    #[test]
    fn test_from_lookup_blank_values_are_unset() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("YOUTUBE_CLIENT_ID", "yt-id"),
            ("YOUTUBE_CLIENT_SECRET", "yt-secret"),
            ("YOUTUBE_REFRESH_TOKEN", "yt-refresh"),
            ("YOUTUBE_PLAYLIST_ID", "   "),
        ]))
        .unwrap();

        assert!(config.youtube.unwrap().playlist_id.is_none());
    }

    #[test]
    fn test_from_lookup_rejects_bad_number() {
        let result = CoreConfig::from_lookup(lookup_from(&[("SYNC_REQUEST_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = ProviderSettings::new("abcdef123", "top-secret", "refresh-secret");
        let rendered = format!("{:?}", settings);

        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("refresh-secret"));
        assert!(rendered.contains("abcd…"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = CoreConfig::builder()
            .youtube(ProviderSettings::new("a", "b", "c"))
            .build()
            .unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.youtube, config.youtube);
    }
}
