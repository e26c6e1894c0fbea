//! Core service façade and bootstrap helpers.
//!
//! This crate wires the configured providers, credential caches and the
//! song catalog into a single [`CatalogService`]. Desktop and server hosts
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) to get a reqwest-backed HTTP client; other hosts pass
//! their own [`HttpClient`] through [`CoreConfig`].
//!
//! ```ignore
//! use core_service::{CatalogService, CoreConfig};
//! use core_catalog::NewSong;
//!
//! let service = CatalogService::new(CoreConfig::from_env()?).await?;
//! let synced = service.create_song(NewSong::new("Grace").with_artist("Choir")).await?;
//! for error in synced.report.errors() {
//!     eprintln!("sync issue: {error}");
//! }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{http::HttpClient, media::MediaProvider, time::SystemClock};
use core_auth::{CredentialCache, ProviderKind, RefreshConfig, RefreshTokenExchange};
use core_catalog::{
    db::{create_pool, DatabaseConfig},
    NewSong, Song, SongUpdate, SqliteSongRepository,
};
use core_runtime::config::{CoreConfig, ProviderSettings, SyncSettings};
use core_sync::{CatalogSyncOrchestrator, SyncOptions, SyncedSong};
use provider_spotify::SpotifyConnector;
use provider_youtube::YouTubeConnector;
use tracing::info;

/// A provider connector together with the credential cache it draws from.
struct ProviderHandle {
    kind: ProviderKind,
    credentials: Arc<CredentialCache>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CatalogService {
    orchestrator: Arc<CatalogSyncOrchestrator>,
    providers: Arc<Vec<ProviderHandle>>,
}

impl CatalogService {
    /// Build the service: open the catalog, run migrations and register
    /// every provider that has credentials.
    pub async fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let http_client = resolve_http_client(&config)?;

        let db_config = match &config.database_path {
            Some(path) => DatabaseConfig::new(path),
            None => DatabaseConfig::in_memory(),
        };
        let pool = create_pool(db_config).await?;
        let repository = Arc::new(SqliteSongRepository::new(pool));

        let options = SyncOptions {
            request_timeout: config.sync.request_timeout,
            playlist_scan_limit: config.sync.playlist_scan_limit,
        };
        let mut orchestrator = CatalogSyncOrchestrator::new(repository, options);
        let mut providers = Vec::new();

        if let Some(settings) = &config.youtube {
            let credentials = credential_cache(
                RefreshConfig::youtube(
                    &settings.client_id,
                    &settings.client_secret,
                    &settings.refresh_token,
                ),
                &http_client,
                &config.sync,
            );
            let connector = YouTubeConnector::new(Arc::clone(&http_client), credentials.clone())
                .with_request_timeout(config.sync.request_timeout);
            orchestrator =
                register(orchestrator, ProviderKind::YouTube, Arc::new(connector), settings);
            providers.push(ProviderHandle {
                kind: ProviderKind::YouTube,
                credentials,
            });
        }

        if let Some(settings) = &config.spotify {
            let credentials = credential_cache(
                RefreshConfig::spotify(
                    &settings.client_id,
                    &settings.client_secret,
                    &settings.refresh_token,
                ),
                &http_client,
                &config.sync,
            );
            let connector = SpotifyConnector::new(Arc::clone(&http_client), credentials.clone())
                .with_request_timeout(config.sync.request_timeout);
            orchestrator =
                register(orchestrator, ProviderKind::Spotify, Arc::new(connector), settings);
            providers.push(ProviderHandle {
                kind: ProviderKind::Spotify,
                credentials,
            });
        }

        info!(
            providers = ?orchestrator.providers(),
            database = ?config.database_path,
            "Catalog service ready"
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            providers: Arc::new(providers),
        })
    }

    /// Load configuration from the environment and build the service.
    pub async fn from_env() -> Result<Self> {
        Self::new(CoreConfig::from_env()?).await
    }

    /// Providers with credentials, in sync order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.orchestrator.providers()
    }

    pub async fn create_song(&self, song: NewSong) -> Result<SyncedSong> {
        Ok(self.orchestrator.create_song(song).await?)
    }

    pub async fn update_song(&self, id: i64, update: SongUpdate) -> Result<SyncedSong> {
        Ok(self.orchestrator.update_song(id, update).await?)
    }

    pub async fn get_song(&self, id: i64) -> Result<Option<Song>> {
        Ok(self.orchestrator.get_song(id).await?)
    }

    /// Drop the cached access token of `provider` so the next call refreshes.
    pub async fn invalidate_credentials(&self, provider: ProviderKind) {
        for handle in self.providers.iter().filter(|h| h.kind == provider) {
            handle.credentials.invalidate().await;
        }
    }
}

fn register(
    orchestrator: CatalogSyncOrchestrator,
    kind: ProviderKind,
    connector: Arc<dyn MediaProvider>,
    settings: &ProviderSettings,
) -> CatalogSyncOrchestrator {
    if settings.playlist_id.is_none() {
        info!(provider = %kind.as_str(), "No playlist configured, reconciliation disabled");
    }
    orchestrator.with_provider(kind, connector, settings.playlist_id.clone())
}

fn credential_cache(
    refresh: RefreshConfig,
    http_client: &Arc<dyn HttpClient>,
    sync: &SyncSettings,
) -> Arc<CredentialCache> {
    let exchange = Arc::new(RefreshTokenExchange::new(refresh, Arc::clone(http_client)));
    Arc::new(
        CredentialCache::new(exchange, Arc::new(SystemClock))
            .with_safety_margin(sync.token_safety_margin)
            .with_refresh_timeout(sync.request_timeout),
    )
}

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
fn resolve_http_client(config: &CoreConfig) -> Result<Arc<dyn HttpClient>> {
    if let Some(client) = &config.http_client {
        return Ok(Arc::clone(client));
    }
    let client = bridge_desktop::ReqwestHttpClient::with_timeout(config.sync.request_timeout)
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
    Ok(Arc::new(client))
}

#[cfg(not(all(feature = "desktop-shims", not(target_arch = "wasm32"))))]
fn resolve_http_client(config: &CoreConfig) -> Result<Arc<dyn HttpClient>> {
    config
        .http_client
        .as_ref()
        .map(Arc::clone)
        .ok_or_else(|| CoreError::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "enable desktop-shims or provide an HTTP client".to_string(),
        })
}
