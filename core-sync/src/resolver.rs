//! # Identifier Resolver
//!
//! Finds the provider track a song should be bound to.
//!
//! An explicit link wins and is parsed locally; it never falls back to a
//! search, even when it does not point at a track. Without a link the
//! provider is searched with `"{title} {artist}"` and the first hit is used.

use bridge_traits::media::MediaProvider;
use core_auth::ProviderKind;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{Outcome, ProviderOperation, SyncError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A provider track and the link stored alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTrack {
    pub id: String,
    pub url: String,
}

/// Search text for a song: `"{title} {artist}"`, or just the title.
pub fn search_query(title: &str, artist: Option<&str>) -> String {
    let title = title.trim();
    match artist.map(str::trim).filter(|a| !a.is_empty()) {
        Some(artist) => format!("{} {}", title, artist).trim().to_string(),
        None => title.to_string(),
    }
}

pub struct IdentifierResolver {
    kind: ProviderKind,
    provider: Arc<dyn MediaProvider>,
    request_timeout: Duration,
}

impl IdentifierResolver {
    pub fn new(kind: ProviderKind, provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            kind,
            provider,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.kind
    }

    /// Resolve the track for a song.
    ///
    /// Returns `Ok(None)` when an explicit link is not a track link or the
    /// search has no result. Provider failures are `Err`.
    #[instrument(skip(self, explicit_url), fields(provider = %self.kind.as_str()))]
    pub async fn resolve(
        &self,
        title: &str,
        artist: Option<&str>,
        explicit_url: Option<&str>,
    ) -> Outcome<Option<ResolvedTrack>> {
        if let Some(url) = explicit_url.map(str::trim).filter(|u| !u.is_empty()) {
            return Ok(match self.provider.parse_track_url(url) {
                Some(id) => {
                    debug!(track_id = %id, "Explicit link resolved");
                    Some(ResolvedTrack {
                        id,
                        url: url.to_string(),
                    })
                }
                None => {
                    warn!("Explicit link is not a recognizable track link");
                    None
                }
            });
        }

        let query = search_query(title, artist);
        if query.is_empty() {
            return Ok(None);
        }

        match timeout(self.request_timeout, self.provider.search_track(&query)).await {
            Ok(Ok(Some(hit))) => {
                info!(track_id = %hit.id, "Search resolved track");
                Ok(Some(ResolvedTrack {
                    id: hit.id,
                    url: hit.url,
                }))
            }
            Ok(Ok(None)) => {
                info!("Search found no track");
                Ok(None)
            }
            Ok(Err(e)) => Err(SyncError::from_provider(
                self.kind,
                ProviderOperation::Search,
                &e,
            )),
            Err(_) => Err(SyncError::for_operation(
                self.kind,
                ProviderOperation::Search,
                format!("search timed out after {}ms", self.request_timeout.as_millis()),
            )),
        }
    }
}
