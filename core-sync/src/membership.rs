//! # Playlist Membership Service
//!
//! Idempotent "make sure this track is (not) in that playlist" operations.
//!
//! Both operations first scan the playlist page by page, bounded by the scan
//! limit, and only mutate when the playlist is not already in the wanted
//! state. Running either operation twice in a row mutates at most once.

use bridge_traits::media::{MediaProvider, PlaylistEntry, PlaylistPage};
use core_auth::ProviderKind;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{Outcome, ProviderOperation, SyncError};
use crate::resolver::DEFAULT_REQUEST_TIMEOUT;

/// Entries inspected before a scan gives up.
pub const DEFAULT_SCAN_LIMIT: usize = 500;

/// Successful result of a membership operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    /// The playlist was changed
    Mutated,
    /// The playlist was already in the requested state
    AlreadySatisfied,
}

pub struct PlaylistMembershipService {
    kind: ProviderKind,
    provider: Arc<dyn MediaProvider>,
    scan_limit: usize,
    request_timeout: Duration,
}

impl PlaylistMembershipService {
    pub fn new(kind: ProviderKind, provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            kind,
            provider,
            scan_limit: DEFAULT_SCAN_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = scan_limit.max(1);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Add `track_id` unless the playlist already contains it.
    #[instrument(skip(self), fields(provider = %self.kind.as_str()))]
    pub async fn ensure_present(
        &self,
        track_id: &str,
        playlist_id: &str,
    ) -> Outcome<MembershipChange> {
        if self.find_entry(track_id, playlist_id).await?.is_some() {
            debug!("Track already in playlist");
            return Ok(MembershipChange::AlreadySatisfied);
        }

        self.bounded(
            ProviderOperation::Mutate,
            self.provider.add_to_playlist(playlist_id, track_id),
        )
        .await?;

        info!("Track added to playlist");
        Ok(MembershipChange::Mutated)
    }

    /// Remove `track_id` if the playlist contains it.
    #[instrument(skip(self), fields(provider = %self.kind.as_str()))]
    pub async fn ensure_absent(
        &self,
        track_id: &str,
        playlist_id: &str,
    ) -> Outcome<MembershipChange> {
        let Some(entry) = self.find_entry(track_id, playlist_id).await? else {
            debug!("Track not in playlist");
            return Ok(MembershipChange::AlreadySatisfied);
        };

        self.bounded(
            ProviderOperation::Mutate,
            self.provider.remove_from_playlist(playlist_id, &entry),
        )
        .await?;

        info!(entry_id = %entry.entry_id, "Track removed from playlist");
        Ok(MembershipChange::Mutated)
    }

    /// Scan the playlist for the first row pointing at `track_id`.
    ///
    /// Stops at the scan limit; a track beyond it is reported as absent.
    async fn find_entry(&self, track_id: &str, playlist_id: &str) -> Outcome<Option<PlaylistEntry>> {
        let mut cursor: Option<String> = None;
        let mut scanned = 0usize;
        let mut pages = 0usize;

        loop {
            let page: PlaylistPage = self
                .bounded(
                    ProviderOperation::Query,
                    self.provider.list_playlist(playlist_id, cursor.clone()),
                )
                .await?;
            pages += 1;

            for entry in page.entries {
                if entry.track_id == track_id {
                    return Ok(Some(entry));
                }
                scanned += 1;
                if scanned >= self.scan_limit {
                    warn!(
                        scan_limit = self.scan_limit,
                        "Playlist scan limit reached, treating track as absent"
                    );
                    return Ok(None);
                }
            }

            match page.next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() && pages < self.scan_limit => {
                    cursor = Some(next);
                }
                _ => return Ok(None),
            }
        }
    }

    /// Run one provider call under the request timeout.
    async fn bounded<T>(
        &self,
        operation: ProviderOperation,
        call: impl Future<Output = bridge_traits::error::Result<T>>,
    ) -> Outcome<T> {
        match timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(error = %e, ?operation, "Provider call failed");
                Err(SyncError::from_provider(self.kind, operation, &e))
            }
            Err(_) => {
                warn!(?operation, "Provider call timed out");
                Err(SyncError::for_operation(
                    self.kind,
                    operation,
                    format!("timed out after {}ms", self.request_timeout.as_millis()),
                ))
            }
        }
    }
}
