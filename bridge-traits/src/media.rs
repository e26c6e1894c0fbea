//! Media Provider Abstraction
//!
//! Contract implemented by every external catalog connector (YouTube,
//! Spotify). The sync engine only talks to providers through this trait, so
//! connectors can be swapped for fakes in tests.
//!
//! Every async method is expected to obtain its own access credential; a
//! credential failure surfaces as [`BridgeError::CredentialUnavailable`].
//!
//! [`BridgeError::CredentialUnavailable`]: crate::error::BridgeError::CredentialUnavailable

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A track located on a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMatch {
    /// Provider-native track identifier
    pub id: String,
    /// Canonical public URL of the track
    pub url: String,
}

/// One membership row of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Identifier the provider needs to delete this row
    pub entry_id: String,
    /// Track the row points at
    pub track_id: String,
}

/// A page of playlist membership rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    pub entries: Vec<PlaylistEntry>,
    /// Opaque cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
}

/// External media catalog.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::MediaProvider;
///
/// async fn first_hit(provider: &dyn MediaProvider) -> Result<Option<String>> {
///     Ok(provider.search_track("Grace Choir").await?.map(|t| t.id))
/// }
/// ```
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Stable lowercase provider name used in logs and reports
    fn name(&self) -> &'static str;

    /// Extract a track identifier from a user-supplied URL or URI.
    ///
    /// Returns `None` when the input is not a recognizable link or points at
    /// a non-track resource (playlist, album, channel).
    fn parse_track_url(&self, url: &str) -> Option<String>;

    /// Search for the best matching track, returning at most one result.
    async fn search_track(&self, query: &str) -> Result<Option<TrackMatch>>;

    /// List one page of playlist membership rows.
    async fn list_playlist(&self, playlist_id: &str, cursor: Option<String>)
        -> Result<PlaylistPage>;

    /// Append a track to a playlist.
    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()>;

    /// Delete a membership row from a playlist.
    async fn remove_from_playlist(&self, playlist_id: &str, entry: &PlaylistEntry) -> Result<()>;
}
