//! Spotify Web API connector implementation
//!
//! Implements the `MediaProvider` trait for the Spotify Web API.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, Replay};
use bridge_traits::media::{MediaProvider, PlaylistEntry, PlaylistPage, TrackMatch};
use core_auth::AccessTokenProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::SpotifyError;
use crate::types::{
    AddTracksRequest, ApiErrorResponse, Paging, PlaylistTrackObject, RemoveTracksRequest,
    SearchResponse, TrackUri,
};
use crate::urls;

/// Spotify Web API base URL
const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Maximum tracks per playlist page (API limit)
const MAX_PAGE_SIZE: usize = 100;

/// Only the fields membership checks need
const PLAYLIST_FIELDS: &str = "items(track(id,uri)),next";

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(100);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Spotify Web API connector
///
/// Playlist cursors are stringified offsets.
///
/// # Example
///
/// ```ignore
/// use provider_spotify::SpotifyConnector;
/// use bridge_traits::media::MediaProvider;
///
/// let connector = SpotifyConnector::new(http_client, credentials);
/// let page = connector.list_playlist("37i9dQZF1DXcBWIGoYBM5M", None).await?;
/// ```
pub struct SpotifyConnector {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<dyn AccessTokenProvider>,
    api_base: String,
    base_backoff: Duration,
    request_timeout: Duration,
}

impl SpotifyConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http_client,
            credentials,
            api_base: SPOTIFY_API_BASE.to_string(),
            base_backoff: BASE_BACKOFF,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    fn playlist_tracks_url(&self, playlist_id: &str) -> String {
        format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        )
    }

    fn retry_after(response: &HttpResponse) -> Option<Duration> {
        response
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    fn api_error(response: &HttpResponse) -> SpotifyError {
        let message = serde_json::from_slice::<ApiErrorResponse>(&response.body)
            .ok()
            .map(|r| r.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(&response.body).to_string());

        match response.status {
            401 => SpotifyError::AuthenticationFailed(message),
            429 => SpotifyError::RateLimitExceeded {
                retry_after_seconds: Self::retry_after(response)
                    .map(|d| d.as_secs())
                    .unwrap_or(0),
            },
            status_code => SpotifyError::ApiError {
                status_code,
                message,
            },
        }
    }

    /// Execute an authorized API request with retry logic
    ///
    /// 429 honors `Retry-After` (capped); 5xx and transport errors back off
    /// exponentially. A 401 invalidates the cached token and is retried once.
    /// Under [`Replay::RejectedOnly`] only a 429 is retried.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest, replay: Replay) -> crate::Result<HttpResponse> {
        let mut attempt = 0;
        let mut reauthorized = false;

        loop {
            let token = self
                .credentials
                .access_token()
                .await
                .map_err(|e| SpotifyError::BridgeError(e.into()))?;

            let authorized = request
                .clone()
                .bearer_token(token)
                .header("Accept", "application/json")
                .timeout(self.request_timeout);

            match self.http_client.execute(authorized).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "API request succeeded");
                    return Ok(response);
                }
                Ok(response) if response.status == 401 && !reauthorized => {
                    warn!("Access token rejected, refreshing and retrying once");
                    self.credentials.invalidate().await;
                    reauthorized = true;
                }
                Ok(response) if response.is_retryable() && replay.allows(response.status) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        warn!(
                            status = response.status,
                            attempts = MAX_ATTEMPTS,
                            "API request failed after retries"
                        );
                        return Err(Self::api_error(&response));
                    }
                    let backoff = Self::retry_after(&response)
                        .map(|d| d.min(MAX_RETRY_AFTER))
                        .unwrap_or_else(|| self.base_backoff * 2u32.pow(attempt));
                    warn!(
                        status = response.status,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "API request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Ok(response) => {
                    warn!(status = response.status, "API request failed");
                    return Err(Self::api_error(&response));
                }
                Err(e) if replay == Replay::RejectedOnly => {
                    warn!(error = %e, "Request outcome unknown, not replaying");
                    return Err(e.into());
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        warn!(error = %e, attempts = MAX_ATTEMPTS, "API request failed after retries");
                        return Err(e.into());
                    }
                    warn!(error = %e, attempt, "API request failed, retrying");
                    tokio::time::sleep(self.base_backoff * 2u32.pow(attempt)).await;
                }
            }
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(
        response: &HttpResponse,
        what: &str,
    ) -> crate::Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| SpotifyError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }
}

#[async_trait]
impl MediaProvider for SpotifyConnector {
    fn name(&self) -> &'static str {
        "spotify"
    }

    fn parse_track_url(&self, url: &str) -> Option<String> {
        urls::parse_track_id(url)
    }

    #[instrument(skip(self))]
    async fn search_track(&self, query: &str) -> Result<Option<TrackMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let url = format!(
            "{}/search?type=track&limit=1&q={}",
            self.api_base,
            urlencoding::encode(query)
        );
        let response = self
            .send(HttpRequest::new(HttpMethod::Get, url), Replay::Always)
            .await?;
        let results: SearchResponse = Self::parse(&response, "search response")?;

        let hit = results
            .tracks
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .find_map(|track| track.id)
            .map(|id| TrackMatch {
                url: urls::canonical_track_url(&id),
                id,
            });

        match &hit {
            Some(track) => info!(track_id = %track.id, "Search matched a track"),
            None => info!("Search returned no track"),
        }

        Ok(hit)
    }

    #[instrument(skip(self))]
    async fn list_playlist(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<PlaylistPage> {
        let offset = match cursor {
            Some(cursor) => cursor.parse::<usize>().map_err(|_| {
                SpotifyError::ParseError(format!("Invalid playlist cursor: {}", cursor))
            })?,
            None => 0,
        };

        let url = format!(
            "{}?limit={}&offset={}&fields={}",
            self.playlist_tracks_url(playlist_id),
            MAX_PAGE_SIZE,
            offset,
            urlencoding::encode(PLAYLIST_FIELDS)
        );
        let response = self
            .send(HttpRequest::new(HttpMethod::Get, url), Replay::Always)
            .await?;
        let page: Paging<PlaylistTrackObject> = Self::parse(&response, "playlist tracks")?;

        let scanned = page.items.len();
        let entries: Vec<PlaylistEntry> = page
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(|track| {
                let id = track.id?;
                Some(PlaylistEntry {
                    entry_id: track.uri.unwrap_or_else(|| urls::track_uri(&id)),
                    track_id: id,
                })
            })
            .collect();

        debug!(offset, count = entries.len(), "Listed playlist tracks");

        let next_cursor = match page.next {
            Some(_) if scanned > 0 => Some((offset + scanned).to_string()),
            _ => None,
        };

        Ok(PlaylistPage {
            entries,
            next_cursor,
        })
    }

    #[instrument(skip(self))]
    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Post, self.playlist_tracks_url(playlist_id))
            .json(&AddTracksRequest {
                uris: vec![urls::track_uri(track_id)],
            })?;

        self.send(request, Replay::RejectedOnly).await?;
        info!("Added track to playlist");
        Ok(())
    }

    #[instrument(skip(self, entry), fields(uri = %entry.entry_id))]
    async fn remove_from_playlist(&self, playlist_id: &str, entry: &PlaylistEntry) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Delete, self.playlist_tracks_url(playlist_id))
            .json(&RemoveTracksRequest {
                tracks: vec![TrackUri {
                    uri: entry.entry_id.clone(),
                }],
            })?;

        self.send(request, Replay::Always).await?;
        info!(playlist_id, "Removed track from playlist");
        Ok(())
    }
}
