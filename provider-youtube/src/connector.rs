//! YouTube Data API connector implementation
//!
//! Implements the `MediaProvider` trait for YouTube Data API v3.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, Replay};
use bridge_traits::media::{MediaProvider, PlaylistEntry, PlaylistPage, TrackMatch};
use core_auth::AccessTokenProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::YouTubeError;
use crate::types::{
    ApiErrorResponse, PlaylistItemInsert, PlaylistItemListResponse, SearchListResponse, VIDEO_KIND,
};
use crate::urls;

/// YouTube Data API base URL
const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum results per playlistItems page (API limit)
const MAX_PAGE_SIZE: u32 = 50;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// YouTube Data API connector
///
/// # Features
///
/// - Best-match video search
/// - Paginated playlist membership listing (pageToken)
/// - Playlist item insertion and deletion
/// - Exponential backoff on 429 and 5xx
/// - One re-authorization on 401 after invalidating the cached token
///
/// # Example
///
/// ```ignore
/// use provider_youtube::YouTubeConnector;
/// use bridge_traits::media::MediaProvider;
///
/// let connector = YouTubeConnector::new(http_client, credentials);
/// let hit = connector.search_track("Grace Choir").await?;
/// ```
pub struct YouTubeConnector {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<dyn AccessTokenProvider>,
    api_base: String,
    base_backoff: Duration,
    request_timeout: Duration,
}

impl YouTubeConnector {
    /// Create a new YouTube connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `credentials` - Source of access tokens with the `youtube` scope
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http_client,
            credentials,
            api_base: YOUTUBE_API_BASE.to_string(),
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

    fn api_error(response: &HttpResponse) -> YouTubeError {
        let parsed = serde_json::from_slice::<ApiErrorResponse>(&response.body).ok();
        let reason = parsed
            .as_ref()
            .and_then(|r| r.error.errors.first())
            .map(|detail| detail.reason.clone())
            .unwrap_or_default();
        let message = parsed
            .map(|r| r.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(&response.body).to_string());

        match response.status {
            401 => YouTubeError::AuthenticationFailed(message),
            403 if reason == "quotaExceeded" || reason == "rateLimitExceeded" => {
                YouTubeError::QuotaExceeded(message)
            }
            status_code => YouTubeError::ApiError {
                status_code,
                message,
            },
        }
    }

    /// Execute an authorized API request with retry logic
    ///
    /// 429 and 5xx responses and transport errors are retried with
    /// exponential backoff. A 401 invalidates the cached token and is
    /// retried once with a fresh one. Under [`Replay::RejectedOnly`] only a
    /// 429 is retried, so an insert is never applied twice.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest, replay: Replay) -> crate::Result<HttpResponse> {
        let mut attempt = 0;
        let mut reauthorized = false;

        loop {
            let token = self
                .credentials
                .access_token()
                .await
                .map_err(|e| YouTubeError::BridgeError(e.into()))?;

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
                    let backoff = self.base_backoff * 2u32.pow(attempt);
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
                    let backoff = self.base_backoff * 2u32.pow(attempt);
                    warn!(error = %e, attempt, "API request failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(
        response: &HttpResponse,
        what: &str,
    ) -> crate::Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| YouTubeError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }
}

#[async_trait]
impl MediaProvider for YouTubeConnector {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn parse_track_url(&self, url: &str) -> Option<String> {
        urls::parse_video_id(url)
    }

    #[instrument(skip(self))]
    async fn search_track(&self, query: &str) -> Result<Option<TrackMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let url = format!(
            "{}/search?part=snippet&type=video&maxResults=1&q={}",
            self.api_base,
            urlencoding::encode(query)
        );
        let response = self
            .send(HttpRequest::new(HttpMethod::Get, url), Replay::Always)
            .await?;
        let results: SearchListResponse = Self::parse(&response, "search response")?;

        let hit = results
            .items
            .into_iter()
            .filter(|item| item.id.kind == VIDEO_KIND)
            .find_map(|item| item.id.video_id)
            .map(|id| TrackMatch {
                url: urls::canonical_video_url(&id),
                id,
            });

        match &hit {
            Some(track) => info!(video_id = %track.id, "Search matched a video"),
            None => info!("Search returned no video"),
        }

        Ok(hit)
    }

    #[instrument(skip(self))]
    async fn list_playlist(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<PlaylistPage> {
        let mut url = format!(
            "{}/playlistItems?part=snippet&maxResults={}&playlistId={}",
            self.api_base,
            MAX_PAGE_SIZE,
            urlencoding::encode(playlist_id)
        );
        if let Some(page_token) = cursor {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(&page_token)));
        }

        let response = self
            .send(HttpRequest::new(HttpMethod::Get, url), Replay::Always)
            .await?;
        let list: PlaylistItemListResponse = Self::parse(&response, "playlist items")?;

        let entries: Vec<PlaylistEntry> = list
            .items
            .into_iter()
            .filter(|item| item.snippet.resource_id.kind == VIDEO_KIND)
            .filter_map(|item| {
                item.snippet.resource_id.video_id.map(|video_id| PlaylistEntry {
                    entry_id: item.id,
                    track_id: video_id,
                })
            })
            .collect();

        debug!(count = entries.len(), "Listed playlist items");

        Ok(PlaylistPage {
            entries,
            next_cursor: list.next_page_token,
        })
    }

    #[instrument(skip(self))]
    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let url = format!("{}/playlistItems?part=snippet", self.api_base);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .json(&PlaylistItemInsert::video(playlist_id, track_id))?;

        self.send(request, Replay::RejectedOnly).await?;
        info!("Added video to playlist");
        Ok(())
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.entry_id, video_id = %entry.track_id))]
    async fn remove_from_playlist(&self, playlist_id: &str, entry: &PlaylistEntry) -> Result<()> {
        let url = format!(
            "{}/playlistItems?id={}",
            self.api_base,
            urlencoding::encode(&entry.entry_id)
        );

        match self
            .send(HttpRequest::new(HttpMethod::Delete, url), Replay::Always)
            .await
        {
            Ok(_) => {
                info!(playlist_id, "Removed video from playlist");
                Ok(())
            }
            Err(YouTubeError::ApiError {
                status_code: 404, ..
            }) => {
                debug!(playlist_id, "Playlist item already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    #[derive(Default)]
    struct StaticToken {
        issued: AtomicUsize,
        invalidations: AtomicUsize,
        unavailable: bool,
    }

    #[async_trait]
    impl AccessTokenProvider for StaticToken {
        async fn access_token(&self) -> core_auth::Result<String> {
            if self.unavailable {
                return Err(core_auth::AuthError::CredentialUnavailable {
                    provider: "youtube".to_string(),
                    reason: "refresh failed".to_string(),
                });
            }
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("token-{}", n))
        }

        async fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn connector(mock_http: MockHttpClient, token: Arc<StaticToken>) -> YouTubeConnector {
        YouTubeConnector::new(Arc::new(mock_http), token).with_backoff(Duration::ZERO)
    }

    #[test]
    fn test_parse_track_url() {
        let conn = connector(MockHttpClient::new(), Arc::new(StaticToken::default()));

        assert_eq!(conn.name(), "youtube");
        assert_eq!(
            conn.parse_track_url("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            conn.parse_track_url("https://www.youtube.com/playlist?list=PL1"),
            None
        );
    }

    #[tokio::test]
    async fn test_search_track_success() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Get);
            assert!(req.url.contains("/search?part=snippet&type=video&maxResults=1"));
            assert!(req.url.contains("q=Grace%20Choir"));
            assert_eq!(
                req.headers.get("Authorization").map(String::as_str),
                Some("Bearer token-1")
            );
            Ok(response(
                200,
                r#"{"items":[{"id":{"kind":"youtube#video","videoId":"dQw4w9WgXcQ"}}]}"#,
            ))
        });

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let hit = conn.search_track("Grace Choir").await.unwrap().unwrap();

        assert_eq!(hit.id, "dQw4w9WgXcQ");
        assert_eq!(hit.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_search_track_no_results() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"items":[]}"#)));

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        assert!(conn.search_track("Nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_query_skips_request() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(0);

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        assert!(conn.search_track("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_playlist_pages() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("playlistId=PL1"));
            assert!(req.url.contains("maxResults=50"));
            assert!(req.url.contains("pageToken=CAUQAA"));
            Ok(response(
                200,
                r#"{
                    "items": [
                        {"id": "row-1", "snippet": {"resourceId": {"kind": "youtube#video", "videoId": "aaaaaaaaaaa"}}},
                        {"id": "row-2", "snippet": {"resourceId": {"kind": "youtube#video", "videoId": "bbbbbbbbbbb"}}}
                    ],
                    "nextPageToken": "CAoQAA"
                }"#,
            ))
        });

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let page = conn
            .list_playlist("PL1", Some("CAUQAA".to_string()))
            .await
            .unwrap();

        assert_eq!(
            page.entries,
            vec![
                PlaylistEntry {
                    entry_id: "row-1".to_string(),
                    track_id: "aaaaaaaaaaa".to_string()
                },
                PlaylistEntry {
                    entry_id: "row-2".to_string(),
                    track_id: "bbbbbbbbbbb".to_string()
                },
            ]
        );
        assert_eq!(page.next_cursor.as_deref(), Some("CAoQAA"));
    }

    #[tokio::test]
    async fn test_add_to_playlist_posts_snippet() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert!(req.url.ends_with("/playlistItems?part=snippet"));
            let body: serde_json::Value =
                serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["snippet"]["playlistId"], "PL1");
            assert_eq!(body["snippet"]["resourceId"]["videoId"], "dQw4w9WgXcQ");
            Ok(response(200, r#"{"id":"row-9"}"#))
        });

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        conn.add_to_playlist("PL1", "dQw4w9WgXcQ").await.unwrap();
    }

    #[tokio::test]
    async fn test_add_to_playlist_is_not_resent_after_timeout() {
        let applied = Arc::new(AtomicUsize::new(0));
        let server = applied.clone();
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().returning(move |_| {
            // The insert lands, but the response never arrives.
            server.fetch_add(1, Ordering::SeqCst);
            Err(BridgeError::Timeout("response lost".to_string()))
        });

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let result = conn.add_to_playlist("PL1", "dQw4w9WgXcQ").await;

        assert!(matches!(result, Err(BridgeError::Timeout(_))));
        assert_eq!(applied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_add_to_playlist_server_error_is_not_resent() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(503, "backend error")));

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let result = conn.add_to_playlist("PL1", "dQw4w9WgXcQ").await;

        assert!(matches!(result, Err(BridgeError::OperationFailed(ref m)) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_add_to_playlist_retries_rate_limit() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(429, "")));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, r#"{"id":"row-9"}"#)));

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        conn.add_to_playlist("PL1", "dQw4w9WgXcQ").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_from_playlist_deletes_row() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Delete);
            assert!(req.url.ends_with("/playlistItems?id=row-1"));
            Ok(response(204, ""))
        });

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let entry = PlaylistEntry {
            entry_id: "row-1".to_string(),
            track_id: "dQw4w9WgXcQ".to_string(),
        };
        conn.remove_from_playlist("PL1", &entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(503, "unavailable")));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, r#"{"items":[]}"#)));

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        assert!(conn.search_track("Grace").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(3)
            .returning(|_| Ok(response(500, "boom")));

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let result = conn.search_track("Grace").await;

        assert!(matches!(result, Err(BridgeError::OperationFailed(ref m)) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_and_retries_once() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(401, r#"{"error":{"message":"Invalid Credentials"}}"#)));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert_eq!(
                    req.headers.get("Authorization").map(String::as_str),
                    Some("Bearer token-2")
                );
                Ok(response(200, r#"{"items":[]}"#))
            });

        let token = Arc::new(StaticToken::default());
        let conn = connector(mock_http, token.clone());
        conn.search_track("Grace").await.unwrap();

        assert_eq!(token.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_unauthorized_fails() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(2)
            .returning(|_| Ok(response(401, "")));

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let result = conn.search_track("Grace").await;

        assert!(matches!(result, Err(BridgeError::OperationFailed(ref m)) if m.contains("Authentication")));
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_not_retried() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                403,
                r#"{"error":{"message":"quota","errors":[{"reason":"quotaExceeded"}]}}"#,
            ))
        });

        let conn = connector(mock_http, Arc::new(StaticToken::default()));
        let result = conn.add_to_playlist("PL1", "dQw4w9WgXcQ").await;

        assert!(matches!(result, Err(BridgeError::OperationFailed(ref m)) if m.contains("quota")));
    }

    #[tokio::test]
    async fn test_credential_failure_surfaces_without_request() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(0);

        let token = Arc::new(StaticToken {
            unavailable: true,
            ..Default::default()
        });
        let conn = connector(mock_http, token);
        let result = conn.list_playlist("PL1", None).await;

        assert!(matches!(result, Err(ref e) if e.is_credential_failure()));
    }
}
