//! YouTube Data API response and request types
//!
//! Only the fields the connector reads are modeled; everything else in the
//! API payloads is ignored by serde.

use serde::{Deserialize, Serialize};

/// search.list response
///
/// See: https://developers.google.com/youtube/v3/docs/search/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
}

/// Search results are polymorphic; only video hits carry `videoId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub kind: String,
    pub video_id: Option<String>,
}

/// playlistItems.list response
///
/// See: https://developers.google.com/youtube/v3/docs/playlistItems/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,

    /// Token for next page
    pub next_page_token: Option<String>,
}

/// playlistItems resource
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    /// Membership row id, needed for deletion
    pub id: String,
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    pub resource_id: ResourceId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// Body of playlistItems.insert
#[derive(Debug, Serialize)]
pub struct PlaylistItemInsert {
    pub snippet: PlaylistItemSnippet,
}

impl PlaylistItemInsert {
    pub fn video(playlist_id: &str, video_id: &str) -> Self {
        Self {
            snippet: PlaylistItemSnippet {
                playlist_id: Some(playlist_id.to_string()),
                resource_id: ResourceId {
                    kind: VIDEO_KIND.to_string(),
                    video_id: Some(video_id.to_string()),
                },
            },
        }
    }
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub reason: String,
}

pub const VIDEO_KIND: &str = "youtube#video";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_body_shape() {
        let body = serde_json::to_value(PlaylistItemInsert::video("PL1", "dQw4w9WgXcQ")).unwrap();

        assert_eq!(body["snippet"]["playlistId"], "PL1");
        assert_eq!(body["snippet"]["resourceId"]["kind"], "youtube#video");
        assert_eq!(body["snippet"]["resourceId"]["videoId"], "dQw4w9WgXcQ");
    }

    #[test]
    fn test_search_result_without_video_id() {
        let json = r#"{"items":[{"id":{"kind":"youtube#channel","channelId":"UC1"}}]}"#;
        let response: SearchListResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.items[0].id.kind, "youtube#channel");
        assert!(response.items[0].id.video_id.is_none());
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"error":{"code":403,"message":"Quota","errors":[{"reason":"quotaExceeded"}]}}"#;
        let response: ApiErrorResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.error.errors[0].reason, "quotaExceeded");
    }
}
