//! Spotify Web API response and request types

use serde::{Deserialize, Serialize};

/// GET /search response (track search only)
///
/// See: https://developer.spotify.com/documentation/web-api/reference/search
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Paging<TrackObject>>,
}

#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Track object, reduced to the fields the connector reads.
///
/// `id` is null for local files added to a playlist.
#[derive(Debug, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub uri: Option<String>,
}

/// GET /playlists/{id}/tracks item; `track` is null for removed content
#[derive(Debug, Deserialize)]
pub struct PlaylistTrackObject {
    pub track: Option<TrackObject>,
}

/// Body of POST /playlists/{id}/tracks
#[derive(Debug, Serialize)]
pub struct AddTracksRequest {
    pub uris: Vec<String>,
}

/// Body of DELETE /playlists/{id}/tracks
#[derive(Debug, Serialize)]
pub struct RemoveTracksRequest {
    pub tracks: Vec<TrackUri>,
}

#[derive(Debug, Serialize)]
pub struct TrackUri {
    pub uri: String,
}

/// Spotify regular error envelope
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}
