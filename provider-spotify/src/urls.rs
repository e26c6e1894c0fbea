//! Spotify link recognition.
//!
//! Handles `open.spotify.com` share links (with or without an `intl-xx`
//! locale segment or an `embed` prefix) and `spotify:{kind}:{id}` URIs.

use url::Url;

const OPEN_HOSTS: &[&str] = &["open.spotify.com", "play.spotify.com"];
const ID_LEN: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyKind {
    Track,
    Album,
    Artist,
    Playlist,
    Episode,
}

impl SpotifyKind {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "track" => Some(SpotifyKind::Track),
            "album" => Some(SpotifyKind::Album),
            "artist" => Some(SpotifyKind::Artist),
            "playlist" => Some(SpotifyKind::Playlist),
            "episode" => Some(SpotifyKind::Episode),
            _ => None,
        }
    }
}

/// A recognized Spotify resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyLink {
    pub kind: SpotifyKind,
    pub id: String,
}

/// Classify a user-supplied link or URI.
///
/// # Examples
///
/// ```
/// use provider_spotify::{parse_link, SpotifyKind};
///
/// let link = parse_link("spotify:album:1DFixLWuPkv3KT3TnV35m3").unwrap();
/// assert_eq!(link.kind, SpotifyKind::Album);
/// ```
pub fn parse_link(input: &str) -> Option<SpotifyLink> {
    let input = input.trim();

    if let Some(rest) = input.strip_prefix("spotify:") {
        let mut parts = rest.split(':');
        let kind = SpotifyKind::parse(parts.next()?)?;
        let id = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        return link(kind, id);
    }

    let url = parse_web_url(input)?;
    let host = url.host_str()?.to_ascii_lowercase();
    if !OPEN_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let mut segments = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .skip_while(|s| s.starts_with("intl-") || *s == "embed");

    let kind = SpotifyKind::parse(segments.next()?)?;
    let id = segments.next()?;
    link(kind, id)
}

/// Track id of a link, `None` for other kinds.
pub fn parse_track_id(input: &str) -> Option<String> {
    parse_link(input)
        .filter(|link| link.kind == SpotifyKind::Track)
        .map(|link| link.id)
}

pub fn canonical_track_url(track_id: &str) -> String {
    format!("https://open.spotify.com/track/{}", track_id)
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

fn link(kind: SpotifyKind, id: &str) -> Option<SpotifyLink> {
    let well_formed = id.len() == ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric());
    well_formed.then(|| SpotifyLink {
        kind,
        id: id.to_string(),
    })
}

fn parse_web_url(input: &str) -> Option<Url> {
    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", input)).ok()?
        }
        Err(_) => return None,
    };

    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}
