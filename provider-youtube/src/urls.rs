//! YouTube link recognition.
//!
//! Accepts the link shapes users paste from the web player, the mobile site,
//! YouTube Music, share sheets and the `vnd.youtube:` app scheme. A missing
//! `https://` prefix is tolerated.

use url::Url;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const APP_SCHEME: &str = "vnd.youtube:";
const VIDEO_ID_LEN: usize = 11;

const WEB_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];
const SHORT_HOST: &str = "youtu.be";

/// A recognized YouTube resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YouTubeLink {
    Video(String),
    Playlist(String),
    Channel(String),
}

impl YouTubeLink {
    pub fn video_id(&self) -> Option<&str> {
        match self {
            YouTubeLink::Video(id) => Some(id),
            _ => None,
        }
    }
}

/// Classify a user-supplied link.
///
/// # Examples
///
/// ```
/// use provider_youtube::{parse_link, YouTubeLink};
///
/// assert_eq!(
///     parse_link("https://youtu.be/dQw4w9WgXcQ"),
///     Some(YouTubeLink::Video("dQw4w9WgXcQ".to_string()))
/// );
/// assert_eq!(parse_link("https://example.com/watch?v=dQw4w9WgXcQ"), None);
/// ```
pub fn parse_link(input: &str) -> Option<YouTubeLink> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(rest) = input.strip_prefix(APP_SCHEME) {
        let id = rest.trim_start_matches('/');
        let id = id.split(['?', '/', '#']).next().unwrap_or_default();
        return valid_video_id(id).map(YouTubeLink::Video);
    }

    let url = parse_web_url(input)?;
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    if host == SHORT_HOST {
        return segments
            .next()
            .and_then(valid_video_id)
            .map(YouTubeLink::Video);
    }

    if !WEB_HOSTS.contains(&host.as_str()) {
        return None;
    }

    match segments.next()? {
        "watch" => query_param(&url, "v")
            .as_deref()
            .and_then(valid_video_id)
            .map(YouTubeLink::Video),
        "shorts" | "embed" | "live" | "v" => segments
            .next()
            .and_then(valid_video_id)
            .map(YouTubeLink::Video),
        "playlist" => query_param(&url, "list")
            .filter(|id| !id.is_empty())
            .map(YouTubeLink::Playlist),
        "channel" => segments
            .next()
            .filter(|id| !id.is_empty())
            .map(|id| YouTubeLink::Channel(id.to_string())),
        _ => None,
    }
}

/// Video id of a link, `None` for non-video links.
pub fn parse_video_id(input: &str) -> Option<String> {
    match parse_link(input)? {
        YouTubeLink::Video(id) => Some(id),
        _ => None,
    }
}

pub fn canonical_video_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL, video_id)
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

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn valid_video_id(id: &str) -> Option<String> {
    let well_formed = id.len() == VIDEO_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    well_formed.then(|| id.to_string())
}
