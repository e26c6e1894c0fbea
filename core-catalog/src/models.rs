//! Catalog entities and write models.

use core_auth::ProviderKind;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A song in the catalog.
///
/// Each provider has one binding pair (`*_url`, `*_id`). The id is the
/// provider-native track identifier as of the last successful sync; the
/// url is the link shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: Option<String>,
    pub youtube_url: Option<String>,
    pub youtube_id: Option<String>,
    pub spotify_url: Option<String>,
    pub spotify_id: Option<String>,
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds
    pub updated_at: i64,
}

impl Song {
    /// The stored binding for one provider.
    pub fn binding(&self, provider: ProviderKind) -> ExternalBinding {
        match provider {
            ProviderKind::YouTube => ExternalBinding {
                url: self.youtube_url.clone(),
                id: self.youtube_id.clone(),
            },
            ProviderKind::Spotify => ExternalBinding {
                url: self.spotify_url.clone(),
                id: self.spotify_id.clone(),
            },
        }
    }

    pub fn set_binding(&mut self, provider: ProviderKind, binding: ExternalBinding) {
        match provider {
            ProviderKind::YouTube => {
                self.youtube_url = binding.url;
                self.youtube_id = binding.id;
            }
            ProviderKind::Spotify => {
                self.spotify_url = binding.url;
                self.spotify_id = binding.id;
            }
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_title(&self.title)
    }
}

fn validate_title(title: &str) -> std::result::Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title cannot be empty".to_string());
    }
    Ok(())
}

/// Per-provider view of a song's external link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalBinding {
    pub url: Option<String>,
    pub id: Option<String>,
}

impl ExternalBinding {
    pub fn new(url: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            id: Some(id.into()),
        }
    }

    /// A link the provider could not be matched against.
    pub fn unresolved(url: Option<String>) -> Self {
        Self { url, id: None }
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.id.is_none()
    }
}

/// Request to add a song.
///
/// The url fields carry what the caller typed. Track ids are filled in by
/// the sync engine before the row is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: Option<String>,
    pub youtube_url: Option<String>,
    pub youtube_id: Option<String>,
    pub spotify_url: Option<String>,
    pub spotify_id: Option<String>,
}

impl NewSong {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_url(mut self, provider: ProviderKind, url: impl Into<String>) -> Self {
        match provider {
            ProviderKind::YouTube => self.youtube_url = Some(url.into()),
            ProviderKind::Spotify => self.spotify_url = Some(url.into()),
        }
        self
    }

    /// The url the caller supplied for a provider.
    pub fn url(&self, provider: ProviderKind) -> Option<&str> {
        match provider {
            ProviderKind::YouTube => self.youtube_url.as_deref(),
            ProviderKind::Spotify => self.spotify_url.as_deref(),
        }
    }

    pub fn with_binding(mut self, provider: ProviderKind, binding: ExternalBinding) -> Self {
        self.set_binding(provider, binding);
        self
    }

    pub fn set_binding(&mut self, provider: ProviderKind, binding: ExternalBinding) {
        match provider {
            ProviderKind::YouTube => {
                self.youtube_url = binding.url;
                self.youtube_id = binding.id;
            }
            ProviderKind::Spotify => {
                self.spotify_url = binding.url;
                self.spotify_id = binding.id;
            }
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_title(&self.title)
    }
}

/// Partial update of a song.
///
/// `None` leaves a field as stored. For optional columns `Some(None)`
/// clears the value. A url field set to `Some(_)` is an explicit edit of
/// that provider's link; the matching id field is owned by the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongUpdate {
    pub title: Option<String>,
    pub artist: Option<Option<String>>,
    pub youtube_url: Option<Option<String>>,
    pub youtube_id: Option<Option<String>>,
    pub spotify_url: Option<Option<String>>,
    pub spotify_id: Option<Option<String>>,
}

impl SongUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: Option<String>) -> Self {
        self.artist = Some(artist);
        self
    }

    /// Set (`Some`) or clear (`None`) a provider link.
    pub fn with_url(mut self, provider: ProviderKind, url: Option<String>) -> Self {
        match provider {
            ProviderKind::YouTube => self.youtube_url = Some(url),
            ProviderKind::Spotify => self.spotify_url = Some(url),
        }
        self
    }

    /// How the caller touched a provider link: `None` untouched,
    /// `Some(None)` cleared, `Some(Some(url))` set.
    pub fn url_change(&self, provider: ProviderKind) -> Option<Option<&str>> {
        let field = match provider {
            ProviderKind::YouTube => &self.youtube_url,
            ProviderKind::Spotify => &self.spotify_url,
        };
        field.as_ref().map(|url| url.as_deref())
    }

    /// Overwrite both halves of a provider binding.
    pub fn with_binding(mut self, provider: ProviderKind, binding: ExternalBinding) -> Self {
        self.set_binding(provider, binding);
        self
    }

    pub fn set_binding(&mut self, provider: ProviderKind, binding: ExternalBinding) {
        match provider {
            ProviderKind::YouTube => {
                self.youtube_url = Some(binding.url);
                self.youtube_id = Some(binding.id);
            }
            ProviderKind::Spotify => {
                self.spotify_url = Some(binding.url);
                self.spotify_id = Some(binding.id);
            }
        }
    }

    /// Leave a provider binding exactly as stored.
    pub fn keep_binding(&mut self, provider: ProviderKind) {
        match provider {
            ProviderKind::YouTube => {
                self.youtube_url = None;
                self.youtube_id = None;
            }
            ProviderKind::Spotify => {
                self.spotify_url = None;
                self.spotify_id = None;
            }
        }
    }

    /// Apply every set field to `song`. Timestamps are left to the repository.
    pub fn apply_to(&self, song: &mut Song) {
        if let Some(title) = &self.title {
            song.title = title.clone();
        }
        if let Some(artist) = &self.artist {
            song.artist = artist.clone();
        }
        if let Some(url) = &self.youtube_url {
            song.youtube_url = url.clone();
        }
        if let Some(id) = &self.youtube_id {
            song.youtube_id = id.clone();
        }
        if let Some(url) = &self.spotify_url {
            song.spotify_url = url.clone();
        }
        if let Some(id) = &self.spotify_id {
            song.spotify_id = id.clone();
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}
