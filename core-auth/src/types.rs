use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported external media providers.
///
/// # Examples
///
/// ```
/// use core_auth::ProviderKind;
///
/// let provider = ProviderKind::YouTube;
/// assert_eq!(provider.display_name(), "YouTube");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// YouTube Data API v3
    #[serde(rename = "youtube")]
    YouTube,
    /// Spotify Web API
    #[serde(rename = "spotify")]
    Spotify,
}

impl ProviderKind {
    /// Every provider, in sync order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::YouTube, ProviderKind::Spotify];

    /// Get the human-readable display name for this provider
    ///
    /// # Examples
    ///
    /// ```
    /// use core_auth::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::YouTube.display_name(), "YouTube");
    /// assert_eq!(ProviderKind::Spotify.display_name(), "Spotify");
    /// ```
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::YouTube => "YouTube",
            ProviderKind::Spotify => "Spotify",
        }
    }

    /// Get the provider identifier string
    ///
    /// Used for logging and configuration purposes.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_auth::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::YouTube.as_str(), "youtube");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::YouTube => "youtube",
            ProviderKind::Spotify => "spotify",
        }
    }

    /// Parse a provider kind from a string identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use core_auth::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::parse("YouTube"), Some(ProviderKind::YouTube));
    /// assert_eq!(ProviderKind::parse("deezer"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "youtube" => Some(ProviderKind::YouTube),
            "spotify" => Some(ProviderKind::Spotify),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Short-lived bearer credential.
///
/// # Security
///
/// The `Debug` implementation redacts the token value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer value sent in the `Authorization` header
    pub token: String,
    /// When the provider stops accepting the token (UTC)
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Build a token from a token-endpoint `expires_in` value.
    ///
    /// Returns `None` when the lifetime is not positive or overflows the
    /// calendar.
    pub fn issued_at(
        token: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_in: i64,
    ) -> Option<Self> {
        if expires_in <= 0 {
            return None;
        }
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))?;
        Some(Self::new(token, expires_at))
    }

    /// A token is usable only while `now < expires_at - margin`.
    pub fn is_usable_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .is_some_and(|deadline| now < deadline)
    }

    /// Get the time remaining until expiration
    ///
    /// Returns `None` if the token is already expired.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        if now >= self.expires_at {
            None
        } else {
            Some(self.expires_at - now)
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Process-wide credential state for one provider.
///
/// Starts empty, is filled by the first refresh and replaced in place by
/// later ones. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ProviderSession {
    pub access_token: Option<AccessToken>,
    /// When the current token was obtained
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Successful refreshes since process start
    pub refresh_count: u64,
}

impl ProviderSession {
    /// The cached bearer value, if it is still usable.
    pub fn usable_token(&self, now: DateTime<Utc>, margin: Duration) -> Option<&str> {
        self.access_token
            .as_ref()
            .filter(|token| token.is_usable_at(now, margin))
            .map(|token| token.token.as_str())
    }

    /// Install a freshly issued token.
    pub fn store(&mut self, token: AccessToken, now: DateTime<Utc>) {
        self.access_token = Some(token);
        self.refreshed_at = Some(now);
        self.refresh_count += 1;
    }

    /// Forget the cached token so the next caller refreshes.
    pub fn clear(&mut self) {
        self.access_token = None;
    }
}
