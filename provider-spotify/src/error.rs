//! Error types for the Spotify provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Spotify provider errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// The API kept rejecting the access token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Spotify API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Spotify operations
pub type Result<T> = std::result::Result<T, SpotifyError>;

impl From<SpotifyError> for BridgeError {
    fn from(error: SpotifyError) -> Self {
        match error {
            SpotifyError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SpotifyError::RateLimitExceeded {
            retry_after_seconds: 3,
        };
        assert_eq!(error.to_string(), "Rate limit exceeded, retry after 3 seconds");
    }

    #[test]
    fn test_error_conversion() {
        let bridge_error: BridgeError = SpotifyError::ApiError {
            status_code: 403,
            message: "Insufficient client scope".to_string(),
        }
        .into();

        assert!(matches!(
            bridge_error,
            BridgeError::OperationFailed(ref m) if m.contains("status 403")
        ));
    }
}
