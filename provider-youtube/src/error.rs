//! Error types for the YouTube provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// YouTube provider errors
#[derive(Error, Debug)]
pub enum YouTubeError {
    /// The API kept rejecting the access token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("YouTube API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Daily quota or rate limit exhausted
    #[error("YouTube quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for YouTube operations
pub type Result<T> = std::result::Result<T, YouTubeError>;

impl From<YouTubeError> for BridgeError {
    fn from(error: YouTubeError) -> Self {
        match error {
            YouTubeError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
