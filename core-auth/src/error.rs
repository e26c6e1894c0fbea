use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Provider {provider} credential unavailable: {reason}")]
    CredentialUnavailable { provider: String, reason: String },

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Authentication error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl From<AuthError> for BridgeError {
    fn from(error: AuthError) -> Self {
        BridgeError::CredentialUnavailable(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_maps_to_bridge_credential_failure() {
        let error = AuthError::CredentialUnavailable {
            provider: "spotify".to_string(),
            reason: "Token endpoint returned 400".to_string(),
        };

        let bridge: BridgeError = error.into();
        assert!(bridge.is_credential_failure());
        assert!(bridge.to_string().contains("spotify"));
    }
}
