use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure came from acquiring an access credential rather
    /// than from the provider call itself.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, BridgeError::CredentialUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
