use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

impl CoreError {
    /// The sync error behind this failure, if any.
    pub fn as_sync_error(&self) -> Option<&core_sync::SyncError> {
        match self {
            CoreError::Sync(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
