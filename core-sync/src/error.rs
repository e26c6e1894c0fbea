use bridge_traits::error::BridgeError;
use core_auth::ProviderKind;
use serde::Serialize;
use thiserror::Error;

/// Failures of a catalog sync run.
///
/// Provider variants are recorded per provider and never abort the run.
/// The remaining variants are fatal and returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncError {
    #[error("{provider} credential unavailable: {reason}")]
    CredentialUnavailable {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider} track resolution failed: {reason}")]
    ResolutionFailed {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider} playlist query failed: {reason}")]
    MembershipQueryFailed {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider} playlist update failed: {reason}")]
    MembershipMutateFailed {
        provider: ProviderKind,
        reason: String,
    },

    #[error("Catalog persistence failed: {0}")]
    CatalogPersistenceFailed(String),

    #[error("Song {id} not found")]
    SongNotFound { id: i64 },

    #[error("Invalid song: {0}")]
    InvalidSong(String),
}

/// Which provider call failed, used to classify a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOperation {
    Search,
    Query,
    Mutate,
}

impl SyncError {
    /// Classify a provider failure. Credential failures win over the
    /// operation kind; timeouts count as failures of the operation.
    pub fn from_provider(
        provider: ProviderKind,
        operation: ProviderOperation,
        error: &BridgeError,
    ) -> Self {
        let reason = error.to_string();
        if error.is_credential_failure() {
            return SyncError::CredentialUnavailable { provider, reason };
        }
        Self::for_operation(provider, operation, reason)
    }

    pub fn for_operation(
        provider: ProviderKind,
        operation: ProviderOperation,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        match operation {
            ProviderOperation::Search => SyncError::ResolutionFailed { provider, reason },
            ProviderOperation::Query => SyncError::MembershipQueryFailed { provider, reason },
            ProviderOperation::Mutate => SyncError::MembershipMutateFailed { provider, reason },
        }
    }

    /// Fatal errors abort the whole operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::CatalogPersistenceFailed(_)
                | SyncError::SongNotFound { .. }
                | SyncError::InvalidSong(_)
        )
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            SyncError::CredentialUnavailable { provider, .. }
            | SyncError::ResolutionFailed { provider, .. }
            | SyncError::MembershipQueryFailed { provider, .. }
            | SyncError::MembershipMutateFailed { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Result of one step of a sync run.
pub type Outcome<T> = Result<T>;
