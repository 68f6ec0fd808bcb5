use thiserror::Error;

use crate::psp::ProviderError;
use crate::store::StoreError;

/// Errors surfaced by the sync engine and refund reconciler.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("payment provider protocol error: {0}")]
    ProviderProtocol(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("tenant settings unavailable: {0}")]
    Settings(String),
}

impl From<ProviderError> for SyncError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(message) => SyncError::ProviderUnavailable(message),
            ref api @ ProviderError::Api { .. } if api.is_server_error() => {
                SyncError::ProviderUnavailable(api.to_string())
            }
            other => SyncError::ProviderProtocol(other.to_string()),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
