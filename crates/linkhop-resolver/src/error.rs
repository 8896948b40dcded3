use linkhop_core::StorageError;
use linkhop_generator::RandomSourceError;
use thiserror::Error;

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolutionError>;

#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("short code already in use: {0}")]
    CodeAlreadyInUse(String),
    #[error("no free short code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    #[error("short code not found: {0}")]
    CodeNotFound(String),
    #[error("link has expired: {0}")]
    LinkExpired(String),
    #[error("url store unavailable: {0}")]
    StoreUnavailable(StorageError),
    #[error("could not verify short code availability: {0}")]
    AllocationCheckFailed(String),
    #[error("random source failed: {0}")]
    RandomSource(#[from] RandomSourceError),
    #[error("short code already exists: {0}")]
    DuplicateKey(String),
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
}

impl From<StorageError> for ResolutionError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::DuplicateKey(code) => Self::DuplicateKey(code),
            other => Self::StoreUnavailable(other),
        }
    }
}
