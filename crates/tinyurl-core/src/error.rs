use thiserror::Error;

/// Result type for repository and registry operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid short code: {0}")]
    InvalidCode(String),
}

/// Failures of a [`UrlRepository`](crate::UrlRepository) or
/// [`DomainRegistry`](crate::DomainRegistry) backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A record with this id is already stored.
    #[error("id already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}
