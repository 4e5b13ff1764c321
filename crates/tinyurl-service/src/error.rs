use jiff::Timestamp;
use thiserror::Error;
use tinyurl_core::{CodecError, StorageError};

pub type Result<T> = std::result::Result<T, UrlServiceError>;

#[derive(Debug, Clone, Error)]
pub enum UrlServiceError {
    #[error("domain is not registered: {0}")]
    DomainNotFound(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid expire date '{input}': {reason}")]
    InvalidExpireDate { input: String, reason: String },
    #[error("invalid short code: {0}")]
    InvalidCode(String),
    #[error("no record for short code: {0}")]
    RecordNotFound(String),
    #[error("short code {code} expired at {expire_time}")]
    RecordExpired { code: String, expire_time: Timestamp },
    #[error("id generation failed: {0}")]
    IdGeneration(#[from] tinyurl_snowflake::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CodecError> for UrlServiceError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::InvalidCode(message) => Self::InvalidCode(message),
        }
    }
}
