//! Error types for msgflow-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis queue failure
    #[error("queue error: {0}")]
    Queue(#[from] redis::RedisError),

    /// Secret encryption or decryption failure
    #[error("crypto error: {0}")]
    Crypto(#[from] msgflow_crypto::CryptoError),

    /// LLM layer failure
    #[error("llm error: {0}")]
    Llm(#[from] msgflow_llm::Error),

    /// JSON encoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected input
    #[error("invalid input: {0}")]
    Validation(String),

    /// Missing record
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether the caller sent something the store refused
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for msgflow_llm::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Llm(inner) => inner,
            other => msgflow_llm::Error::Store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::Validation("api_key is required".to_string()).is_client_error());
        assert!(Error::NotFound("provider 4".to_string()).is_client_error());
        assert!(!Error::Configuration("master key".to_string()).is_client_error());
    }

    #[test]
    fn test_conversion_into_llm_error() {
        let err: msgflow_llm::Error = Error::NotFound("provider 4".to_string()).into();
        assert!(matches!(err, msgflow_llm::Error::Store(ref m) if m.contains("provider 4")));

        let err: msgflow_llm::Error = Error::Llm(msgflow_llm::Error::RateLimit).into();
        assert!(matches!(err, msgflow_llm::Error::RateLimit));
    }

    #[test]
    fn test_display() {
        let err = Error::Crypto(msgflow_crypto::CryptoError::KeyTooShort);
        assert!(err.to_string().starts_with("crypto error"));
    }
}
