//! Error types for msgflow-llm

use thiserror::Error;

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// No active configuration matches the tenant/provider pair
    #[error("provider not found: tenant {tenant_id}, provider {provider_id}")]
    ProviderNotFound {
        /// Tenant ID
        tenant_id: i64,
        /// Provider ID
        provider_id: i64,
    },

    /// The tenant has no active default provider
    #[error("default provider not found for tenant {0}")]
    DefaultProviderNotFound(i64),

    /// Vendor name matches no known backend
    #[error("provider not supported: {0}")]
    Unsupported(String),

    /// Every configured provider failed (or none is configured)
    #[error("all providers failed")]
    AllProvidersFailed,

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Vendor returned no content
    #[error("empty response")]
    EmptyResponse,

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Configuration/usage/health storage failure
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether this is a configuration error (missing or unsupported provider)
    /// rather than a vendor failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotFound { .. } | Self::DefaultProviderNotFound(_) | Self::Unsupported(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
