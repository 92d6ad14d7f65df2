//! Error types for market data providers

use thiserror::Error;

/// Provider-side failures
///
/// These never fail an execution: the engine downgrades them to log lines
/// and neutral defaults. They surface directly only to callers using the
/// gateway outside the pipeline.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Network or HTTP error
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("yahoo finance error: {0}")]
    YahooFinance(String),

    /// Overview data service error
    #[error("overview service error: {0}")]
    Overview(String),

    /// Rate limit exceeded for a provider
    #[error("rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Provider misconfiguration (missing endpoint or credentials)
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, MarketError>;

impl From<MarketError> for tickflow_core::Error {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::ConfigError(msg) => tickflow_core::Error::InvalidArgument(msg),
            other => tickflow_core::Error::UpstreamDegraded(other.to_string()),
        }
    }
}
