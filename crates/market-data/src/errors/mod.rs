//! Error types for the market data crate.
//!
//! Every variant is classified as either a dependency failure (the provider
//! itself misbehaved and the circuit breaker should count it) or a request
//! failure (the provider answered, the answer just wasn't usable).

use std::time::Duration;

use thiserror::Error;

use crate::registry::DependencyFailure;

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider returned data that failed validation checks.
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The request to the provider did not finish within its deadline.
    #[error("Timeout: {provider} after {elapsed:?}")]
    Timeout { provider: String, elapsed: Duration },

    /// A provider-specific error occurred (transport, server error, bad payload).
    #[error("Provider error: {provider} - {message}")]
    ProviderError { provider: String, message: String },
}

impl MarketDataError {
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

impl DependencyFailure for MarketDataError {
    fn is_dependency_failure(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::ProviderError { .. } => true,
            Self::SymbolNotFound(_) | Self::ValidationFailed { .. } => false,
        }
    }
}
