//! FX engine error types.

use thiserror::Error;

/// Failure of a single provider call.
///
/// Always recoverable: the engine treats every variant as "try the next
/// step" and keeps the reason only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The fetch did not finish within its timeout.
    #[error("Provider timed out")]
    Timeout,

    /// The source does not quote this currency pair.
    #[error("Currency pair not listed by provider")]
    NotListed,

    /// The upstream payload could not be understood.
    #[error("Failed to parse provider response: {0}")]
    ParseFailure(String),

    /// Transport failed (HTTP error, process spawn or exit failure).
    #[error("Provider transport failure: {0}")]
    NetworkFailure(String),
}

impl ProviderError {
    /// Stable reason tag for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            ProviderError::Timeout => "TIMEOUT",
            ProviderError::NotListed => "NOT_LISTED",
            ProviderError::ParseFailure(_) => "PARSE_FAILURE",
            ProviderError::NetworkFailure(_) => "NETWORK_FAILURE",
        }
    }
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Terminal failure of a conversion, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionFailure {
    /// Every resolution step failed.
    #[error("No rate available")]
    NoRateAvailable,

    /// The request was rejected before any provider call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ConversionFailure {
    /// Message safe to show to an end user. Never carries provider details.
    pub fn user_message(&self) -> &'static str {
        match self {
            ConversionFailure::NoRateAvailable => "Rate unavailable, please try again later.",
            ConversionFailure::InvalidRequest(_) => "Invalid conversion request.",
        }
    }
}

/// Engine configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("At least one bridge currency is required")]
    NoBridges,

    #[error("provider_timeout must be shorter than fetch_timeout")]
    ProviderTimeoutTooLong,

    #[error("Bridge currency cannot be {0}")]
    InvalidBridge(String),

    #[error("Supported currency list is empty")]
    NoSupportedCurrencies,

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}
