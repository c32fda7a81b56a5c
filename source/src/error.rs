//! Rate source error types.

use ratekeeper_common::{CurrencyPair, RatesError};
use thiserror::Error;

/// Errors returned by rate sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source answered with a non-success status.
    #[error("HTTP error {status} for {pair}")]
    Http { status: u16, pair: CurrencyPair },

    /// Source could not be reached.
    #[error("Request error for {pair}: {message}")]
    Network { pair: CurrencyPair, message: String },

    /// Response body could not be decoded.
    #[error("Failed to decode response for {pair}: {message}")]
    Decode { pair: CurrencyPair, message: String },

    /// Response did not list the quote currency.
    #[error("Rate for {0} not found in response")]
    RateMissing(CurrencyPair),

    /// Source refused the pair for another reason.
    #[error("Rate source unavailable: {0}")]
    Unavailable(String),
}

impl From<SourceError> for RatesError {
    fn from(err: SourceError) -> Self {
        RatesError::Source(err.to_string())
    }
}

/// Result type for rate source operations.
pub type SourceResult<T> = Result<T, SourceError>;
