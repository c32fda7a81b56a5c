//! Error types for ratekeeper.

use crate::{CurrencyPair, RequestId};
use thiserror::Error;

/// Main error type for ratekeeper operations.
#[derive(Error, Debug)]
pub enum RatesError {
    /// Malformed currency code or pair.
    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),

    /// No rate stored for the pair.
    #[error("No rate stored for {0}")]
    PairNotFound(CurrencyPair),

    /// No update request with this id.
    #[error("No update request with id {0}")]
    RequestNotFound(RequestId),

    /// Storage connection or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// External rate source failure.
    #[error("Rate source error: {0}")]
    Source(String),

    /// The job queue no longer accepts work.
    #[error("Job queue is closed")]
    QueueClosed,

    /// A job aborted abnormally and was contained by the worker.
    #[error("Job for request {request_id} panicked: {message}")]
    JobPanicked {
        request_id: RequestId,
        message: String,
    },

    /// A job was cancelled before it finished, e.g. by runtime shutdown.
    #[error("Job for request {0} was cancelled")]
    JobCancelled(RequestId),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RatesError {
    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            RatesError::InvalidPair(_) => "INVALID_PAIR",
            RatesError::PairNotFound(_) => "PAIR_NOT_FOUND",
            RatesError::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            RatesError::Database(_) => "DATABASE_ERROR",
            RatesError::Source(_) => "SOURCE_ERROR",
            RatesError::QueueClosed => "QUEUE_CLOSED",
            RatesError::JobPanicked { .. } => "JOB_PANICKED",
            RatesError::JobCancelled(_) => "JOB_CANCELLED",
            RatesError::Configuration(_) => "CONFIGURATION_ERROR",
            RatesError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if the error means "nothing stored under that key".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RatesError::PairNotFound(_) | RatesError::RequestNotFound(_)
        )
    }
}

/// Result type alias for ratekeeper operations.
pub type Result<T> = std::result::Result<T, RatesError>;
