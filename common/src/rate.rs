//! Stored rates and the update request lifecycle.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::time::{now, Timestamp};
use crate::{CurrencyPair, RatesError, RequestId};

/// Status of a rate update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Request recorded, job not finished yet.
    Submitted,
    /// Rate fetched and stored.
    Ok,
    /// Job ran and failed.
    Failed,
}

impl RequestStatus {
    /// Check if this is a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Ok | RequestStatus::Failed)
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[RequestStatus] {
        match self {
            RequestStatus::Submitted => &[RequestStatus::Ok, RequestStatus::Failed],
            RequestStatus::Ok => &[],
            RequestStatus::Failed => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Submitted => "submitted",
            RequestStatus::Ok => "ok",
            RequestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = RatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(RequestStatus::Submitted),
            "ok" => Ok(RequestStatus::Ok),
            "failed" => Ok(RequestStatus::Failed),
            other => Err(RatesError::Database(format!(
                "unknown request status '{}'",
                other
            ))),
        }
    }
}

/// Latest known rate for a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// The currency pair.
    pub pair: CurrencyPair,
    /// Units of quote currency per one unit of base currency.
    pub value: Decimal,
    /// When the rate was last written.
    pub updated_at: Timestamp,
}

/// A recorded update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Storage-assigned identifier.
    pub id: RequestId,
    /// Pair the update was requested for.
    pub pair: CurrencyPair,
    /// Current status.
    pub status: RequestStatus,
    /// When the request was placed.
    pub created_at: Timestamp,
}

impl UpdateRequest {
    /// Create a freshly submitted request.
    pub fn submitted(id: RequestId, pair: CurrencyPair) -> Self {
        Self {
            id,
            pair,
            status: RequestStatus::Submitted,
            created_at: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(RequestStatus::Submitted.can_transition_to(RequestStatus::Ok));
        assert!(RequestStatus::Submitted.can_transition_to(RequestStatus::Failed));
        assert!(!RequestStatus::Ok.can_transition_to(RequestStatus::Failed));
        assert!(!RequestStatus::Failed.can_transition_to(RequestStatus::Ok));
        assert!(!RequestStatus::Submitted.is_terminal());
        assert!(RequestStatus::Ok.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_storage_round_trip() {
        for status in [RequestStatus::Submitted, RequestStatus::Ok, RequestStatus::Failed] {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
        assert!("done".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
    }

    #[test]
    fn test_new_request_is_submitted() {
        let pair = CurrencyPair::parse("EUR/USD").unwrap();
        let request = UpdateRequest::submitted(RequestId::new(1), pair.clone());
        assert_eq!(request.status, RequestStatus::Submitted);
        assert_eq!(request.pair, pair);
    }
}
