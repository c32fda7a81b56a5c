//! Ratekeeper rate sources
//!
//! The external side of a rate update: given a currency pair, produce the
//! current rate or fail.
//!
//! # Sources
//!
//! - [`FrankfurterSource`]: HTTP client for the Frankfurter API
//! - [`FakeRateSource`]: offline source cycling through canned rates
//! - `MockRateSource`: scriptable source for tests (`test-utils` feature)

pub mod error;
pub mod fake;
pub mod frankfurter;
pub mod provider;

pub use error::{SourceError, SourceResult};
pub use fake::FakeRateSource;
pub use frankfurter::{FrankfurterConfig, FrankfurterSource, DEFAULT_BASE_URL};
pub use provider::{RateSource, SharedRateSource};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateSource;
