//! Ratekeeper Common Types
//!
//! Shared types used across the ratekeeper workspace: currency codes and
//! pairs, update request identifiers and statuses, stored rates, and the
//! common error type.

pub mod currency;
pub mod identifiers;
pub mod rate;
pub mod error;
pub mod time;

pub use currency::*;
pub use identifiers::*;
pub use rate::*;
pub use error::*;
pub use time::*;
