//! Ratekeeper Storage
//!
//! Persistence for exchange rates and the update requests that refresh them.
//! Postgres backs production; the in-memory store serves tests and offline runs.

pub mod connect;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;

pub use connect::{connect_with_retry, ConnectOptions};
pub use memory::{MemoryRateStore, StoreOp};
pub use postgres::PgRateStore;
pub use store::{RateStore, SharedRateStore};
