//! Ratekeeper Server
//!
//! HTTP surface over the rate update pipeline.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

pub use config::ServerConfig;
pub use state::{build_state, AppState};
