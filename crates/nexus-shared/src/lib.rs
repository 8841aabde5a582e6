//! # NexusChain Shared
//!
//! Shared utilities, types, and telemetry for the NexusChain backend.

pub mod constants;
pub mod types;
pub mod utils;
pub mod telemetry;
pub mod config;

pub use config::AppConfig;
pub use types::*;
