//! Shared types, configuration, and error taxonomy used across the
//! arbitrage engine's crates.

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
