//! Asset-transfer state machine: submits and polls inter-venue withdrawals.
//!
//! Ownership is split deliberately: this crate submits and polls, but never
//! decides what a completed transfer means for a leg's role or position —
//! that decision reads the traded symbol and both legs' state, which belongs
//! to the coordinator.

pub mod error;
pub mod manager;
pub mod request;

pub use error::TransferManagerError;
pub use manager::{TransferManager, TRANSFER_REFRESH_INTERVAL};
pub use request::TransferRequest;
