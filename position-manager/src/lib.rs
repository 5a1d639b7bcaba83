//! Per-exchange position reconciliation: the state machine that binds one
//! leg's `PositionData` to one exchange handle.

pub mod error;
pub mod manager;
pub mod pnl;
pub mod position_data;

pub use error::PositionManagerError;
pub use manager::{OnOrderFilledCallback, PositionManager, SaveCallback};
pub use pnl::PnlTracker;
pub use position_data::{FilledAmount, PositionChange, PositionData};
