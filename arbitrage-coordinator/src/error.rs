//! Coordinator-level error taxonomy. Only construction-time failures
//! propagate; once a coordinator is running, per-cycle failures are logged
//! and held for the next cycle rather than surfaced as `Err`.

use position_manager::PositionManagerError;
use thiserror::Error;

/// Failure starting an [`crate::ArbitrageCoordinator`].
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The source leg failed to initialize.
    #[error("source leg initialization failed: {0}")]
    SourceInit(#[source] PositionManagerError),
    /// The dest leg failed to initialize.
    #[error("dest leg initialization failed: {0}")]
    DestInit(#[source] PositionManagerError),
    /// The hedge leg failed to initialize.
    #[error("hedge leg initialization failed: {0}")]
    HedgeInit(#[source] PositionManagerError),
    /// A persisted snapshot failed to encode or decode as `bincode`.
    #[error("context snapshot codec failure: {0}")]
    SnapshotCodec(#[source] bincode::Error),
}
