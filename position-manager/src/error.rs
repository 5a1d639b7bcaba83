//! Errors that can abort a `PositionManager`'s construction.
//!
//! Per-cycle failures (sync, placement, cancellation) are caught and logged
//! inside the manager itself and never surface here — only construction-time
//! failures propagate, matching the rest of the engine's error design.

use thiserror::Error;

use arb_common::ExchangeError;

/// Failures that can occur while bringing a `PositionManager` up.
#[derive(Debug, Error)]
pub enum PositionManagerError {
    /// Loading tick size / minimum order sizes failed.
    #[error("failed to load symbol info for {symbol} on {venue}: {source}")]
    SymbolInfoUnavailable {
        /// Venue the leg trades on.
        venue: String,
        /// Symbol requested.
        symbol: String,
        /// Underlying exchange error.
        #[source]
        source: ExchangeError,
    },

    /// Loading maker/taker fee rates failed.
    #[error("failed to load fees for {symbol} on {venue}: {source}")]
    FeesUnavailable {
        /// Venue the leg trades on.
        venue: String,
        /// Symbol requested.
        symbol: String,
        /// Underlying exchange error.
        #[source]
        source: ExchangeError,
    },

    /// Seeding the initial position/balance failed.
    #[error("failed to load initial position on {venue}: {source}")]
    InitialPositionUnavailable {
        /// Venue the leg trades on.
        venue: String,
        /// Underlying exchange error.
        #[source]
        source: ExchangeError,
    },
}
