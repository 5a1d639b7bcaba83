//! Shared error taxonomy for exchange interactions.
//!
//! These variants correspond 1:1 to the error kinds the engine is designed
//! around: transient failures are retried via a fetch to ground truth,
//! `InsufficientBalance` snaps a leg to fulfilled, and so on. See each
//! crate's own error type for errors specific to that component.

use thiserror::Error;

/// Errors an exchange capability can report back to a caller.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The venue rejected the order for lack of available balance.
    #[error("insufficient balance on {venue} for {symbol}: {reason}")]
    InsufficientBalance {
        /// Venue the order was placed on.
        venue: String,
        /// Symbol the order targeted.
        symbol: String,
        /// Venue-reported reason string.
        reason: String,
    },

    /// A lookup by order id found nothing on the venue.
    #[error("order {order_id} not found on {venue}")]
    OrderNotFound {
        /// Venue queried.
        venue: String,
        /// Order id that was not found.
        order_id: String,
    },

    /// The request timed out before the venue responded.
    #[error("timeout calling {venue}: {operation}")]
    Timeout {
        /// Venue called.
        venue: String,
        /// Operation attempted, for logging.
        operation: String,
    },

    /// Any other transport or venue-side failure.
    #[error("exchange call failed on {venue}: {source}")]
    Transport {
        /// Venue called.
        venue: String,
        /// Underlying error.
        #[source]
        source: anyhow::Error,
    },
}

/// Result alias for exchange capability calls.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
