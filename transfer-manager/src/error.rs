//! Errors a `TransferManager` can report back to its caller.

use thiserror::Error;

use arb_common::ExchangeError;

/// Failures that can occur while submitting a transfer. Polling failures are
/// not modeled here — `update_transfer_request` logs and retries on its own
/// schedule rather than propagating, since a single failed poll must not tear
/// down the monitoring loop.
#[derive(Debug, Error)]
pub enum TransferManagerError {
    /// The source venue rejected the withdrawal submission.
    #[error("failed to submit withdrawal of {asset} from {venue}: {source}")]
    SubmissionFailed {
        /// Venue the withdrawal was submitted to.
        venue: String,
        /// Asset being withdrawn.
        asset: String,
        /// Underlying exchange error.
        #[source]
        source: ExchangeError,
    },
}
