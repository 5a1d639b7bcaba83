//! `TransferRequest`: the serializable state of one in-flight inter-venue move.

use arb_common::{Px, Qty};
use serde::{Deserialize, Serialize};

/// One asset movement between two venues, from submission through
/// completion or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Asset being moved (base or quote of the traded symbol).
    pub asset: String,
    /// Venue the withdrawal was submitted from.
    pub source_venue: String,
    /// Venue the asset is being moved to.
    pub dest_venue: String,
    /// Quantity in flight.
    pub qty: Qty,
    /// Price the moved quantity was acquired at, carried across the transfer
    /// gap so the receiving leg's PnL tracking stays continuous.
    pub buy_price: Px,
    /// Still being processed by the venue or destination network.
    pub in_progress: bool,
    /// Funds have landed and the receiving leg can resume trading.
    pub completed: bool,
    /// Venue-assigned withdrawal id, used to poll status.
    pub transfer_id: String,
}

impl TransferRequest {
    /// `true` iff this asset is the traded symbol's base asset, i.e. the
    /// source→dest leg of a cycle rather than the dest→source leg.
    #[must_use]
    pub fn is_base_asset(&self, base: &str) -> bool {
        self.asset == base
    }
}
