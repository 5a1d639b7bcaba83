//! `ArbitrageContext`: the serializable snapshot persisted through the save callback.

use std::collections::HashMap;

use arb_common::{LegSettings, Qty, Symbol};
use position_manager::PositionData;
use serde::{Deserialize, Serialize};
use transfer_manager::TransferRequest;

use crate::role::ActiveRole;

/// Coordinator lifecycle status, mirrored onto the persisted snapshot so a
/// restart can tell a deliberately stopped engine from one that crashed mid-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    /// Constructed but `step()` has not run yet.
    Inactive,
    /// Running the step cycle.
    Active,
    /// Orders cancelled, step cycle skipped until resumed.
    Paused,
    /// Shut down; will not resume.
    Stopped,
}

/// Opaque persisted snapshot of one coordinator's full state. This crate owns
/// both the writer and the reader, so there is no schema evolution concern
/// beyond round-tripping through `serde`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageContext {
    /// Trading pair the engine cycles on.
    pub symbol: Symbol,
    /// Accumulation target per cycle, in base units.
    pub total_quantity: Qty,
    /// Per-order slice size, in base units.
    pub order_qty: Qty,
    /// Minimum required net profit margin to enter, in percent.
    pub min_profit_margin: f64,
    /// Maximum acceptable total cross-venue spread cost to enter, in percent.
    pub max_acceptable_spread: f64,
    /// Which leg is currently accumulating vs releasing.
    pub current_role: ActiveRole,
    /// Lifecycle status.
    pub status: EngineStatus,
    /// Source leg position.
    pub source: PositionData,
    /// Dest leg position.
    pub dest: PositionData,
    /// Hedge leg position.
    pub hedge: PositionData,
    /// Per-role leg settings, keyed by role name (`"source"`, `"dest"`, `"hedge"`).
    pub settings: HashMap<String, LegSettings>,
    /// In-flight inter-venue transfer, if any.
    pub transfer_request: Option<TransferRequest>,
}

impl ArbitrageContext {
    /// Encode as the default binary persistence format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, crate::error::CoordinatorError> {
        bincode::serialize(self).map_err(crate::error::CoordinatorError::SnapshotCodec)
    }

    /// Decode a snapshot previously produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::error::CoordinatorError> {
        bincode::deserialize(bytes).map_err(crate::error::CoordinatorError::SnapshotCodec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_common::LegSettings;

    fn sample() -> ArbitrageContext {
        ArbitrageContext {
            symbol: Symbol::new("BTC", "USDT"),
            total_quantity: Qty::new(1.0),
            order_qty: Qty::new(0.1),
            min_profit_margin: 0.001,
            max_acceptable_spread: 0.002,
            current_role: ActiveRole::Source,
            status: EngineStatus::Active,
            source: PositionData::new(Qty::new(1.0)),
            dest: PositionData::new(Qty::new(1.0)),
            hedge: PositionData::new(Qty::new(1.0)),
            settings: HashMap::from([(
                "source".to_string(),
                LegSettings {
                    venue: "v1_spot".to_string(),
                    tick_tolerance: 2,
                    tick_offset: 1,
                    use_market: false,
                },
            )]),
            transfer_request: None,
        }
    }

    #[test]
    fn snapshot_round_trips_through_bincode() {
        let snapshot = sample();
        let bytes = snapshot.to_bytes().unwrap();
        let decoded = ArbitrageContext::from_bytes(&bytes).unwrap();
        pretty_assertions::assert_eq!(snapshot, decoded);
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let snapshot = sample();
        let mut bytes = snapshot.to_bytes().unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(ArbitrageContext::from_bytes(&bytes).is_err());
    }
}
