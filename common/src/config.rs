//! Engine configuration — the recognized options a host passes at construction.

use crate::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-leg placement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSettings {
    /// Venue identifier this leg trades on (operator-defined string, e.g.
    /// `"mexc_spot"` or `"gateio_futures"`).
    pub venue: String,
    /// Ticks of drift tolerated before an outstanding limit order is
    /// cancelled and re-pegged.
    pub tick_tolerance: u32,
    /// Ticks offset from top-of-book when placing a new limit order.
    pub tick_offset: i32,
    /// Place market orders instead of limit orders on this leg.
    pub use_market: bool,
}

impl Default for LegSettings {
    fn default() -> Self {
        Self {
            venue: String::new(),
            tick_tolerance: 2,
            tick_offset: 0,
            use_market: false,
        }
    }
}

/// Top-level engine configuration, as recognized by the coordinator at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trading pair the engine cycles on.
    pub symbol: Symbol,
    /// Accumulation target per cycle, in base units.
    pub total_quantity: f64,
    /// Per-order slice size, in base units.
    pub order_qty: f64,
    /// Minimum required net profit margin to enter, in percent.
    pub min_profit_margin: f64,
    /// Maximum acceptable total cross-venue spread cost, in percent.
    pub max_acceptable_spread: f64,
    /// Per-role leg settings, keyed by role name (`"source"`, `"dest"`,
    /// `"hedge"`).
    pub settings: HashMap<String, LegSettings>,
}

impl EngineConfig {
    /// `min_profit_margin` default per spec §6: 0.1%.
    pub const DEFAULT_MIN_PROFIT_MARGIN: f64 = 0.1;
    /// `max_acceptable_spread` default per spec §6: 0.2%.
    pub const DEFAULT_MAX_ACCEPTABLE_SPREAD: f64 = 0.2;
}
