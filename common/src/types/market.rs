//! Public market-data snapshots delivered by exchange feeds.

use crate::{Px, Qty, Symbol, Ts};
use serde::{Deserialize, Serialize};

/// Best bid/ask snapshot for one symbol on one venue, as delivered by the public
/// book-ticker WebSocket stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookTicker {
    /// Best bid price.
    pub bid_price: Px,
    /// Quantity available at the best bid.
    pub bid_qty: Qty,
    /// Best ask price.
    pub ask_price: Px,
    /// Quantity available at the best ask.
    pub ask_qty: Qty,
    /// Exchange-side timestamp of this snapshot.
    pub timestamp: Ts,
}

impl BookTicker {
    /// Mid price between best bid and best ask.
    #[must_use]
    pub fn mid_price(&self) -> Px {
        Px::from_i64((self.bid_price.as_i64() + self.ask_price.as_i64()) / 2)
    }

    /// `true` iff the book is crossed (bid at or above ask) — a sign of a stale
    /// or corrupt snapshot that callers should not trade against.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        self.bid_price.as_i64() >= self.ask_price.as_i64()
    }
}

/// Maker/taker fee rates for one symbol on one venue. Cached at initialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fees {
    /// Maker fee rate (e.g. `0.001` for 0.1%).
    pub maker_fee: f64,
    /// Taker fee rate (e.g. `0.001` for 0.1%).
    pub taker_fee: f64,
}

impl Fees {
    /// Zero-fee placeholder, useful in tests.
    pub const ZERO: Self = Self {
        maker_fee: 0.0,
        taker_fee: 0.0,
    };
}

/// Symbol metadata cached at initialization: tick size, exchange minimums, and
/// the futures contract multiplier (1.0 for spot).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Minimum price increment.
    pub tick_size: Px,
    /// Minimum order size in base units.
    pub min_base_qty: Qty,
    /// Minimum order notional in quote units.
    pub min_quote_qty: Qty,
    /// Futures contract multiplier; `1.0` for spot symbols.
    pub contract_multiplier: f64,
}

impl SymbolInfo {
    /// The minimum base quantity that satisfies both the absolute base-quantity
    /// floor and the minimum-notional floor at `price`.
    #[must_use]
    pub fn abs_min_qty(&self, price: Px) -> Qty {
        if price.is_zero() {
            return self.min_base_qty;
        }
        let from_notional = self.min_quote_qty.as_f64() / price.as_f64();
        self.min_base_qty.max(Qty::new(from_notional))
    }

    /// Round `qty` down to the nearest multiple of the futures contract size.
    /// A no-op for spot symbols (`contract_multiplier == 1.0`).
    #[must_use]
    pub fn round_to_contracts(&self, qty: Qty) -> Qty {
        if self.contract_multiplier <= 0.0 {
            return qty;
        }
        let contracts = (qty.as_f64() / self.contract_multiplier).floor();
        Qty::new(contracts * self.contract_multiplier)
    }
}
