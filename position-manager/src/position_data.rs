//! `PositionData`: the pure, serializable state of one leg's position.

use arb_common::{Order, Px, Qty, Side};
use serde::{Deserialize, Serialize};

use crate::pnl::{weighted_price, PnlTracker};

/// Cumulative fills by side, kept for the `filled_amount[BUY] - filled_amount[SELL]
/// == signed position qty` invariant over a leg that never flips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilledAmount {
    /// Cumulative buy-side fills.
    pub buy: Qty,
    /// Cumulative sell-side fills.
    pub sell: Qty,
}

impl FilledAmount {
    fn add(&mut self, side: Side, qty: Qty) {
        match side {
            Side::Buy => self.buy = self.buy.add(qty),
            Side::Sell => self.sell = self.sell.add(qty),
        }
    }
}

/// Before/after snapshot of a `PositionData::update` call, with any realized
/// PnL booked by the exit portion of that update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionChange {
    /// Quantity before the update.
    pub qty_before: Qty,
    /// Price before the update.
    pub price_before: Px,
    /// Quantity after the update.
    pub qty_after: Qty,
    /// Price after the update.
    pub price_after: Px,
    /// Realized PnL booked by this update, gross of fees.
    pub realized_pnl: f64,
    /// Realized PnL booked by this update, net of fees.
    pub realized_pnl_net: f64,
}

impl PositionChange {
    fn unchanged(qty: Qty, price: Px) -> Self {
        Self {
            qty_before: qty,
            price_before: price,
            qty_after: qty,
            price_after: price,
            realized_pnl: 0.0,
            realized_pnl_net: 0.0,
        }
    }

    /// `true` iff the update actually moved the position's quantity.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.qty_after != self.qty_before
    }

    /// `true` iff this update booked nonzero realized PnL.
    #[must_use]
    pub fn has_pnl(&self) -> bool {
        self.realized_pnl.abs() > f64::EPSILON
    }
}

/// The central mutable entity per leg: quantity, weighted-average price, side,
/// target, per-side cumulative fills, PnL history, and the in-flight order (if
/// any). Invariant: `qty == 0 ⇔ side == None ⇔ price == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    /// Absolute position size in base units. Always `>= 0`.
    pub qty: Qty,
    /// Weighted-average entry price. Zero iff `qty` is zero.
    pub price: Px,
    /// Desired fill size for the leg's current role.
    pub target_qty: Qty,
    /// Current side, `None` iff `qty` is zero.
    pub side: Option<Side>,
    /// Cumulative fills by side, independent of any side reversal.
    pub filled_amount: FilledAmount,
    /// Weighted-average pricing and realized PnL for this leg.
    pub pnl_tracker: PnlTracker,
    /// The order currently live on this leg, if any.
    pub last_order: Option<Order>,
}

impl PositionData {
    /// A flat position with the given accumulation target.
    #[must_use]
    pub fn new(target_qty: Qty) -> Self {
        Self {
            qty: Qty::ZERO,
            price: Px::ZERO,
            target_qty,
            side: None,
            filled_amount: FilledAmount::default(),
            pnl_tracker: PnlTracker::new(),
            last_order: None,
        }
    }

    /// `true` iff the leg currently holds a nonzero position.
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.qty.is_positive()
    }

    /// Notional value of the current position, in quote units.
    #[must_use]
    pub fn quote_value(&self) -> f64 {
        if self.price.is_zero() {
            0.0
        } else {
            self.qty.as_f64() * self.price.as_f64()
        }
    }

    /// `true` once `qty` is within `min_base_qty` of `target_qty`.
    #[must_use]
    pub fn is_fulfilled(&self, min_base_qty: Qty) -> bool {
        if !self.target_qty.is_positive() {
            return false;
        }
        let delta = self.target_qty.sub(self.qty);
        delta.as_i64() < min_base_qty.as_i64()
    }

    /// Quantity still needed to reach `target_qty`, floored to zero once below
    /// `min_base_qty`.
    #[must_use]
    pub fn remaining_qty(&self, min_base_qty: Qty) -> Qty {
        if !self.target_qty.is_positive() {
            return Qty::ZERO;
        }
        let remaining = self.target_qty.sub(self.qty).abs();
        if remaining.as_i64() < min_base_qty.as_i64() {
            Qty::ZERO
        } else {
            remaining
        }
    }

    /// Apply a fill of `quantity` at `price` on `side`. Same-side fills add to
    /// the position (updating the weighted-average price); opposite-side fills
    /// reduce it, closing or reversing it as the quantity demands.
    pub fn update(&mut self, side: Side, quantity: Qty, price: Px, fee_rate: f64) -> PositionChange {
        self.filled_amount.add(side, quantity);

        if !quantity.is_positive() {
            return PositionChange::unchanged(self.qty, self.price);
        }

        if !self.has_position() {
            self.qty = quantity;
            self.price = price;
            self.side = Some(side);
            self.pnl_tracker.add_entry(price, quantity, side, fee_rate);
            return PositionChange {
                qty_before: Qty::ZERO,
                price_before: Px::ZERO,
                qty_after: quantity,
                price_after: price,
                realized_pnl: 0.0,
                realized_pnl_net: 0.0,
            };
        }

        if self.side == Some(side) {
            let (new_qty, new_price) = weighted_price(self.price, self.qty, price, quantity);
            let change = PositionChange {
                qty_before: self.qty,
                price_before: self.price,
                qty_after: new_qty,
                price_after: new_price,
                realized_pnl: 0.0,
                realized_pnl_net: 0.0,
            };
            self.qty = new_qty;
            self.price = new_price;
            self.pnl_tracker.add_entry(price, quantity, side, fee_rate);
            return change;
        }

        let old_qty = self.qty;
        let old_price = self.price;
        let old_side = self.side;
        let close_qty = quantity.min(self.qty);

        let mut realized_pnl = 0.0;
        let mut realized_pnl_net = 0.0;
        if let Some(pos_side) = old_side {
            if !old_price.is_zero() {
                realized_pnl = match pos_side {
                    Side::Buy => (price.as_f64() - old_price.as_f64()) * close_qty.as_f64(),
                    Side::Sell => (old_price.as_f64() - price.as_f64()) * close_qty.as_f64(),
                };
                let fees = if fee_rate > 0.0 {
                    old_price.as_f64() * close_qty.as_f64() * fee_rate
                        + price.as_f64() * close_qty.as_f64() * fee_rate
                } else {
                    0.0
                };
                realized_pnl_net = realized_pnl - fees;
            }
        }

        self.pnl_tracker.add_exit(price, close_qty, fee_rate);

        if quantity < self.qty {
            let new_qty = self.qty.sub(quantity);
            let change = PositionChange {
                qty_before: old_qty,
                price_before: old_price,
                qty_after: new_qty,
                price_after: old_price,
                realized_pnl,
                realized_pnl_net,
            };
            self.qty = new_qty;
            change
        } else if quantity == self.qty {
            let change = PositionChange {
                qty_before: old_qty,
                price_before: old_price,
                qty_after: Qty::ZERO,
                price_after: Px::ZERO,
                realized_pnl,
                realized_pnl_net,
            };
            self.qty = Qty::ZERO;
            self.price = Px::ZERO;
            self.side = None;
            change
        } else {
            let remaining_qty = quantity.sub(self.qty);
            let change = PositionChange {
                qty_before: old_qty,
                price_before: old_price,
                qty_after: remaining_qty,
                price_after: price,
                realized_pnl,
                realized_pnl_net,
            };
            self.qty = remaining_qty;
            self.price = price;
            self.side = Some(side);
            if remaining_qty.is_positive() {
                self.pnl_tracker.add_entry(price, remaining_qty, side, fee_rate);
            }
            change
        }
    }

    /// Reset position state for a new cycle role. `reset_pnl` is `false` when a
    /// transfer only moves inventory (PnL history must survive the gap) and
    /// `true` on full cycle completion.
    pub fn reset(&mut self, target_qty: Qty, reset_pnl: bool) {
        self.target_qty = target_qty;
        self.qty = Qty::ZERO;
        self.price = Px::ZERO;
        self.side = None;
        self.filled_amount = FilledAmount::default();
        self.last_order = None;
        if reset_pnl {
            self.pnl_tracker.reset();
        }
    }
}
