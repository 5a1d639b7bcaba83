//! Weighted-average entry/exit pricing and realized PnL accounting for one leg.

use arb_common::{Px, Qty, Side};
use serde::{Deserialize, Serialize};

/// `(new_total_qty, new_weighted_avg_price)` after folding `(new_price, new_qty)`
/// into `(old_price, old_qty)`.
pub(crate) fn weighted_price(old_price: Px, old_qty: Qty, new_price: Px, new_qty: Qty) -> (Qty, Px) {
    let total_qty = old_qty.add(new_qty);
    if !total_qty.is_positive() {
        return (Qty::ZERO, Px::ZERO);
    }
    let old_notional = old_price.as_f64() * old_qty.as_f64();
    let new_notional = new_price.as_f64() * new_qty.as_f64();
    (total_qty, Px::new((old_notional + new_notional) / total_qty.as_f64()))
}

/// Cumulative weighted-average entry/exit pricing and realized PnL for one leg.
///
/// `position_side` pins to whichever side opened the current run of entries and
/// is used as the sign convention for every subsequent `add_exit` call; it is
/// cleared only by `reset`, not by a side reversal — a reversal's new-position
/// entry is recorded through [`super::position_data::PositionData::update`],
/// which computes the closed portion's realized PnL itself rather than relying
/// on this pin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlTracker {
    /// Weighted-average price across all entries.
    pub avg_entry_price: Px,
    /// Weighted-average price across all exits.
    pub avg_exit_price: Px,
    /// Cumulative quantity entered.
    pub total_entry_qty: Qty,
    /// Cumulative quantity exited.
    pub total_exit_qty: Qty,
    /// Cumulative realized PnL, gross of fees, in quote units.
    pub total_pnl_usdt: f64,
    /// Cumulative fees paid on entries and exits, in quote units.
    pub total_fees: f64,
    /// Side pin used for exit-direction sign; `None` until the first entry.
    pub position_side: Option<Side>,
}

impl PnlTracker {
    /// A fresh tracker with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry (a fill on the position's opening side).
    pub fn add_entry(&mut self, price: Px, qty: Qty, side: Side, fee_rate: f64) {
        if self.position_side.is_none() {
            self.position_side = Some(side);
        }

        if self.total_entry_qty.is_positive() {
            let (total_qty, avg_price) =
                weighted_price(self.avg_entry_price, self.total_entry_qty, price, qty);
            self.total_entry_qty = total_qty;
            self.avg_entry_price = avg_price;
        } else {
            self.avg_entry_price = price;
            self.total_entry_qty = qty;
        }

        if fee_rate > 0.0 {
            self.total_fees += price.as_f64() * qty.as_f64() * fee_rate;
        }
    }

    /// Record an exit and accrue its realized PnL.
    pub fn add_exit(&mut self, price: Px, qty: Qty, fee_rate: f64) {
        let Some(side) = self.position_side else {
            return;
        };
        if self.avg_entry_price.is_zero() {
            return;
        }

        let pnl = match side {
            Side::Buy => (price.as_f64() - self.avg_entry_price.as_f64()) * qty.as_f64(),
            Side::Sell => (self.avg_entry_price.as_f64() - price.as_f64()) * qty.as_f64(),
        };
        self.total_pnl_usdt += pnl;

        if self.total_exit_qty.is_positive() {
            let (total_qty, avg_price) =
                weighted_price(self.avg_exit_price, self.total_exit_qty, price, qty);
            self.total_exit_qty = total_qty;
            self.avg_exit_price = avg_price;
        } else {
            self.avg_exit_price = price;
            self.total_exit_qty = qty;
        }

        if fee_rate > 0.0 {
            self.total_fees += price.as_f64() * qty.as_f64() * fee_rate;
        }
    }

    /// Realized PnL, gross of fees.
    #[must_use]
    pub fn pnl_usdt(&self) -> f64 {
        self.total_pnl_usdt
    }

    /// Realized PnL, net of accrued fees.
    #[must_use]
    pub fn pnl_usdt_net(&self) -> f64 {
        self.total_pnl_usdt - self.total_fees
    }

    /// Realized PnL as a percentage of total entry notional.
    #[must_use]
    pub fn pnl_pct(&self) -> f64 {
        self.entry_notional()
            .map(|notional| (self.total_pnl_usdt / notional) * 100.0)
            .unwrap_or(0.0)
    }

    /// Net realized PnL as a percentage of total entry notional.
    #[must_use]
    pub fn pnl_pct_net(&self) -> f64 {
        self.entry_notional()
            .map(|notional| (self.pnl_usdt_net() / notional) * 100.0)
            .unwrap_or(0.0)
    }

    fn entry_notional(&self) -> Option<f64> {
        if self.total_entry_qty.is_positive() && !self.avg_entry_price.is_zero() {
            Some(self.avg_entry_price.as_f64() * self.total_entry_qty.as_f64())
        } else {
            None
        }
    }

    /// Percentage of entered quantity that has since been exited.
    #[must_use]
    pub fn position_closed_percent(&self) -> f64 {
        if self.total_entry_qty.is_positive() {
            (self.total_exit_qty.as_f64() / self.total_entry_qty.as_f64()) * 100.0
        } else {
            0.0
        }
    }

    /// Quantity entered but not yet exited.
    #[must_use]
    pub fn unrealized_qty(&self) -> Qty {
        let remaining = self.total_entry_qty.sub(self.total_exit_qty);
        if remaining.is_positive() {
            remaining
        } else {
            Qty::ZERO
        }
    }

    /// Mark-to-market PnL on the unrealized quantity at `current_price`, netting
    /// estimated round-trip fees. `None` when there is nothing open.
    #[must_use]
    pub fn calculate_unrealized(&self, current_price: Px, fee_rate: f64) -> Option<f64> {
        let remaining = self.unrealized_qty();
        let side = self.position_side?;
        if !remaining.is_positive() {
            return None;
        }

        let mut pnl = match side {
            Side::Buy => (current_price.as_f64() - self.avg_entry_price.as_f64()) * remaining.as_f64(),
            Side::Sell => (self.avg_entry_price.as_f64() - current_price.as_f64()) * remaining.as_f64(),
        };

        if fee_rate > 0.0 {
            pnl -= current_price.as_f64() * remaining.as_f64() * fee_rate;
            pnl -= self.avg_entry_price.as_f64() * remaining.as_f64() * fee_rate;
        }

        Some(pnl)
    }

    /// Clear all accumulated history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_average_on_repeated_entries() {
        let mut tracker = PnlTracker::new();
        tracker.add_entry(Px::new(100.0), Qty::new(1.0), Side::Buy, 0.0);
        tracker.add_entry(Px::new(110.0), Qty::new(1.0), Side::Buy, 0.0);
        assert!((tracker.avg_entry_price.as_f64() - 105.0).abs() < 1e-6);
        assert_eq!(tracker.total_entry_qty, Qty::new(2.0));
    }

    #[test]
    fn long_exit_realizes_expected_pnl() {
        let mut tracker = PnlTracker::new();
        tracker.add_entry(Px::new(100.0), Qty::new(1.0), Side::Buy, 0.0);
        tracker.add_exit(Px::new(110.0), Qty::new(1.0), 0.0);
        assert!((tracker.pnl_usdt() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn short_exit_realizes_expected_pnl() {
        let mut tracker = PnlTracker::new();
        tracker.add_entry(Px::new(100.0), Qty::new(1.0), Side::Sell, 0.0);
        tracker.add_exit(Px::new(90.0), Qty::new(1.0), 0.0);
        assert!((tracker.pnl_usdt() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn fees_reduce_net_but_not_gross_pnl() {
        let mut tracker = PnlTracker::new();
        tracker.add_entry(Px::new(100.0), Qty::new(1.0), Side::Buy, 0.001);
        tracker.add_exit(Px::new(110.0), Qty::new(1.0), 0.001);
        assert!((tracker.pnl_usdt() - 10.0).abs() < 1e-6);
        assert!(tracker.pnl_usdt_net() < tracker.pnl_usdt());
    }

    #[test]
    fn unrealized_qty_tracks_open_remainder() {
        let mut tracker = PnlTracker::new();
        tracker.add_entry(Px::new(100.0), Qty::new(2.0), Side::Buy, 0.0);
        tracker.add_exit(Px::new(110.0), Qty::new(0.5), 0.0);
        assert_eq!(tracker.unrealized_qty(), Qty::new(1.5));
    }
}
