//! Rolling spread series and the pure cost formulas evaluated over one cycle.

use std::time::Duration;

use arb_common::{BookTicker, Ts};

/// Cadence a spread series accepts a fresh sample at, matching a five-minute
/// candle.
pub const SPREAD_UPDATE_INTERVAL: Duration = Duration::from_secs(300);

/// Cap on retained history: one point per `SPREAD_UPDATE_INTERVAL` across one
/// week (7 * 24 * 12).
pub const MAX_HISTORY_POINTS: usize = 2016;

/// A capped, time-gated rolling history of one spread series.
#[derive(Debug, Clone, Default)]
pub struct SpreadSeries {
    history: Vec<f64>,
    last_update: Option<Ts>,
}

impl SpreadSeries {
    /// An empty series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the series with externally loaded history (e.g. from a restored
    /// snapshot or a candle backfill), marking it fresh as of now so the next
    /// append waits a full interval rather than firing immediately.
    pub fn seed(&mut self, history: Vec<f64>) {
        self.history = history;
        self.truncate();
        self.last_update = Some(Ts::now());
    }

    /// The retained history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Append `value` if at least `SPREAD_UPDATE_INTERVAL` has passed since
    /// the last recorded sample (or none has been recorded yet). Returns
    /// whether it appended.
    pub fn record_if_due(&mut self, value: f64, now: Ts) -> bool {
        let due = match self.last_update {
            None => true,
            Some(last) => now.as_nanos().saturating_sub(last.as_nanos())
                >= SPREAD_UPDATE_INTERVAL.as_nanos() as u64,
        };
        if !due {
            return false;
        }
        self.history.push(value);
        self.truncate();
        self.last_update = Some(now);
        true
    }

    fn truncate(&mut self) {
        if self.history.len() > MAX_HISTORY_POINTS {
            let overflow = self.history.len() - MAX_HISTORY_POINTS;
            self.history.drain(0..overflow);
        }
    }
}

/// `(hedge.bid - source.ask) / hedge.bid * 100`: the edge available entering
/// the source leg against the hedge venue.
#[must_use]
pub fn source_vs_hedge_spread(source: &BookTicker, hedge: &BookTicker) -> f64 {
    if hedge.bid_price.is_zero() {
        return 0.0;
    }
    (hedge.bid_price.as_f64() - source.ask_price.as_f64()) / hedge.bid_price.as_f64() * 100.0
}

/// `(dest.bid - hedge.ask) / dest.bid * 100`: the edge available releasing the
/// dest leg against the hedge venue.
#[must_use]
pub fn dest_vs_hedge_spread(dest: &BookTicker, hedge: &BookTicker) -> f64 {
    if dest.bid_price.is_zero() {
        return 0.0;
    }
    (dest.bid_price.as_f64() - hedge.ask_price.as_f64()) / dest.bid_price.as_f64() * 100.0
}

/// Sum of each venue's own bid/ask spread, in percent: the cost of crossing
/// all three books once.
#[must_use]
pub fn execution_spread_cost(source: &BookTicker, dest: &BookTicker, hedge: &BookTicker) -> f64 {
    [source, dest, hedge]
        .iter()
        .map(|book| {
            if book.ask_price.is_zero() {
                0.0
            } else {
                (book.ask_price.as_f64() - book.bid_price.as_f64()) / book.ask_price.as_f64() * 100.0
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_common::Px;

    fn book(bid: f64, ask: f64) -> BookTicker {
        BookTicker {
            bid_price: Px::new(bid),
            bid_qty: arb_common::Qty::new(1.0),
            ask_price: Px::new(ask),
            ask_qty: arb_common::Qty::new(1.0),
            timestamp: Ts::now(),
        }
    }

    #[test]
    fn series_caps_at_max_history_points() {
        let mut series = SpreadSeries::new();
        series.seed(vec![0.1; MAX_HISTORY_POINTS + 10]);
        assert_eq!(series.history().len(), MAX_HISTORY_POINTS);
    }

    #[test]
    fn record_is_gated_by_interval() {
        let mut series = SpreadSeries::new();
        let t0 = Ts::from_nanos(0);
        assert!(series.record_if_due(0.1, t0));
        assert!(!series.record_if_due(0.2, Ts::from_nanos(1)));
        let t1 = Ts::from_nanos(SPREAD_UPDATE_INTERVAL.as_nanos() as u64);
        assert!(series.record_if_due(0.2, t1));
        assert_eq!(series.history(), &[0.1, 0.2]);
    }

    #[test]
    fn source_vs_hedge_matches_formula() {
        let source = book(99.0, 100.0);
        let hedge = book(101.0, 102.0);
        let spread = source_vs_hedge_spread(&source, &hedge);
        assert!((spread - (101.0 - 100.0) / 101.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn execution_cost_sums_three_books() {
        let source = book(99.0, 100.0);
        let dest = book(98.0, 99.0);
        let hedge = book(100.0, 101.0);
        let cost = execution_spread_cost(&source, &dest, &hedge);
        let expected = (100.0 - 99.0) / 100.0 * 100.0
            + (99.0 - 98.0) / 99.0 * 100.0
            + (101.0 - 100.0) / 101.0 * 100.0;
        assert!((cost - expected).abs() < 1e-9);
    }
}
