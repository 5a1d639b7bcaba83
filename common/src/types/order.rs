//! Order lifecycle types: the immutable external snapshot tracked per leg.

use crate::{Px, Qty, Side, Symbol, Ts};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an order as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted by the exchange, no fills yet.
    New,
    /// Partially filled, still live.
    PartiallyFilled,
    /// Fully filled.
    Filled,
    /// Cancelled before full fill.
    Cancelled,
    /// Expired (e.g. time-in-force elapsed).
    Expired,
    /// Rejected by the exchange at placement time.
    Rejected,
}

impl OrderStatus {
    /// `true` for any status from which the order cannot transition further.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Expired | Self::Rejected
        )
    }
}

/// An exchange order snapshot. Treated as an immutable external fact: the
/// engine never mutates an `Order` in place, only replaces its local reference
/// with a freshly fetched one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Exchange-assigned id.
    pub order_id: OrderId,
    /// Trading pair.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: Side,
    /// Limit price (ignored by the venue for market orders, but still reported).
    pub price: Px,
    /// Originally requested quantity.
    pub requested_qty: Qty,
    /// Cumulative filled quantity as of this snapshot.
    pub filled_qty: Qty,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Exchange-side timestamp of this snapshot. Used to reject out-of-order
    /// updates — see `Order::supersedes`.
    pub timestamp: Ts,
}

impl Order {
    /// `true` once the order has reached a terminal status.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.status.is_terminal()
    }

    /// `true` iff the order is fully filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        matches!(self.status, OrderStatus::Filled)
    }

    /// `true` iff `self` is a legitimate successor of `previous` — i.e. it
    /// carries a timestamp no older than `previous`'s, its filled quantity
    /// never decreases, and it never regresses from a terminal status back to
    /// a live one. A `false` result means `self` is an out-of-order update
    /// that must be dropped.
    #[must_use]
    pub fn supersedes(&self, previous: &Self) -> bool {
        if self.timestamp.as_nanos() < previous.timestamp.as_nanos() {
            return false;
        }
        if self.filled_qty.as_i64() < previous.filled_qty.as_i64() {
            return false;
        }
        if previous.is_done() && !self.is_done() {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    fn order(filled_qty: f64, status: OrderStatus, timestamp: u64) -> Order {
        Order {
            order_id: OrderId("o1".into()),
            symbol: Symbol::new("BTC", "USDT"),
            side: Side::Buy,
            price: Px::new(100.0),
            requested_qty: Qty::new(1.0),
            filled_qty: Qty::new(filled_qty),
            status,
            timestamp: Ts::from_nanos(timestamp),
        }
    }

    #[rstest::rstest]
    #[case::later_timestamp_more_filled(
        order(0.3, OrderStatus::PartiallyFilled, 100),
        order(0.5, OrderStatus::PartiallyFilled, 200),
        true
    )]
    #[case::older_timestamp_rejected(
        order(0.3, OrderStatus::PartiallyFilled, 100),
        order(0.5, OrderStatus::PartiallyFilled, 50),
        false
    )]
    #[case::decreasing_filled_qty_rejected(
        order(0.3, OrderStatus::PartiallyFilled, 100),
        order(0.1, OrderStatus::PartiallyFilled, 200),
        false
    )]
    #[case::terminal_to_live_rejected(
        order(0.3, OrderStatus::Filled, 100),
        order(0.3, OrderStatus::New, 200),
        false
    )]
    #[case::same_snapshot_is_its_own_successor(
        order(0.3, OrderStatus::PartiallyFilled, 100),
        order(0.3, OrderStatus::PartiallyFilled, 100),
        true
    )]
    fn supersedes_orders_by_timestamp_and_fill_progression(
        #[case] previous: Order,
        #[case] candidate: Order,
        #[case] expected: bool,
    ) {
        assert_eq!(candidate.supersedes(&previous), expected);
    }

    #[test]
    fn terminal_previous_accepts_terminal_successor() {
        let previous = order(1.0, OrderStatus::Filled, 100);
        let candidate = order(1.0, OrderStatus::Filled, 150);
        assert!(candidate.supersedes(&previous));
    }
}
