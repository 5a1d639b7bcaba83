//! Core value types shared by every crate in the arbitrage engine.

use crate::constants::{FIXED_POINT_SCALE, FIXED_POINT_SCALE_F64, NANOS_PER_MICRO, NANOS_PER_MILLI};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading pair: `(base, quote)`. Hashable value type, e.g. `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    /// Base asset, e.g. `BTC`.
    pub base: String,
    /// Quote asset, e.g. `USDT`.
    pub quote: String,
}

impl Symbol {
    /// Build a symbol from base/quote asset names.
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Order side / position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy / long.
    Buy,
    /// Sell / short.
    Sell,
}

impl Side {
    /// The side that closes a position opened with `self`.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Price, stored as fixed-point ticks (4 decimal places) for deterministic arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Px(i64);

impl Px {
    /// Zero price.
    pub const ZERO: Self = Self(0);

    /// Build a price from a floating-point value (external API boundary only).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(value: f64) -> Self {
        Self((value * FIXED_POINT_SCALE_F64).round() as i64)
    }

    /// Build a price directly from fixed-point ticks.
    #[must_use]
    pub const fn from_i64(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Price as ticks.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Price as `f64`, for logging and external APIs. Internal math prefers the
    /// fixed-point helpers above.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / FIXED_POINT_SCALE_F64
    }

    /// `true` iff the price is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Notional value of `qty` units at this price, in fixed-point ticks.
    #[must_use]
    pub const fn mul_qty(self, qty: Qty) -> i64 {
        (self.0 * qty.as_i64()) / FIXED_POINT_SCALE
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.as_f64())
    }
}

/// Quantity, stored as fixed-point units (4 decimal places).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Qty(i64);

impl Qty {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Build a quantity from a floating-point value (external API boundary only).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(value: f64) -> Self {
        Self((value * FIXED_POINT_SCALE_F64).round() as i64)
    }

    /// Build a quantity directly from fixed-point units.
    #[must_use]
    pub const fn from_i64(units: i64) -> Self {
        Self(units)
    }

    /// Quantity as fixed-point units.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Quantity as `f64`, for logging and external APIs.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / FIXED_POINT_SCALE_F64
    }

    /// `true` iff the quantity is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `true` iff the quantity is strictly positive.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    #[must_use]
    pub const fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }

    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    #[must_use]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.as_f64())
    }
}

impl std::ops::Neg for Qty {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

/// Monotonic wall-clock timestamp, nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ts(pub u64);

impl Ts {
    /// Current time.
    #[must_use]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0));
        Self(duration.as_secs() * 1_000_000_000 + u64::from(duration.subsec_nanos()))
    }

    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn as_micros(&self) -> u64 {
        self.0 / NANOS_PER_MICRO
    }

    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0 / NANOS_PER_MILLI
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
