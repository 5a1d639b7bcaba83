//! Common constants used across all crates.

// Fixed-point arithmetic constants
/// Fixed-point scale factor (4 decimal places)
pub const FIXED_POINT_SCALE: i64 = 10000;
pub const FIXED_POINT_SCALE_F64: f64 = 10000.0;

// Time constants
pub const NANOS_PER_MILLI: u64 = 1_000_000;
pub const NANOS_PER_MICRO: u64 = 1000;
