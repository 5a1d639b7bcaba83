//! ENTER/EXIT/HOLD decision gate: independent profitability validation layered
//! on top of an externally supplied spread analyzer.

pub mod gate;
pub mod types;

pub use gate::{is_fresh, SignalGate, SignalGateConfig, MIN_HISTORY_POINTS};
pub use types::{Signal, SpreadAnalyzer, SpreadStats};
