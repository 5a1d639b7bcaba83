//! Value types exchanged between the signal gate and its external analyzer.

/// Trading decision the coordinator acts on each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Conditions favor opening (accumulating) the `source` leg.
    Enter,
    /// Conditions favor closing (releasing) the `dest` leg.
    Exit,
    /// No action this cycle.
    Hold,
}

/// Statistical summary of a spread series, as produced by the external
/// analyzer. Field names mirror the percentile-based thresholds the
/// validation step reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadStats {
    /// The spread's current value.
    pub current: f64,
    /// Mean of the historical series.
    pub mean: f64,
    /// 25th percentile of the historical minima, used as a dynamic entry
    /// threshold.
    pub min_25pct: f64,
    /// 25th percentile of the historical maxima, used as a dynamic exit
    /// threshold.
    pub max_25pct: f64,
}

/// External, pure-function collaborator that turns a historical spread series
/// plus its current value into a raw signal and descriptive statistics. This
/// engine treats the analyzer as a black box — it owns no statistical logic
/// of its own beyond the profitability validation layered on top of it.
pub trait SpreadAnalyzer: Send + Sync {
    /// Produce a raw `(signal, stats)` pair for one spread series.
    fn analyze(&self, historical: &[f64], current: f64) -> (Signal, SpreadStats);
}
