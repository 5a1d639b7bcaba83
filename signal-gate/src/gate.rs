//! The profitability validation layered on top of the raw spread analyzer.

use arb_common::Ts;
use tracing::{debug, info};

use crate::types::{Signal, SpreadAnalyzer, SpreadStats};

/// Below this many historical points the analyzer's thresholds are considered
/// unreliable and the gate always holds.
pub const MIN_HISTORY_POINTS: usize = 50;

/// Relaxation applied to `max_acceptable_spread` when the current opportunity
/// is unusually large relative to its historical mean.
const ENTER_SPREAD_RELAX_THRESHOLD: f64 = 1.5;
const ENTER_SPREAD_RELAX_MULTIPLIER: f64 = 2.0;

/// Exits tolerate a wider spread and need only half the entry profit margin —
/// capital preservation takes precedence over marginal optimization once a
/// leg is already open.
const EXIT_SPREAD_TOLERANCE_MULTIPLIER: f64 = 1.5;
const EXIT_PROFIT_MARGIN_MULTIPLIER: f64 = 0.5;

/// Configuration the gate validates every signal against.
#[derive(Debug, Clone, Copy)]
pub struct SignalGateConfig {
    /// Minimum net edge (percent) required to enter.
    pub min_profit_margin: f64,
    /// Maximum acceptable total cross-venue spread cost (percent) to enter.
    pub max_acceptable_spread: f64,
    /// Sum of taker fees (percent) across one full cycle's trades.
    pub round_trip_fees_pct: f64,
}

/// Gates a raw ENTER/EXIT/HOLD signal behind independent profitability
/// validation, and forces HOLD below `MIN_HISTORY_POINTS` history.
pub struct SignalGate<A: SpreadAnalyzer> {
    analyzer: A,
    config: SignalGateConfig,
    /// Whether the previous `evaluate` call resulted in a tradeable signal.
    /// `None` until the first call; used to log enable/disable transitions
    /// once instead of every cycle.
    last_enabled: Option<bool>,
}

impl<A: SpreadAnalyzer> SignalGate<A> {
    /// Build a gate around an analyzer and its validation thresholds.
    pub fn new(analyzer: A, config: SignalGateConfig) -> Self {
        Self { analyzer, config, last_enabled: None }
    }

    /// Evaluate one spread series. `is_enter_mode` is `true` while the cycle's
    /// active leg is `source` (accumulating); ENTER signals are only honored
    /// in that mode, EXIT only otherwise.
    pub fn evaluate(
        &mut self,
        historical: &[f64],
        current: f64,
        total_spread_cost: f64,
        is_enter_mode: bool,
    ) -> Signal {
        let signal = self.evaluate_inner(historical, current, total_spread_cost, is_enter_mode);
        self.log_enabled_transition(signal != Signal::Hold);
        signal
    }

    fn evaluate_inner(
        &self,
        historical: &[f64],
        current: f64,
        total_spread_cost: f64,
        is_enter_mode: bool,
    ) -> Signal {
        if historical.len() < MIN_HISTORY_POINTS {
            debug!(points = historical.len(), "insufficient spread history, holding");
            return Signal::Hold;
        }

        let (raw_signal, stats) = self.analyzer.analyze(historical, current);

        match raw_signal {
            Signal::Enter if is_enter_mode => {
                if self.validate_entry(&stats, total_spread_cost) {
                    Signal::Enter
                } else {
                    Signal::Hold
                }
            }
            Signal::Exit if !is_enter_mode => {
                if self.validate_exit(&stats, total_spread_cost) {
                    Signal::Exit
                } else {
                    Signal::Hold
                }
            }
            _ => Signal::Hold,
        }
    }

    /// Logs only when trading permission actually flips, avoiding log spam at
    /// the engine's per-cycle evaluation rate.
    fn log_enabled_transition(&mut self, enabled: bool) {
        if self.last_enabled != Some(enabled) {
            info!(enabled, "trading permission changed");
            self.last_enabled = Some(enabled);
        }
    }

    fn validate_entry(&self, stats: &SpreadStats, total_spread_cost: f64) -> bool {
        let total_costs = total_spread_cost + self.config.round_trip_fees_pct;
        let net_edge = stats.current.abs() - total_costs;
        if net_edge < self.config.min_profit_margin {
            debug!(net_edge, required = self.config.min_profit_margin, "entry validation failed on net edge");
            return false;
        }

        let multiplier = if stats.current.abs() > stats.mean.abs() * ENTER_SPREAD_RELAX_THRESHOLD {
            ENTER_SPREAD_RELAX_MULTIPLIER
        } else {
            1.0
        };
        let adjusted_max_spread = self.config.max_acceptable_spread * multiplier;

        if total_spread_cost > adjusted_max_spread {
            debug!(total_spread_cost, adjusted_max_spread, "entry validation failed on spread cost");
            return false;
        }

        true
    }

    fn validate_exit(&self, stats: &SpreadStats, total_spread_cost: f64) -> bool {
        let exit_tolerance = self.config.max_acceptable_spread * EXIT_SPREAD_TOLERANCE_MULTIPLIER;
        if total_spread_cost > exit_tolerance {
            debug!(total_spread_cost, exit_tolerance, "exit validation failed on spread cost");
            return false;
        }

        let exit_edge = stats.current - stats.max_25pct;
        let min_exit_profit = self.config.min_profit_margin * EXIT_PROFIT_MARGIN_MULTIPLIER;
        if exit_edge < min_exit_profit {
            debug!(exit_edge, min_exit_profit, "exit validation failed on profit margin");
            return false;
        }

        true
    }
}

/// `true` iff a quote timestamped `quote_ts` is still usable at `now`, i.e.
/// not older than `max_age_nanos`. Signals computed from a stale book must be
/// rejected, the same discipline the coordinator applies to hedge snapshots.
#[must_use]
pub fn is_fresh(quote_ts: Ts, now: Ts, max_age_nanos: u64) -> bool {
    now.as_nanos().saturating_sub(quote_ts.as_nanos()) <= max_age_nanos
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAnalyzer {
        signal: Signal,
        stats: SpreadStats,
    }

    impl SpreadAnalyzer for FixedAnalyzer {
        fn analyze(&self, _historical: &[f64], _current: f64) -> (Signal, SpreadStats) {
            (self.signal, self.stats)
        }
    }

    fn config() -> SignalGateConfig {
        SignalGateConfig {
            min_profit_margin: 0.1,
            max_acceptable_spread: 0.2,
            round_trip_fees_pct: 0.05,
        }
    }

    fn history(len: usize) -> Vec<f64> {
        vec![0.1; len]
    }

    #[test]
    fn below_minimum_history_always_holds() {
        let mut gate = SignalGate::new(
            FixedAnalyzer { signal: Signal::Enter, stats: SpreadStats { current: 1.0, mean: 0.2, min_25pct: 0.1, max_25pct: 0.3 } },
            config(),
        );
        assert_eq!(gate.evaluate(&history(49), 1.0, 0.05, true), Signal::Hold);
    }

    #[test]
    fn enter_signal_honored_in_enter_mode_with_sufficient_edge() {
        let mut gate = SignalGate::new(
            FixedAnalyzer { signal: Signal::Enter, stats: SpreadStats { current: 0.5, mean: 0.2, min_25pct: 0.1, max_25pct: 0.3 } },
            config(),
        );
        assert_eq!(gate.evaluate(&history(50), 0.5, 0.1, true), Signal::Enter);
    }

    #[test]
    fn enter_signal_ignored_outside_enter_mode() {
        let mut gate = SignalGate::new(
            FixedAnalyzer { signal: Signal::Enter, stats: SpreadStats { current: 0.5, mean: 0.2, min_25pct: 0.1, max_25pct: 0.3 } },
            config(),
        );
        assert_eq!(gate.evaluate(&history(50), 0.5, 0.1, false), Signal::Hold);
    }

    #[test]
    fn entry_fails_when_net_edge_below_margin() {
        let mut gate = SignalGate::new(
            FixedAnalyzer { signal: Signal::Enter, stats: SpreadStats { current: 0.12, mean: 0.1, min_25pct: 0.05, max_25pct: 0.2 } },
            config(),
        );
        // net_edge = 0.12 - (0.1 spread_cost + 0.05 fees) = -0.03 < 0.1 margin
        assert_eq!(gate.evaluate(&history(50), 0.12, 0.1, true), Signal::Hold);
    }

    #[test]
    fn entry_spread_cap_relaxes_for_large_opportunities() {
        let mut gate = SignalGate::new(
            FixedAnalyzer {
                signal: Signal::Enter,
                // current far exceeds 1.5x mean, so the 2x spread multiplier applies
                stats: SpreadStats { current: 1.0, mean: 0.2, min_25pct: 0.1, max_25pct: 0.3 },
            },
            config(),
        );
        // total_spread_cost 0.35 exceeds the unrelaxed cap (0.2) but not 2x (0.4)
        assert_eq!(gate.evaluate(&history(50), 1.0, 0.35, true), Signal::Enter);
    }

    #[test]
    fn exit_signal_honored_with_sufficient_edge() {
        let mut gate = SignalGate::new(
            FixedAnalyzer { signal: Signal::Exit, stats: SpreadStats { current: 0.3, mean: 0.1, min_25pct: 0.05, max_25pct: 0.1 } },
            config(),
        );
        // exit_edge = 0.3 - 0.1 = 0.2 >= 0.05 (half of 0.1 margin)
        assert_eq!(gate.evaluate(&history(50), 0.3, 0.1, false), Signal::Exit);
    }

    #[test]
    fn exit_fails_outside_its_wider_spread_tolerance() {
        let mut gate = SignalGate::new(
            FixedAnalyzer { signal: Signal::Exit, stats: SpreadStats { current: 0.3, mean: 0.1, min_25pct: 0.05, max_25pct: 0.1 } },
            config(),
        );
        // exit tolerance is 0.2 * 1.5 = 0.3; 0.31 exceeds it
        assert_eq!(gate.evaluate(&history(50), 0.3, 0.31, false), Signal::Hold);
    }

    #[test]
    fn quote_freshness_gate() {
        let now = Ts::from_nanos(10_000_000_000);
        assert!(is_fresh(Ts::from_nanos(9_000_000_000), now, 2_000_000_000));
        assert!(!is_fresh(Ts::from_nanos(5_000_000_000), now, 2_000_000_000));
    }

    #[test]
    fn enabled_state_only_logs_on_transition() {
        let mut gate = SignalGate::new(
            FixedAnalyzer { signal: Signal::Enter, stats: SpreadStats { current: 0.5, mean: 0.2, min_25pct: 0.1, max_25pct: 0.3 } },
            config(),
        );
        assert_eq!(gate.last_enabled, None);
        gate.evaluate(&history(50), 0.5, 0.1, true);
        assert_eq!(gate.last_enabled, Some(true));
        gate.evaluate(&history(50), 0.5, 0.1, true);
        assert_eq!(gate.last_enabled, Some(true));
        gate.evaluate(&history(49), 0.5, 0.1, true);
        assert_eq!(gate.last_enabled, Some(false));
    }

    #[rstest::rstest]
    #[case::entry_honored_with_edge(Signal::Enter, 1.0, 0.2, 0.2, true, Signal::Enter)]
    #[case::entry_fails_below_margin(Signal::Enter, 0.12, 0.1, 0.1, true, Signal::Hold)]
    #[case::exit_honored_with_edge(Signal::Exit, 0.3, 0.1, 0.1, false, Signal::Exit)]
    #[case::exit_fails_wide_spread(Signal::Exit, 0.3, 0.1, 0.31, false, Signal::Hold)]
    fn evaluate_validation_table(
        #[case] raw_signal: Signal,
        #[case] current: f64,
        #[case] mean: f64,
        #[case] total_spread_cost: f64,
        #[case] is_enter_mode: bool,
        #[case] expected: Signal,
    ) {
        let mut gate = SignalGate::new(
            FixedAnalyzer {
                signal: raw_signal,
                stats: SpreadStats { current, mean, min_25pct: mean - 0.05, max_25pct: mean + 0.1 },
            },
            config(),
        );
        assert_eq!(gate.evaluate(&history(50), current, total_spread_cost, is_enter_mode), expected);
    }

    proptest::proptest! {
        /// Below `MIN_HISTORY_POINTS` the gate always holds, regardless of
        /// what the underlying analyzer or spread cost inputs are.
        #[test]
        fn short_history_always_holds(
            len in 0usize..MIN_HISTORY_POINTS,
            current in -5.0f64..5.0,
            spread_cost in 0.0f64..5.0,
            is_enter_mode in proptest::bool::ANY,
        ) {
            let mut gate = SignalGate::new(
                FixedAnalyzer { signal: Signal::Enter, stats: SpreadStats { current, mean: current, min_25pct: current, max_25pct: current } },
                config(),
            );
            prop_assert_eq!(gate.evaluate(&history(len), current, spread_cost, is_enter_mode), Signal::Hold);
        }
    }
}
