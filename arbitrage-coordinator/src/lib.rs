//! Delta-neutral cross-exchange arbitrage coordinator: ties together position
//! reconciliation, signal evaluation, hedge rebalancing, and inter-venue
//! transfers into one per-cycle `step()`.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod hedge;
pub mod role;
pub mod spreads;

pub use context::{ArbitrageContext, EngineStatus};
pub use coordinator::{ArbitrageCoordinator, ContextSaveCallback};
pub use error::CoordinatorError;
pub use hedge::{hedge_correction, hedge_delta, HedgeAction};
pub use role::ActiveRole;
pub use spreads::{
    dest_vs_hedge_spread, execution_spread_cost, source_vs_hedge_spread, SpreadSeries,
    MAX_HISTORY_POINTS, SPREAD_UPDATE_INTERVAL,
};
