//! `ArbitrageCoordinator`: runs the per-cycle step loop that ties together
//! position reconciliation, signal evaluation, hedge rebalancing, and
//! inter-venue transfers for one delta-neutral arbitrage cycle.

use std::collections::HashMap;
use std::sync::Arc;

use arb_common::{EngineConfig, LegSettings, Px, Qty, Side, Symbol, Ts};
use exchange_gateway::ExchangeHandle;
use position_manager::{PositionData, PositionManager, SaveCallback};
use signal_gate::{is_fresh, Signal, SignalGate, SignalGateConfig, SpreadAnalyzer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use transfer_manager::{TransferManager, TransferRequest};

use crate::context::{ArbitrageContext, EngineStatus};
use crate::error::CoordinatorError;
use crate::hedge::{self, HedgeAction};
use crate::role::ActiveRole;
use crate::spreads::{
    dest_vs_hedge_spread, execution_spread_cost, source_vs_hedge_spread, SpreadSeries,
};

/// A book ticker older than this is never acted on, matching the same
/// discipline `signal_gate::is_fresh` is built for.
const STALE_QUOTE_NANOS: u64 = 5_000_000_000;

/// Callback invoked after every state-affecting step, so the host can persist
/// the opaque context snapshot (e.g. to disk, or a key/value store).
pub type ContextSaveCallback = Arc<dyn Fn(&ArbitrageContext) + Send + Sync>;

struct TransferMonitor {
    join: JoinHandle<()>,
    rx: mpsc::Receiver<TransferRequest>,
}

/// Runs the three-leg (source/dest/hedge) delta-neutral cycle: accumulate on
/// `source`, transfer the base asset, release on `dest`, transfer the quote
/// proceeds back, repeat — while `hedge` is kept flat against the combined
/// spot exposure throughout.
pub struct ArbitrageCoordinator<A: SpreadAnalyzer> {
    symbol: Symbol,
    total_quantity: Qty,
    order_qty: Qty,
    min_profit_margin: f64,
    max_acceptable_spread: f64,
    current_role: ActiveRole,
    status: EngineStatus,

    source: PositionManager,
    dest: PositionManager,
    hedge: PositionManager,

    source_handle: Arc<dyn ExchangeHandle>,
    dest_handle: Arc<dyn ExchangeHandle>,
    hedge_handle: Arc<dyn ExchangeHandle>,

    signal_gate: SignalGate<A>,
    source_hedge_spreads: SpreadSeries,
    dest_hedge_spreads: SpreadSeries,

    transfer_request: Option<TransferRequest>,
    transfer_monitor: Option<TransferMonitor>,

    save_callback: ContextSaveCallback,
}

impl<A: SpreadAnalyzer> ArbitrageCoordinator<A> {
    /// Bring up all three legs, restore from a prior snapshot if given, and
    /// resume monitoring any transfer that was in flight when the engine last
    /// stopped.
    #[allow(clippy::too_many_arguments)]
    pub async fn start(
        config: EngineConfig,
        source_handle: Arc<dyn ExchangeHandle>,
        dest_handle: Arc<dyn ExchangeHandle>,
        hedge_handle: Arc<dyn ExchangeHandle>,
        analyzer: A,
        restored: Option<ArbitrageContext>,
        initial_spread_history: (Vec<f64>, Vec<f64>),
        save_callback: ContextSaveCallback,
    ) -> Result<Self, CoordinatorError> {
        let symbol = config.symbol.clone();
        let total_quantity = Qty::new(config.total_quantity);
        let order_qty = Qty::new(config.order_qty);

        let source_settings = config.settings.get("source").cloned().unwrap_or_default();
        let dest_settings = config.settings.get("dest").cloned().unwrap_or_default();
        let hedge_settings = config.settings.get("hedge").cloned().unwrap_or_default();

        let restored_positions = restored
            .as_ref()
            .map(|ctx| (ctx.source.clone(), ctx.dest.clone(), ctx.hedge.clone()));
        let (source_restored, dest_restored, hedge_restored) = match restored_positions {
            Some((s, d, h)) => (Some(s), Some(d), Some(h)),
            None => (None, None, None),
        };

        let no_op_save: SaveCallback = Arc::new(|_: &PositionData| {});

        let (source_res, dest_res, hedge_res) = tokio::join!(
            PositionManager::initialize(
                Arc::clone(&source_handle),
                symbol.clone(),
                source_settings,
                total_quantity,
                source_restored,
                Arc::clone(&no_op_save),
                None,
            ),
            PositionManager::initialize(
                Arc::clone(&dest_handle),
                symbol.clone(),
                dest_settings,
                total_quantity,
                dest_restored,
                Arc::clone(&no_op_save),
                None,
            ),
            PositionManager::initialize(
                Arc::clone(&hedge_handle),
                symbol.clone(),
                hedge_settings,
                total_quantity,
                hedge_restored,
                Arc::clone(&no_op_save),
                None,
            ),
        );

        let source = source_res.map_err(CoordinatorError::SourceInit)?;
        let dest = dest_res.map_err(CoordinatorError::DestInit)?;
        let hedge = hedge_res.map_err(CoordinatorError::HedgeInit)?;

        let current_role = match &restored {
            Some(ctx) => ctx.current_role,
            None if dest.position().has_position() && !source.position().has_position() => {
                ActiveRole::Dest
            }
            None => ActiveRole::Source,
        };

        let round_trip_fees_pct =
            (source.fees().taker_fee + dest.fees().taker_fee + hedge.fees().taker_fee * 2.0) * 100.0;

        let signal_gate = SignalGate::new(
            analyzer,
            SignalGateConfig {
                min_profit_margin: config.min_profit_margin,
                max_acceptable_spread: config.max_acceptable_spread,
                round_trip_fees_pct,
            },
        );

        let mut source_hedge_spreads = SpreadSeries::new();
        source_hedge_spreads.seed(initial_spread_history.0);
        let mut dest_hedge_spreads = SpreadSeries::new();
        dest_hedge_spreads.seed(initial_spread_history.1);

        let mut transfer_request = None;
        let mut transfer_monitor = None;
        if let Some(ctx) = &restored {
            if let Some(request) = ctx.transfer_request.clone() {
                if request.in_progress {
                    let originating_handle = if current_role == ActiveRole::Source {
                        Arc::clone(&source_handle)
                    } else {
                        Arc::clone(&dest_handle)
                    };
                    let mgr = Arc::new(TransferManager::new(originating_handle));
                    let (join, rx) = Arc::clone(&mgr).spawn_monitor(request.clone());
                    transfer_monitor = Some(TransferMonitor { join, rx });
                    transfer_request = Some(request);
                }
            }
        }

        let status = restored.map_or(EngineStatus::Inactive, |ctx| ctx.status);

        Ok(Self {
            symbol,
            total_quantity,
            order_qty,
            min_profit_margin: config.min_profit_margin,
            max_acceptable_spread: config.max_acceptable_spread,
            current_role,
            status,
            source,
            dest,
            hedge,
            source_handle,
            dest_handle,
            hedge_handle,
            signal_gate,
            source_hedge_spreads,
            dest_hedge_spreads,
            transfer_request,
            transfer_monitor,
            save_callback,
        })
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// Which leg is currently accumulating vs releasing.
    #[must_use]
    pub fn current_role(&self) -> ActiveRole {
        self.current_role
    }

    /// Mark the engine active, ready for `step()` to run the cycle.
    pub fn activate(&mut self) {
        self.status = EngineStatus::Active;
    }

    /// Cancel any resting orders and mark the engine paused. `step()` becomes
    /// a no-op until `activate()` is called again.
    pub async fn pause(&mut self) {
        self.cancel_all_orders().await;
        self.status = EngineStatus::Paused;
        self.persist();
    }

    /// Cancel any resting orders and mark the engine stopped. Unlike `pause`,
    /// not intended to be resumed.
    pub async fn stop(&mut self) {
        self.cancel_all_orders().await;
        self.status = EngineStatus::Stopped;
        self.persist();
    }

    /// Wait out any background transfer monitor task before dropping this
    /// coordinator. Exchange handles themselves carry no explicit close
    /// operation in this trait; they are simply dropped with the coordinator.
    pub async fn cleanup(&mut self) {
        self.finish_transfer_monitor().await;
    }

    async fn cancel_all_orders(&mut self) {
        tokio::join!(
            self.source.cancel_order(),
            self.dest.cancel_order(),
            self.hedge.cancel_order(),
        );
    }

    /// Run one cycle: transfer check, parallel sync, signal evaluation, leg
    /// management, hedge rebalance, transfer trigger, persist. A no-op when
    /// not `Active`.
    pub async fn step(&mut self) {
        if self.status != EngineStatus::Active {
            return;
        }

        if self.poll_transfer_completion().await {
            self.persist();
            return;
        }

        tokio::join!(
            self.source.sync_with_exchange(),
            self.dest.sync_with_exchange(),
            self.hedge.sync_with_exchange(),
        );

        let signal = self.evaluate_signal().await;

        match (self.current_role, signal) {
            (ActiveRole::Source, Signal::Enter) => self.manage_source().await,
            (ActiveRole::Dest, Signal::Exit) => self.manage_dest().await,
            _ => {}
        }

        self.rebalance_hedge().await;
        self.maybe_initiate_transfer().await;
        self.persist();
    }

    /// `true` if a transfer is in flight and this cycle should skip trading.
    async fn poll_transfer_completion(&mut self) -> bool {
        let Some(monitor) = self.transfer_monitor.as_mut() else {
            return false;
        };

        match monitor.rx.try_recv() {
            Ok(update) => {
                self.transfer_request = Some(update.clone());
                if update.completed {
                    self.finish_transfer_monitor().await;
                    self.handle_completed_transfer(update).await;
                } else if !update.in_progress {
                    error!(
                        transfer_id = update.transfer_id,
                        "transfer failed, clearing for manual reconciliation"
                    );
                    self.finish_transfer_monitor().await;
                    self.transfer_request = None;
                }
                true
            }
            Err(mpsc::error::TryRecvError::Empty) => true,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.finish_transfer_monitor().await;
                true
            }
        }
    }

    async fn finish_transfer_monitor(&mut self) {
        if let Some(monitor) = self.transfer_monitor.take() {
            let _ = monitor.join.await;
        }
    }

    async fn handle_completed_transfer(&mut self, request: TransferRequest) {
        self.transfer_request = None;

        if request.is_base_asset(&self.symbol.base) {
            self.current_role = ActiveRole::Dest;
            self.dest.seed_position(Side::Buy, request.qty, request.buy_price);
            info!(
                role = %self.current_role,
                qty = %request.qty,
                price = %request.buy_price,
                "base transfer completed, switching to release phase"
            );
        } else {
            self.current_role = ActiveRole::Source;
            let cycle_pnl_net = self.source.position().pnl_tracker.pnl_usdt_net()
                + self.dest.position().pnl_tracker.pnl_usdt_net()
                + self.hedge.position().pnl_tracker.pnl_usdt_net();
            info!(cycle_pnl_net, "full arbitrage cycle completed, starting next cycle");
            self.source.reset_for_new_cycle(self.total_quantity);
            self.dest.reset_for_new_cycle(self.total_quantity);
            self.hedge.reset_for_new_cycle(self.total_quantity);
        }
    }

    async fn maybe_initiate_transfer(&mut self) {
        if self.transfer_monitor.is_some() {
            return;
        }

        match self.current_role {
            ActiveRole::Source => {
                if self.source.remaining_qty().is_positive() {
                    return;
                }
                let qty = self.source.position().qty;
                if !qty.is_positive() {
                    return;
                }
                let price = self.source.position().price;
                let from_handle = Arc::clone(&self.source_handle);
                let asset = self.symbol.base.clone();
                let dest_venue = self.dest.settings().venue.clone();
                self.begin_transfer(&from_handle, &asset, &dest_venue, qty, price).await;
            }
            ActiveRole::Dest => {
                if self.dest.position().qty.is_positive() {
                    return; // still releasing
                }
                let quote_qty = match self.dest_handle.get_asset_balance(&self.symbol.quote).await {
                    Ok(qty) if qty.is_positive() => qty,
                    _ => return,
                };
                let from_handle = Arc::clone(&self.dest_handle);
                let asset = self.symbol.quote.clone();
                let source_venue = self.source.settings().venue.clone();
                self.begin_transfer(&from_handle, &asset, &source_venue, quote_qty, Px::ZERO)
                    .await;
            }
        }
    }

    async fn begin_transfer(
        &mut self,
        from_handle: &Arc<dyn ExchangeHandle>,
        asset: &str,
        dest_venue: &str,
        qty: Qty,
        buy_price: Px,
    ) {
        let mgr = Arc::new(TransferManager::new(Arc::clone(from_handle)));
        match mgr.transfer_asset(asset, dest_venue, qty, buy_price).await {
            Ok(request) => {
                let (join, rx) = Arc::clone(&mgr).spawn_monitor(request.clone());
                self.transfer_monitor = Some(TransferMonitor { join, rx });
                self.transfer_request = Some(request);
            }
            Err(err) => {
                error!(asset, dest_venue, error = %err, "failed to initiate transfer");
            }
        }
    }

    async fn evaluate_signal(&mut self) -> Signal {
        let (source_book, dest_book, hedge_book) = tokio::join!(
            self.source_handle.book_ticker(&self.symbol),
            self.dest_handle.book_ticker(&self.symbol),
            self.hedge_handle.book_ticker(&self.symbol),
        );

        let (Ok(source_book), Ok(dest_book), Ok(hedge_book)) = (source_book, dest_book, hedge_book)
        else {
            warn!("book ticker unavailable for one or more legs, holding this cycle");
            return Signal::Hold;
        };

        let now = Ts::now();
        let fresh = is_fresh(source_book.timestamp, now, STALE_QUOTE_NANOS)
            && is_fresh(dest_book.timestamp, now, STALE_QUOTE_NANOS)
            && is_fresh(hedge_book.timestamp, now, STALE_QUOTE_NANOS);
        if !fresh {
            debug!("stale book ticker, holding this cycle");
            return Signal::Hold;
        }

        let execution_cost = execution_spread_cost(&source_book, &dest_book, &hedge_book);

        match self.current_role {
            ActiveRole::Source => {
                let spread = source_vs_hedge_spread(&source_book, &hedge_book);
                self.source_hedge_spreads.record_if_due(spread, now);
                self.signal_gate
                    .evaluate(self.source_hedge_spreads.history(), spread, execution_cost, true)
            }
            ActiveRole::Dest => {
                let spread = dest_vs_hedge_spread(&dest_book, &hedge_book);
                self.dest_hedge_spreads.record_if_due(spread, now);
                self.signal_gate.evaluate(
                    self.dest_hedge_spreads.history(),
                    spread,
                    execution_cost,
                    false,
                )
            }
        }
    }

    async fn manage_source(&mut self) {
        let remaining = self.source.remaining_qty();
        if !remaining.is_positive() {
            return;
        }
        let hedge_handle = Arc::clone(&self.hedge_handle);
        let order_qty = self.order_qty;
        let symbol = self.symbol.clone();
        Self::place_leg_order(
            &mut self.source,
            &self.source_handle,
            &hedge_handle,
            &symbol,
            Side::Buy,
            remaining,
            order_qty,
        )
        .await;
    }

    async fn manage_dest(&mut self) {
        let remaining = self.dest.position().qty;
        if !remaining.is_positive() {
            return;
        }
        let hedge_handle = Arc::clone(&self.hedge_handle);
        let order_qty = self.order_qty;
        let symbol = self.symbol.clone();
        Self::place_leg_order(
            &mut self.dest,
            &self.dest_handle,
            &hedge_handle,
            &symbol,
            Side::Sell,
            remaining,
            order_qty,
        )
        .await;
    }

    /// Shared sizing/placement path for the source and dest legs: fee-net the
    /// remaining quantity, then either fill at market against both books'
    /// top-of-book depth or rest a trailing limit order.
    async fn place_leg_order(
        manager: &mut PositionManager,
        handle: &Arc<dyn ExchangeHandle>,
        hedge_handle: &Arc<dyn ExchangeHandle>,
        symbol: &Symbol,
        side: Side,
        remaining: Qty,
        order_qty: Qty,
    ) {
        let taker_fee = manager.fees().taker_fee;
        let fee_adjusted_remaining =
            Qty::new((remaining.as_f64() - remaining.as_f64() * taker_fee * 2.0).max(0.0));
        if !fee_adjusted_remaining.is_positive() {
            return;
        }

        let Ok(book) = handle.book_ticker(symbol).await else {
            warn!(venue = manager.settings().venue.as_str(), "book ticker unavailable, skipping leg this cycle");
            return;
        };

        let use_market = manager.settings().use_market;
        let min_qty = manager.symbol_info().abs_min_qty(book.bid_price);

        if use_market {
            let Ok(hedge_book) = hedge_handle.book_ticker(symbol).await else {
                return;
            };
            let hedge_top_qty = match side {
                Side::Buy => hedge_book.bid_qty,
                Side::Sell => hedge_book.ask_qty,
            };
            let curr_top_qty = match side {
                Side::Buy => book.ask_qty,
                Side::Sell => book.bid_qty,
            };
            let market_qty = manager
                .symbol_info()
                .round_to_contracts(fee_adjusted_remaining.min(hedge_top_qty).min(curr_top_qty));
            if market_qty.as_i64() < min_qty.as_i64() {
                debug!(
                    venue = manager.settings().venue.as_str(),
                    available = %market_qty,
                    required = %min_qty,
                    "insufficient top-of-book depth for market order"
                );
                return;
            }
            let order_price = match side {
                Side::Buy => hedge_book.ask_price,
                Side::Sell => hedge_book.bid_price,
            };
            manager.place_order(side, market_qty, order_price, true).await;
            return;
        }

        let tick_size = manager.symbol_info().tick_size;
        let top_price = match side {
            Side::Buy => book.bid_price,
            Side::Sell => book.ask_price,
        };
        if top_price.is_zero() {
            return;
        }

        let settings = manager.settings().clone();
        let offset_pct = tick_pct(settings.tick_offset.unsigned_abs(), tick_size, top_price);
        let trail_pct = tick_pct(settings.tick_tolerance, tick_size, top_price);
        let slice = manager
            .symbol_info()
            .round_to_contracts(order_qty.min(fee_adjusted_remaining));
        if slice.as_i64() < min_qty.as_i64() {
            debug!(
                venue = manager.settings().venue.as_str(),
                slice = %slice,
                required = %min_qty,
                "slice below exchange minimum after contract rounding, skipping"
            );
            return;
        }

        manager
            .place_trailing_limit_order(side, slice, top_price, offset_pct, trail_pct)
            .await;
    }

    async fn rebalance_hedge(&mut self) {
        let source_qty = self.source.position().qty;
        let dest_qty = self.dest.position().qty;
        let hedge_qty = self.hedge.position().qty;

        let in_flight_base_qty = match &self.transfer_request {
            Some(request) if request.is_base_asset(&self.symbol.base) => request.qty,
            _ => Qty::ZERO,
        };

        let delta = hedge::hedge_delta(source_qty.add(dest_qty), in_flight_base_qty, hedge_qty);

        let Ok(hedge_book) = self.hedge_handle.book_ticker(&self.symbol).await else {
            return;
        };
        let min_qty = self.hedge.symbol_info().abs_min_qty(hedge_book.bid_price);

        let Some(action) = hedge::hedge_correction(delta, min_qty) else {
            return;
        };
        let action = match action {
            HedgeAction::Sell(qty) => HedgeAction::Sell(self.hedge.symbol_info().round_to_contracts(qty)),
            HedgeAction::Buy(qty) => HedgeAction::Buy(self.hedge.symbol_info().round_to_contracts(qty)),
        };
        let corrected_qty = match action {
            HedgeAction::Sell(qty) | HedgeAction::Buy(qty) => qty,
        };
        if corrected_qty.as_i64() < min_qty.as_i64() {
            debug!(
                venue = self.hedge.settings().venue.as_str(),
                corrected_qty = %corrected_qty,
                required = %min_qty,
                "hedge correction below exchange minimum after contract rounding, skipping"
            );
            return;
        }

        info!(
            delta = %delta,
            source = %source_qty,
            dest = %dest_qty,
            hedge = %hedge_qty,
            "hedge imbalance detected, correcting"
        );

        match action {
            HedgeAction::Sell(qty) => {
                self.hedge.place_order(Side::Sell, qty, hedge_book.bid_price, true).await;
            }
            HedgeAction::Buy(qty) => {
                self.hedge.place_order(Side::Buy, qty, hedge_book.ask_price, true).await;
            }
        }
    }

    fn persist(&self) {
        (self.save_callback)(&self.snapshot());
    }

    /// Build a point-in-time serializable snapshot of the whole engine.
    #[must_use]
    pub fn snapshot(&self) -> ArbitrageContext {
        ArbitrageContext {
            symbol: self.symbol.clone(),
            total_quantity: self.total_quantity,
            order_qty: self.order_qty,
            min_profit_margin: self.min_profit_margin,
            max_acceptable_spread: self.max_acceptable_spread,
            current_role: self.current_role,
            status: self.status,
            source: self.source.position().clone(),
            dest: self.dest.position().clone(),
            hedge: self.hedge.position().clone(),
            settings: self.leg_settings_map(),
            transfer_request: self.transfer_request.clone(),
        }
    }

    fn leg_settings_map(&self) -> HashMap<String, LegSettings> {
        let mut map = HashMap::with_capacity(3);
        map.insert("source".to_string(), self.source.settings().clone());
        map.insert("dest".to_string(), self.dest.settings().clone());
        map.insert("hedge".to_string(), self.hedge.settings().clone());
        map
    }
}

fn tick_pct(ticks: u32, tick_size: Px, top_price: Px) -> f64 {
    if top_price.is_zero() {
        return 0.0;
    }
    f64::from(ticks) * tick_size.as_f64() / top_price.as_f64() * 100.0
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use arb_common::{BookTicker, Fees, SymbolInfo};
    use exchange_gateway::fake::{FakeExchange, FillMode};
    use signal_gate::SpreadStats;

    use super::*;

    struct FixedAnalyzer {
        signal: Signal,
    }

    impl SpreadAnalyzer for FixedAnalyzer {
        fn analyze(&self, _historical: &[f64], current: f64) -> (Signal, SpreadStats) {
            (
                self.signal,
                SpreadStats { current, mean: current, min_25pct: current, max_25pct: current },
            )
        }
    }

    fn symbol() -> Symbol {
        Symbol::new("BTC", "USDT")
    }

    fn symbol_info() -> SymbolInfo {
        SymbolInfo {
            tick_size: Px::new(0.1),
            min_base_qty: Qty::new(0.001),
            min_quote_qty: Qty::new(5.0),
            contract_multiplier: 1.0,
        }
    }

    async fn seeded_venue(venue: &str, bid: f64, ask: f64) -> Arc<FakeExchange> {
        let ex = Arc::new(FakeExchange::new(venue, false));
        ex.set_symbol_info(symbol(), symbol_info()).await;
        ex.set_fees(symbol(), Fees { maker_fee: 0.0004, taker_fee: 0.0006 }).await;
        ex.set_book(
            symbol(),
            BookTicker { bid_price: Px::new(bid), bid_qty: Qty::new(10.0), ask_price: Px::new(ask), ask_qty: Qty::new(10.0), timestamp: Ts::now() },
        )
        .await;
        ex.set_fill_mode(FillMode::FullFill).await;
        ex
    }

    fn engine_config() -> EngineConfig {
        let mut settings = HashMap::new();
        settings.insert("source".to_string(), LegSettings { venue: "v1".into(), use_market: true, ..Default::default() });
        settings.insert("dest".to_string(), LegSettings { venue: "v2".into(), use_market: true, ..Default::default() });
        settings.insert("hedge".to_string(), LegSettings { venue: "v3".into(), use_market: true, ..Default::default() });
        EngineConfig {
            symbol: symbol(),
            total_quantity: 1.0,
            order_qty: 0.25,
            min_profit_margin: 0.1,
            max_acceptable_spread: 0.2,
            settings,
        }
    }

    async fn build_coordinator() -> (
        ArbitrageCoordinator<FixedAnalyzer>,
        Arc<FakeExchange>,
        Arc<FakeExchange>,
        Arc<FakeExchange>,
    ) {
        let source = seeded_venue("v1", 99.9, 100.0).await;
        let dest = seeded_venue("v2", 100.1, 100.2).await;
        let hedge = seeded_venue("v3", 100.0, 100.1).await;

        let coordinator = ArbitrageCoordinator::start(
            engine_config(),
            Arc::clone(&source) as Arc<dyn ExchangeHandle>,
            Arc::clone(&dest) as Arc<dyn ExchangeHandle>,
            Arc::clone(&hedge) as Arc<dyn ExchangeHandle>,
            FixedAnalyzer { signal: Signal::Enter },
            None,
            (vec![0.05; 60], vec![0.05; 60]),
            Arc::new(|_: &ArbitrageContext| {}),
        )
        .await
        .unwrap();

        (coordinator, source, dest, hedge)
    }

    #[rstest::rstest]
    #[case::zero_price_is_zero(5, Px::new(1.0), Px::ZERO, 0.0)]
    #[case::one_tick_on_round_price(1, Px::new(0.01), Px::new(100.0), 0.01)]
    #[case::ten_ticks_scales_linearly(10, Px::new(0.01), Px::new(100.0), 0.1)]
    #[case::zero_ticks_is_zero(0, Px::new(0.01), Px::new(100.0), 0.0)]
    fn tick_pct_scales_with_tick_count_and_price(
        #[case] ticks: u32,
        #[case] tick_size: Px,
        #[case] top_price: Px,
        #[case] expected: f64,
    ) {
        assert!((tick_pct(ticks, tick_size, top_price) - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn starts_inactive_and_source_role_when_nothing_restored() {
        let (coordinator, ..) = build_coordinator().await;
        assert_eq!(coordinator.status(), EngineStatus::Inactive);
        assert_eq!(coordinator.current_role(), ActiveRole::Source);
    }

    #[tokio::test]
    async fn inactive_step_does_not_place_orders() {
        let (mut coordinator, source, ..) = build_coordinator().await;
        coordinator.step().await;
        let order = source.fetch_order(&symbol(), &arb_common::OrderId("fake-1".into())).await;
        assert!(order.is_err());
    }

    #[tokio::test]
    async fn active_step_accumulates_source_leg() {
        let (mut coordinator, ..) = build_coordinator().await;
        coordinator.activate();
        coordinator.step().await;
        let snapshot = coordinator.snapshot();
        assert!(snapshot.source.qty.is_positive());
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_serde_json() {
        let (mut coordinator, ..) = build_coordinator().await;
        coordinator.activate();
        coordinator.step().await;
        let snapshot = coordinator.snapshot();
        let encoded = serde_json::to_string(&snapshot).unwrap();
        let decoded: ArbitrageContext = serde_json::from_str(&encoded).unwrap();
        pretty_assertions::assert_eq!(snapshot, decoded);
    }

    #[tokio::test]
    async fn restoring_a_dest_heavy_context_resumes_in_dest_role() {
        let (coordinator, ..) = build_coordinator().await;
        let mut restored = coordinator.snapshot();
        restored.current_role = ActiveRole::Dest;
        restored.dest.qty = Qty::new(0.5);
        restored.dest.side = Some(Side::Buy);
        restored.dest.price = Px::new(100.0);
        restored.status = EngineStatus::Active;

        let source = seeded_venue("v1", 99.9, 100.0).await;
        let dest = seeded_venue("v2", 100.1, 100.2).await;
        let hedge = seeded_venue("v3", 100.0, 100.1).await;

        let resumed = ArbitrageCoordinator::start(
            engine_config(),
            Arc::clone(&source) as Arc<dyn ExchangeHandle>,
            Arc::clone(&dest) as Arc<dyn ExchangeHandle>,
            Arc::clone(&hedge) as Arc<dyn ExchangeHandle>,
            FixedAnalyzer { signal: Signal::Exit },
            Some(restored),
            (Vec::new(), Vec::new()),
            Arc::new(|_: &ArbitrageContext| {}),
        )
        .await
        .unwrap();

        assert_eq!(resumed.current_role(), ActiveRole::Dest);
        assert_eq!(resumed.status(), EngineStatus::Active);
    }

    #[tokio::test]
    async fn hedge_rebalance_places_a_correcting_order() {
        let (mut coordinator, ..) = build_coordinator().await;
        coordinator.activate();
        // First step enters the source leg at market, creating imbalance.
        coordinator.step().await;
        coordinator.rebalance_hedge().await;
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.hedge.qty, snapshot.source.qty);
    }
}
