//! `PositionManager`: binds one `PositionData` to one exchange handle.

use std::sync::Arc;

use arb_common::{ExchangeError, Fees, LegSettings, Order, Px, Qty, Side, Symbol, SymbolInfo};
use exchange_gateway::ExchangeHandle;
use tracing::{debug, error, info, warn};

use crate::error::PositionManagerError;
use crate::position_data::{PositionChange, PositionData};

/// Invoked after every mutation of `PositionData`, so the host can persist the
/// opaque context snapshot.
pub type SaveCallback = Arc<dyn Fn(&PositionData) + Send + Sync>;

/// Invoked when a fill actually moved the position, distinct from the save
/// callback so hedge logic can react without re-deriving the delta from state.
pub type OnOrderFilledCallback = Arc<dyn Fn(&Order, &PositionChange) + Send + Sync>;

/// Reconciles one leg's `PositionData` against one exchange, handling order
/// placement, cancellation, fill tracking, and out-of-order suppression.
pub struct PositionManager {
    handle: Arc<dyn ExchangeHandle>,
    symbol: Symbol,
    settings: LegSettings,
    symbol_info: SymbolInfo,
    fees: Fees,
    position: PositionData,
    save_callback: SaveCallback,
    on_order_filled: Option<OnOrderFilledCallback>,
}

impl PositionManager {
    /// Bring up a manager for one leg: load symbol info and fees, seed the
    /// position from the exchange (or from a restored snapshot), force-refresh
    /// the book ticker, and re-establish ground truth on any restored in-flight
    /// order.
    pub async fn initialize(
        handle: Arc<dyn ExchangeHandle>,
        symbol: Symbol,
        settings: LegSettings,
        target_qty: Qty,
        restored_position: Option<PositionData>,
        save_callback: SaveCallback,
        on_order_filled: Option<OnOrderFilledCallback>,
    ) -> Result<Self, PositionManagerError> {
        let venue = settings.venue.clone();

        let symbol_info = handle
            .load_symbol_info(&symbol)
            .await
            .map_err(|source| PositionManagerError::SymbolInfoUnavailable {
                venue: venue.clone(),
                symbol: symbol.to_string(),
                source,
            })?;

        let fees = handle
            .load_fees(&symbol)
            .await
            .map_err(|source| PositionManagerError::FeesUnavailable {
                venue: venue.clone(),
                symbol: symbol.to_string(),
                source,
            })?;

        let mut position = match restored_position {
            Some(restored) => restored,
            None => Self::seed_fresh_position(&handle, &symbol, target_qty).await?,
        };
        position.target_qty = target_qty;

        // Force-refresh the book ticker so the first cycle never decides off a
        // stale snapshot carried over from construction.
        if let Err(err) = handle.book_ticker(&symbol).await {
            warn!(venue = %venue, symbol = %symbol, error = %err, "initial book ticker refresh failed");
        }

        let mut manager = Self {
            handle,
            symbol,
            settings,
            symbol_info,
            fees,
            position,
            save_callback,
            on_order_filled,
        };

        if manager.position.last_order.is_some() {
            manager.sync_with_exchange().await;
        }

        Ok(manager)
    }

    async fn seed_fresh_position(
        handle: &Arc<dyn ExchangeHandle>,
        symbol: &Symbol,
        target_qty: Qty,
    ) -> Result<PositionData, PositionManagerError> {
        let venue = handle.venue().to_string();
        let mut position = PositionData::new(target_qty);

        let (seeded_qty, seeded_side, seeded_price) = if handle.is_futures() {
            let futures_position = handle
                .get_futures_position(symbol)
                .await
                .map_err(|source| PositionManagerError::InitialPositionUnavailable {
                    venue: venue.clone(),
                    source,
                })?;
            (futures_position.qty, futures_position.side, futures_position.entry_price)
        } else {
            let base_qty = handle
                .get_asset_balance(&symbol.base)
                .await
                .map_err(|source| PositionManagerError::InitialPositionUnavailable {
                    venue: venue.clone(),
                    source,
                })?;
            let side = if base_qty.is_positive() { Some(Side::Buy) } else { None };
            (base_qty, side, Px::ZERO)
        };

        if seeded_qty.is_positive() {
            position.qty = seeded_qty;
            position.side = seeded_side;
            position.price = seeded_price;

            if position.price.is_zero() {
                if let Ok(book) = handle.book_ticker(symbol).await {
                    position.price = match position.side {
                        Some(Side::Buy) => book.ask_price,
                        Some(Side::Sell) => book.bid_price,
                        None => Px::ZERO,
                    };
                }
            }
        }

        Ok(position)
    }

    /// Current position snapshot.
    #[must_use]
    pub fn position(&self) -> &PositionData {
        &self.position
    }

    /// Cached symbol metadata (tick size, minimums, contract multiplier).
    #[must_use]
    pub fn symbol_info(&self) -> &SymbolInfo {
        &self.symbol_info
    }

    /// Cached maker/taker fee rates.
    #[must_use]
    pub fn fees(&self) -> &Fees {
        &self.fees
    }

    /// Leg settings this manager was configured with.
    #[must_use]
    pub fn settings(&self) -> &LegSettings {
        &self.settings
    }

    /// `true` once the position is within the venue's minimum quantity of
    /// `target_qty`.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        let min_qty = self.symbol_info.abs_min_qty(self.position.price);
        self.position.is_fulfilled(min_qty)
    }

    /// Quantity still needed to reach target, floored to zero below the
    /// venue's minimum.
    #[must_use]
    pub fn remaining_qty(&self) -> Qty {
        let min_qty = self.symbol_info.abs_min_qty(self.position.price);
        self.position.remaining_qty(min_qty)
    }

    /// Place an order for this leg. Returns the placed order on success. On
    /// insufficient-balance rejection, snaps the position to its target
    /// (treating the leg as complete) and returns `None`; on any other
    /// failure, logs and returns `None`.
    pub async fn place_order(
        &mut self,
        side: Side,
        qty: Qty,
        price: Px,
        is_market: bool,
    ) -> Option<Order> {
        match self.handle.place_order(&self.symbol, side, qty, price, is_market).await {
            Ok(order) => {
                info!(
                    venue = %self.settings.venue,
                    symbol = %self.symbol,
                    side = %side,
                    qty = %qty,
                    price = %price,
                    order_id = %order.order_id,
                    "order placed"
                );
                self.track_order_execution(order.clone());
                Some(order)
            }
            Err(ExchangeError::InsufficientBalance { reason, .. }) => {
                warn!(
                    venue = %self.settings.venue,
                    symbol = %self.symbol,
                    reason = %reason,
                    "insufficient balance, snapping leg to target"
                );
                self.position.qty = self.position.target_qty;
                self.position.last_order = None;
                if let Err(err) = self.reload_quantity().await {
                    debug!(venue = %self.settings.venue, error = %err, "post-snap reload failed, relying on next sync");
                }
                (self.save_callback)(&self.position);
                None
            }
            Err(err) => {
                error!(venue = %self.settings.venue, symbol = %self.symbol, error = %err, "order placement failed");
                None
            }
        }
    }

    async fn reload_quantity(&self) -> Result<Qty, ExchangeError> {
        if self.handle.is_futures() {
            self.handle.get_futures_position(&self.symbol).await.map(|p| p.qty)
        } else {
            self.handle.get_asset_balance(&self.symbol.base).await
        }
    }

    /// Cancel this leg's live order, if any. Idempotent and never propagates
    /// an error: cancel failures fall back to `fetch_order` to discover ground
    /// truth before giving up. Returns the authoritative post-cancel order,
    /// useful to callers (e.g. trailing-limit re-pegging) that need to know
    /// whether the order filled during the cancel race.
    pub async fn cancel_order(&mut self) -> Option<Order> {
        let current = self.position.last_order.clone()?;

        let authoritative = match self.handle.cancel_order(&self.symbol, &current.order_id).await {
            Ok(order) => Some(order),
            Err(ExchangeError::OrderNotFound { .. }) => {
                self.handle.fetch_order(&self.symbol, &current.order_id).await.ok()
            }
            Err(err) => {
                warn!(order_id = %current.order_id, error = %err, "cancel failed, fetching ground truth");
                self.handle.fetch_order(&self.symbol, &current.order_id).await.ok()
            }
        };

        match authoritative.clone() {
            Some(order) => self.track_order_execution(order),
            None => self.position.last_order = None,
        }

        authoritative
    }

    /// Drain fresh state for this leg's live order, if any, onto the position.
    pub async fn sync_with_exchange(&mut self) {
        let Some(current) = self.position.last_order.clone() else {
            return;
        };

        match self.handle.fetch_order(&self.symbol, &current.order_id).await {
            Ok(order) => self.track_order_execution(order),
            Err(ExchangeError::OrderNotFound { .. }) => {
                debug!(order_id = %current.order_id, "order not found on sync, clearing");
                self.position.last_order = None;
            }
            Err(err) => {
                warn!(order_id = %current.order_id, error = %err, "sync failed, retrying next cycle");
            }
        }
    }

    /// Re-peg a resting limit order if it has drifted beyond `trail_pct` of
    /// `top_price`. If the cancelled order filled during the race, returns it
    /// directly so the caller can route it straight into hedge/fill handling
    /// without placing a redundant new order.
    pub async fn place_trailing_limit_order(
        &mut self,
        side: Side,
        qty: Qty,
        top_price: Px,
        top_offset_pct: f64,
        trail_pct: f64,
    ) -> Option<Order> {
        if let Some(current) = self.position.last_order.clone() {
            let drift_pct = if top_price.is_zero() {
                0.0
            } else {
                ((current.price.as_f64() - top_price.as_f64()) / top_price.as_f64()).abs() * 100.0
            };
            if drift_pct <= trail_pct {
                return None;
            }
            if let Some(cancelled) = self.cancel_order().await {
                if cancelled.is_filled() {
                    return Some(cancelled);
                }
            }
        }

        if self.position.last_order.is_some() {
            return None;
        }

        let offset = Px::new(top_price.as_f64() * top_offset_pct / 100.0);
        let limit_price = match side {
            Side::Buy => Px::from_i64(top_price.as_i64() - offset.as_i64()),
            Side::Sell => Px::from_i64(top_price.as_i64() + offset.as_i64()),
        };

        self.place_order(side, qty, limit_price, false).await
    }

    /// Take over inventory that physically moved from another venue via
    /// transfer, without disturbing accumulated PnL history (the position
    /// never actually closed, it just changed venue).
    pub fn seed_position(&mut self, side: Side, qty: Qty, price: Px) {
        self.position.reset(self.position.target_qty, false);
        self.position.update(side, qty, price, 0.0);
        info!(
            venue = %self.settings.venue,
            symbol = %self.symbol,
            side = %side,
            qty = %qty,
            price = %price,
            "position seeded from inbound transfer"
        );
        (self.save_callback)(&self.position);
    }

    /// Reset this leg to flat with a fresh accumulation target and cleared
    /// PnL history, at the start of a new arbitrage cycle.
    pub fn reset_for_new_cycle(&mut self, target_qty: Qty) {
        self.position.reset(target_qty, true);
        (self.save_callback)(&self.position);
    }

    /// Reject out-of-order updates, apply the incremental fill to the
    /// position, and invoke the configured callbacks on a genuine change.
    fn track_order_execution(&mut self, order: Order) {
        if let Some(previous) = &self.position.last_order {
            if !order.supersedes(previous) {
                debug!(order_id = %order.order_id, "dropping out-of-order order update");
                return;
            }
        }

        let previously_filled = self
            .position
            .last_order
            .as_ref()
            .filter(|prev| prev.order_id == order.order_id)
            .map_or(Qty::ZERO, |prev| prev.filled_qty);

        let fill_delta = order.filled_qty.sub(previously_filled);

        if fill_delta.is_positive() {
            // Fee rate applied at fill time; the manager does not distinguish
            // maker/taker execution, so the taker rate is used as the
            // conservative estimate.
            let change = self.position.update(order.side, fill_delta, order.price, self.fees.taker_fee);
            if change.is_changed() {
                (self.save_callback)(&self.position);
                if let Some(callback) = &self.on_order_filled {
                    callback(&order, &change);
                }
            }
        }

        if order.is_done() {
            self.position.last_order = None;
        } else {
            self.position.last_order = Some(order);
        }
    }
}
