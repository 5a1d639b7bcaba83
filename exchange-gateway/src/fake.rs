//! In-memory exchange double for tests.
//!
//! Deterministic, single-venue, no network. Downstream crates depend on this
//! under `#[cfg(any(test, feature = "testing"))]` to exercise the position
//! and coordinator logic without a real REST/WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arb_common::{
    BookTicker, ExchangeError, ExchangeResult, Fees, Order, OrderId, OrderStatus, Px, Qty, Side,
    Symbol, SymbolInfo, Ts,
};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ExchangeHandle, FuturesPosition, WithdrawalStatus};

#[derive(Debug, Clone)]
struct FakeState {
    balances: HashMap<String, Qty>,
    futures_position: FuturesPosition,
    book: HashMap<Symbol, BookTicker>,
    symbol_info: HashMap<Symbol, SymbolInfo>,
    fees: HashMap<Symbol, Fees>,
    orders: HashMap<OrderId, Order>,
    withdrawals: HashMap<String, WithdrawalStatus>,
    next_fill: FillMode,
    reject_withdrawals: bool,
}

/// Controls how [`FakeExchange::place_order`] resolves a new order, so tests
/// can exercise the full/partial/insufficient-balance paths deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Order fills immediately for its full requested quantity.
    FullFill,
    /// Order is accepted but left in `New` status (caller must fill it via
    /// [`FakeExchange::push_fill`]).
    NoFill,
    /// Placement fails with `InsufficientBalance`.
    RejectInsufficientBalance,
}

/// A hand-rolled [`ExchangeHandle`] backed by in-memory maps.
pub struct FakeExchange {
    venue: String,
    is_futures: bool,
    state: Arc<RwLock<FakeState>>,
    order_seq: AtomicU64,
}

impl FakeExchange {
    /// Build a fake venue. `is_futures` controls which position-read path
    /// [`ExchangeHandle`] callers should exercise.
    #[must_use]
    pub fn new(venue: impl Into<String>, is_futures: bool) -> Self {
        Self {
            venue: venue.into(),
            is_futures,
            state: Arc::new(RwLock::new(FakeState {
                balances: HashMap::new(),
                futures_position: FuturesPosition::FLAT,
                book: HashMap::new(),
                symbol_info: HashMap::new(),
                fees: HashMap::new(),
                orders: HashMap::new(),
                withdrawals: HashMap::new(),
                next_fill: FillMode::FullFill,
                reject_withdrawals: false,
            })),
            order_seq: AtomicU64::new(1),
        }
    }

    /// Seed the book ticker a later `book_ticker` call returns.
    pub async fn set_book(&self, symbol: Symbol, ticker: BookTicker) {
        self.state.write().await.book.insert(symbol, ticker);
    }

    /// Seed symbol info.
    pub async fn set_symbol_info(&self, symbol: Symbol, info: SymbolInfo) {
        self.state.write().await.symbol_info.insert(symbol, info);
    }

    /// Seed fee rates.
    pub async fn set_fees(&self, symbol: Symbol, fees: Fees) {
        self.state.write().await.fees.insert(symbol, fees);
    }

    /// Seed a spot asset balance.
    pub async fn set_balance(&self, asset: impl Into<String>, qty: Qty) {
        self.state.write().await.balances.insert(asset.into(), qty);
    }

    /// Seed the futures position.
    pub async fn set_futures_position(&self, position: FuturesPosition) {
        self.state.write().await.futures_position = position;
    }

    /// Control how the next `place_order` call resolves.
    pub async fn set_fill_mode(&self, mode: FillMode) {
        self.state.write().await.next_fill = mode;
    }

    /// Push an incremental fill onto a previously placed order, as a WebSocket
    /// order-update stream would.
    pub async fn push_fill(&self, order_id: &OrderId, filled_qty: Qty, status: OrderStatus) {
        let mut state = self.state.write().await;
        if let Some(order) = state.orders.get_mut(order_id) {
            order.filled_qty = filled_qty;
            order.status = status;
            order.timestamp = Ts::now();
        }
    }

    /// Mark a withdrawal as completed, as a background poll would observe.
    pub async fn complete_withdrawal(&self, transfer_id: &str) {
        self.state
            .write()
            .await
            .withdrawals
            .insert(transfer_id.to_string(), WithdrawalStatus::Completed);
    }

    /// Mark a withdrawal as failed, as a background poll would observe.
    pub async fn fail_withdrawal(&self, transfer_id: &str) {
        self.state
            .write()
            .await
            .withdrawals
            .insert(transfer_id.to_string(), WithdrawalStatus::Failed);
    }

    /// Make the next `submit_withdrawal` call fail, as a venue rejecting a
    /// withdrawal (e.g. below minimum, network unsupported) would.
    pub async fn set_reject_withdrawals(&self, reject: bool) {
        self.state.write().await.reject_withdrawals = reject;
    }

    fn next_order_id(&self) -> OrderId {
        let n = self.order_seq.fetch_add(1, Ordering::Relaxed);
        OrderId(format!("fake-{n}"))
    }
}

#[async_trait]
impl ExchangeHandle for FakeExchange {
    fn venue(&self) -> &str {
        &self.venue
    }

    fn is_futures(&self) -> bool {
        self.is_futures
    }

    async fn load_symbol_info(&self, symbol: &Symbol) -> ExchangeResult<SymbolInfo> {
        self.state
            .read()
            .await
            .symbol_info
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::Transport {
                venue: self.venue.clone(),
                source: anyhow::anyhow!("no symbol info seeded for {symbol}"),
            })
    }

    async fn load_fees(&self, symbol: &Symbol) -> ExchangeResult<Fees> {
        self.state
            .read()
            .await
            .fees
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::Transport {
                venue: self.venue.clone(),
                source: anyhow::anyhow!("no fees seeded for {symbol}"),
            })
    }

    async fn book_ticker(&self, symbol: &Symbol) -> ExchangeResult<BookTicker> {
        self.state
            .read()
            .await
            .book
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::Transport {
                venue: self.venue.clone(),
                source: anyhow::anyhow!("no book ticker seeded for {symbol}"),
            })
    }

    async fn place_order(
        &self,
        symbol: &Symbol,
        side: Side,
        qty: Qty,
        price: Px,
        is_market: bool,
    ) -> ExchangeResult<Order> {
        let mut state = self.state.write().await;
        if state.next_fill == FillMode::RejectInsufficientBalance {
            return Err(ExchangeError::InsufficientBalance {
                venue: self.venue.clone(),
                symbol: symbol.to_string(),
                reason: "fake insufficient balance".to_string(),
            });
        }
        let order_id = self.next_order_id();
        let (filled_qty, status) = match state.next_fill {
            FillMode::FullFill => (qty, OrderStatus::Filled),
            FillMode::NoFill => (Qty::ZERO, OrderStatus::New),
            FillMode::RejectInsufficientBalance => unreachable!(),
        };
        let order = Order {
            order_id: order_id.clone(),
            symbol: symbol.clone(),
            side,
            price,
            requested_qty: qty,
            filled_qty,
            status,
            timestamp: Ts::now(),
        };
        let _ = is_market;
        state.orders.insert(order_id, order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, _symbol: &Symbol, order_id: &OrderId) -> ExchangeResult<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound {
                venue: self.venue.clone(),
                order_id: order_id.0.clone(),
            })?;
        if !order.status.is_terminal() {
            order.status = OrderStatus::Cancelled;
            order.timestamp = Ts::now();
        }
        Ok(order.clone())
    }

    async fn fetch_order(&self, _symbol: &Symbol, order_id: &OrderId) -> ExchangeResult<Order> {
        self.state
            .read()
            .await
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| ExchangeError::OrderNotFound {
                venue: self.venue.clone(),
                order_id: order_id.0.clone(),
            })
    }

    async fn get_asset_balance(&self, asset: &str) -> ExchangeResult<Qty> {
        Ok(self
            .state
            .read()
            .await
            .balances
            .get(asset)
            .copied()
            .unwrap_or(Qty::ZERO))
    }

    async fn get_futures_position(&self, _symbol: &Symbol) -> ExchangeResult<FuturesPosition> {
        Ok(self.state.read().await.futures_position)
    }

    async fn submit_withdrawal(
        &self,
        asset: &str,
        _qty: Qty,
        _destination_venue: &str,
    ) -> ExchangeResult<String> {
        let mut state = self.state.write().await;
        if state.reject_withdrawals {
            return Err(ExchangeError::Transport {
                venue: self.venue.clone(),
                source: anyhow::anyhow!("withdrawals of {asset} disabled"),
            });
        }
        let id = format!("xfer-{}", self.order_seq.fetch_add(1, Ordering::Relaxed));
        state.withdrawals.insert(id.clone(), WithdrawalStatus::Pending);
        Ok(id)
    }

    async fn query_withdrawal(&self, transfer_id: &str) -> ExchangeResult<WithdrawalStatus> {
        Ok(self
            .state
            .read()
            .await
            .withdrawals
            .get(transfer_id)
            .copied()
            .unwrap_or(WithdrawalStatus::Failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn place_order_full_fill_round_trips_through_fetch() {
        let ex = FakeExchange::new("fake_spot", false);
        let symbol = Symbol::new("BTC", "USDT");
        let order = ex
            .place_order(&symbol, Side::Buy, Qty::new(0.05), Px::new(30_000.0), false)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        let fetched = ex.fetch_order(&symbol, &order.order_id).await.unwrap();
        assert_eq!(fetched.filled_qty, Qty::new(0.05));
    }

    #[tokio::test]
    async fn insufficient_balance_is_reported() {
        let ex = FakeExchange::new("fake_spot", false);
        ex.set_fill_mode(FillMode::RejectInsufficientBalance).await;
        let symbol = Symbol::new("BTC", "USDT");
        let result = ex
            .place_order(&symbol, Side::Buy, Qty::new(1.0), Px::new(30_000.0), false)
            .await;
        assert!(matches!(result, Err(ExchangeError::InsufficientBalance { .. })));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let ex = FakeExchange::new("fake_spot", false);
        ex.set_fill_mode(FillMode::NoFill).await;
        let symbol = Symbol::new("BTC", "USDT");
        let order = ex
            .place_order(&symbol, Side::Buy, Qty::new(0.05), Px::new(30_000.0), false)
            .await
            .unwrap();
        let first = ex.cancel_order(&symbol, &order.order_id).await.unwrap();
        let second = ex.cancel_order(&symbol, &order.order_id).await.unwrap();
        assert_eq!(first.status, OrderStatus::Cancelled);
        assert_eq!(second.status, first.status);
    }

    #[rstest::rstest]
    #[case::full_fill(FillMode::FullFill, Qty::new(0.05), OrderStatus::Filled)]
    #[case::no_fill(FillMode::NoFill, Qty::ZERO, OrderStatus::New)]
    #[tokio::test]
    async fn fill_mode_governs_placed_order_outcome(
        #[case] mode: FillMode,
        #[case] expected_filled: Qty,
        #[case] expected_status: OrderStatus,
    ) {
        let ex = FakeExchange::new("fake_spot", false);
        ex.set_fill_mode(mode).await;
        let symbol = Symbol::new("BTC", "USDT");
        let order = ex
            .place_order(&symbol, Side::Buy, Qty::new(0.05), Px::new(30_000.0), false)
            .await
            .unwrap();
        assert_eq!(order.filled_qty, expected_filled);
        assert_eq!(order.status, expected_status);
    }
}
