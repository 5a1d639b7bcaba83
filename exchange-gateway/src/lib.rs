//! Capability abstraction over a single exchange venue.
//!
//! Position managers never depend on a concrete REST/WebSocket client; they
//! depend only on [`ExchangeHandle`]. Spot and futures venues satisfy the
//! same trait and branch only on [`ExchangeHandle::is_futures`], where the
//! read path genuinely diverges (a unified futures position vs a spot
//! balance).

pub mod fake;

use arb_common::{BookTicker, ExchangeResult, Fees, Order, OrderId, Px, Qty, Side, Symbol, SymbolInfo};
use async_trait::async_trait;

/// Snapshot of a futures position as reported by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuturesPosition {
    /// Absolute position size in base units; zero iff `side` is `None`.
    pub qty: Qty,
    /// Direction of the open position, `None` when flat.
    pub side: Option<Side>,
    /// Weighted-average entry price of the open position.
    pub entry_price: Px,
}

impl FuturesPosition {
    /// The flat position: zero quantity, no side, no price.
    pub const FLAT: Self = Self {
        qty: Qty::ZERO,
        side: None,
        entry_price: Px::ZERO,
    };
}

/// Status of an in-flight inter-venue withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalStatus {
    /// Still being processed by the venue or the destination chain/network.
    Pending,
    /// Funds have landed at the destination.
    Completed,
    /// The venue rejected or failed the withdrawal.
    Failed,
}

/// The fixed set of operations a Position Manager (or Transfer Manager) is
/// allowed to perform against one venue.
#[async_trait]
pub trait ExchangeHandle: Send + Sync {
    /// Operator-facing venue identifier, used only for logging.
    fn venue(&self) -> &str;

    /// `true` for a derivatives venue, where position reads return a single
    /// signed quantity rather than a base-asset balance.
    fn is_futures(&self) -> bool;

    /// Load tick size and minimum order sizes for `symbol`. Cached by the
    /// caller at initialization; not expected to change mid-run.
    async fn load_symbol_info(&self, symbol: &Symbol) -> ExchangeResult<SymbolInfo>;

    /// Load maker/taker fee rates for `symbol`. Cached by the caller at
    /// initialization.
    async fn load_fees(&self, symbol: &Symbol) -> ExchangeResult<Fees>;

    /// Current best bid/ask snapshot for `symbol`.
    async fn book_ticker(&self, symbol: &Symbol) -> ExchangeResult<BookTicker>;

    /// Place a limit (or, if `is_market`, market) order. `price` is ignored
    /// for market orders. Returns `ExchangeError::InsufficientBalance` when
    /// the venue rejects the order for lack of funds.
    async fn place_order(
        &self,
        symbol: &Symbol,
        side: Side,
        qty: Qty,
        price: Px,
        is_market: bool,
    ) -> ExchangeResult<Order>;

    /// Cancel an order by id. Idempotent: cancelling an already-terminal
    /// order returns its final state rather than erroring.
    async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> ExchangeResult<Order>;

    /// Authoritative lookup of an order's current state.
    async fn fetch_order(&self, symbol: &Symbol, order_id: &OrderId) -> ExchangeResult<Order>;

    /// Available balance of a spot asset (base or quote).
    async fn get_asset_balance(&self, asset: &str) -> ExchangeResult<Qty>;

    /// Current open futures position for `symbol`.
    async fn get_futures_position(&self, symbol: &Symbol) -> ExchangeResult<FuturesPosition>;

    /// Submit a withdrawal of `qty` of `asset` toward `destination_venue`.
    /// Returns the venue-assigned transfer id.
    async fn submit_withdrawal(
        &self,
        asset: &str,
        qty: Qty,
        destination_venue: &str,
    ) -> ExchangeResult<String>;

    /// Poll the status of a previously submitted withdrawal.
    async fn query_withdrawal(&self, transfer_id: &str) -> ExchangeResult<WithdrawalStatus>;
}
