//! Shared value types for the arbitrage engine.

pub mod market;
pub mod order;
pub mod types;

pub use market::{BookTicker, Fees, SymbolInfo};
pub use order::{Order, OrderId, OrderStatus};
pub use types::{Px, Qty, Side, Symbol, Ts};