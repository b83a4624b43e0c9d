//! xtrading models
//!
//! IB-compatible data models: orders and bracket linkage, trade lifecycle,
//! OHLCV bars, executions, commissions and fills.
//! Pure, synchronous types with validation on construction; no I/O beyond
//! loading [`config::OrderDefaults`].

pub mod config;
pub mod entities;
pub mod error;
pub mod sentinel;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Orders
    Action, Order, OrderIdSequence, OrderKind, TimeInForce, TrailingAmount,
    // Lifecycle
    OrderStatus, SharedTrade, Status, Trade, TradeLogEntry,
    // Market data and executions
    BarData, CommissionReport, Contract, ExecSide, Execution, ExecutionResult, Fill, SecType,
};
pub use error::{Error, Result};
pub use sentinel::{Sentinel, UNSET_DOUBLE, UNSET_INTEGER, is_unset};
pub use values::{OrderId, Price, Quantity, Timestamp};
