mod action;
mod bar;
mod contract;
mod execution;
mod execution_result;
mod fill;
mod order;
mod order_status;
mod order_type;
mod shared_trade;
mod time_in_force;
mod trade;

pub use action::Action;
pub use bar::BarData;
pub use contract::{Contract, SecType};
pub use execution::{CommissionReport, ExecSide, Execution};
pub use execution_result::ExecutionResult;
pub use fill::Fill;
pub use order::{Order, OrderIdSequence};
pub use order_status::{OrderStatus, Status};
pub use order_type::{OrderKind, TrailingAmount};
pub use shared_trade::SharedTrade;
pub use time_in_force::TimeInForce;
pub use trade::{Trade, TradeLogEntry};
