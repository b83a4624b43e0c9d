use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - exact decimal, `UNSET_DOUBLE` when a sentinel-typed field is unset
pub type Price = Decimal;

/// Quantity value - exact decimal (shares, contracts, coins)
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Brokerage order identifier (`orderId`, `parentId`, `clientId`, `permId`)
pub type OrderId = i32;
