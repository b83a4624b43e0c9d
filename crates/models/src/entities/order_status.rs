use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sentinel::{UNSET_DOUBLE, UNSET_INTEGER, unset_decimal};
use crate::values::{OrderId, Price, Quantity};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Created, not yet acknowledged by the broker
    PendingSubmit,
    /// Accepted and working
    Submitted,
    /// Some quantity filled, remainder still working
    PartiallyFilled,
    /// Completely filled
    Filled,
    /// Canceled by the user or the broker
    Cancelled,
    /// Parked by the broker (e.g. outside trading hours, rejected margin)
    Inactive,
}

impl Status {
    /// Returns true if the order is in a terminal state
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Filled | Status::Cancelled)
    }

    /// Returns true if the order is still working
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Status::PendingSubmit | Status::Submitted | Status::PartiallyFilled
        )
    }

    /// Statuses reachable from this one
    pub fn successors(&self) -> &'static [Status] {
        match self {
            Status::PendingSubmit => &[Status::Submitted, Status::Cancelled, Status::Inactive],
            Status::Submitted => &[
                Status::PartiallyFilled,
                Status::Filled,
                Status::Cancelled,
                Status::Inactive,
            ],
            Status::PartiallyFilled => &[
                Status::PartiallyFilled,
                Status::Filled,
                Status::Cancelled,
            ],
            Status::Inactive => &[Status::Submitted, Status::Cancelled],
            Status::Filled | Status::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: Status) -> bool {
        self.successors().contains(&next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::PendingSubmit => "PendingSubmit",
            Status::Submitted => "Submitted",
            Status::PartiallyFilled => "PartiallyFilled",
            Status::Filled => "Filled",
            Status::Cancelled => "Cancelled",
            Status::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill progress of one order.
///
/// `avgFillPrice` and `lastFillPrice` stay `UNSET_DOUBLE` until the first
/// fill. Mutated only through [`crate::Trade`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatus {
    pub order_id: OrderId,
    pub status: Status,
    pub filled: Quantity,
    pub remaining: Quantity,
    #[serde(with = "unset_decimal")]
    pub avg_fill_price: Price,
    #[serde(with = "unset_decimal")]
    pub last_fill_price: Price,
    pub parent_id: OrderId,
}

impl OrderStatus {
    /// Fresh status for an order of `total_quantity`
    pub fn new(order_id: OrderId, total_quantity: Quantity) -> Self {
        Self {
            order_id,
            status: Status::PendingSubmit,
            filled: Quantity::ZERO,
            remaining: total_quantity,
            avg_fill_price: UNSET_DOUBLE,
            last_fill_price: UNSET_DOUBLE,
            parent_id: UNSET_INTEGER,
        }
    }
}
