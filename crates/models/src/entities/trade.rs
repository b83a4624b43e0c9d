use chrono::Utc;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Fill, Order, OrderStatus, Status};
use crate::error::{Error, Result};
use crate::sentinel::{Sentinel, checked, checked_sum};
use crate::values::{Price, Quantity, Timestamp};

/// One line of a trade's audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub time: Timestamp,
    pub status: Status,
    pub message: String,
}

impl TradeLogEntry {
    pub fn new(time: Timestamp, status: Status, message: impl Into<String>) -> Self {
        Self {
            time,
            status,
            message: message.into(),
        }
    }
}

/// Lifecycle wrapper around one order.
///
/// Owns the order, its mutable [`OrderStatus`], and two append-only
/// sequences: fills and log entries. `filled + remaining` always equals the
/// order's `totalQuantity`, and every status change appends a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedTrade")]
pub struct Trade {
    order: Order,
    order_status: OrderStatus,
    fills: Vec<Fill>,
    log: Vec<TradeLogEntry>,
}

/// Validated outcome of a fill, applied in one step
struct FillPlan {
    path: Vec<Status>,
    filled: Quantity,
    remaining: Quantity,
    avg_fill_price: Price,
}

impl Trade {
    /// Wrap an order, stamped with the current system time
    pub fn new(order: Order) -> Self {
        Self::new_with_time(order, Utc::now())
    }

    /// Wrap an order in PendingSubmit with an explicit creation time
    pub fn new_with_time(order: Order, time: Timestamp) -> Self {
        let mut order_status = OrderStatus::new(order.order_id(), order.total_quantity());
        order_status.parent_id = order.parent_id();
        let log = vec![TradeLogEntry::new(time, Status::PendingSubmit, "")];
        Self {
            order,
            order_status,
            fills: Vec::new(),
            log,
        }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn order_status(&self) -> &OrderStatus {
        &self.order_status
    }

    pub fn status(&self) -> Status {
        self.order_status.status
    }

    pub fn filled(&self) -> Quantity {
        self.order_status.filled
    }

    pub fn remaining(&self) -> Quantity {
        self.order_status.remaining
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn log(&self) -> &[TradeLogEntry] {
        &self.log
    }

    pub fn is_done(&self) -> bool {
        self.status().is_done()
    }

    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    /// Sum of commissions over all fills
    pub fn total_commission(&self) -> Result<Price> {
        checked_sum("commission", self.fills.iter().map(Fill::commission))
    }

    /// Record a fill.
    ///
    /// Advances `filled`/`remaining`/`avgFillPrice`, moves the status to
    /// PartiallyFilled or Filled (through Submitted when still pending) and
    /// logs each step at the execution time. Fills for another order or
    /// side, duplicates, overfills and partial fills of a FOK order are
    /// rejected. Nothing changes on error.
    pub fn apply_fill(&mut self, fill: Fill) -> Result<()> {
        let plan = self.plan_fill(&fill).inspect_err(|e| {
            warn!(
                "Rejected fill {} for order {}: {}",
                fill.exec_id(),
                self.order.order_id(),
                e
            );
        })?;

        let message = format!("Fill {}@{}", fill.shares(), fill.price());
        for status in &plan.path {
            let text = if *status == Status::Submitted {
                "Submitted (implied by fill)"
            } else {
                message.as_str()
            };
            self.log.push(TradeLogEntry::new(fill.time(), *status, text));
        }

        let status = &mut self.order_status;
        status.status = plan.path.last().copied().unwrap_or(status.status);
        status.filled = plan.filled;
        status.remaining = plan.remaining;
        status.avg_fill_price = plan.avg_fill_price;
        status.last_fill_price = fill.price();

        debug!(
            "Order {} {}: filled {} remaining {} avg {}",
            self.order.order_id(),
            status.status,
            status.filled,
            status.remaining,
            status.avg_fill_price
        );
        self.fills.push(fill);
        Ok(())
    }

    fn plan_fill(&self, fill: &Fill) -> Result<FillPlan> {
        let order_id = self.order.order_id();
        if fill.order_id().is_set() && order_id.is_set() && fill.order_id() != order_id {
            return Err(Error::Validation(format!(
                "fill for order {} applied to order {}",
                fill.order_id(),
                order_id
            )));
        }
        let side = fill.execution().side();
        if side.action() != self.order.action() {
            return Err(Error::Validation(format!(
                "{:?} execution {} does not match {} order",
                side,
                fill.exec_id(),
                self.order.action()
            )));
        }
        if self.fills.iter().any(|f| f.exec_id() == fill.exec_id()) {
            return Err(Error::Validation(format!(
                "duplicate execution {}",
                fill.exec_id()
            )));
        }

        let total = self.order.total_quantity();
        let current = &self.order_status;
        let filled = checked("filled", current.filled.checked_add(fill.shares()))?;
        if filled > total {
            return Err(Error::Validation(format!(
                "fill of {} would bring filled to {} above totalQuantity {}",
                fill.shares(),
                filled,
                total
            )));
        }
        let remaining = total - filled;
        if !remaining.is_zero() && !self.order.tif().allows_partial_fill() {
            return Err(Error::Validation(format!(
                "{} order cannot be partially filled ({} of {})",
                self.order.tif(),
                filled,
                total
            )));
        }

        let target = if remaining.is_zero() {
            Status::Filled
        } else {
            Status::PartiallyFilled
        };
        let mut path = Vec::with_capacity(2);
        if current.status == Status::PendingSubmit {
            path.push(Status::Submitted);
        }
        path.push(target);

        let mut from = current.status;
        for &to in &path {
            if !from.can_transition_to(to) {
                return Err(Error::InvalidTransition { from, to });
            }
            from = to;
        }

        // Weighted over every fill, not rolled from the previous average
        let notional = self
            .fills
            .iter()
            .chain(std::iter::once(fill))
            .map(Fill::notional)
            .collect::<Result<Vec<_>>>()?;
        let notional = checked_sum("avgFillPrice", notional)?;
        let avg_fill_price = checked("avgFillPrice", notional.checked_div(filled))?;

        Ok(FillPlan {
            path,
            filled,
            remaining,
            avg_fill_price,
        })
    }

    /// Mark the order's stop as fired, at the current system time
    pub fn trigger(&mut self) -> Result<()> {
        self.fire(None, Utc::now())
    }

    /// Mark the order's stop as fired by `price` at `time`
    pub fn trigger_at(&mut self, price: Price, time: Timestamp) -> Result<()> {
        self.fire(Some(price), time)
    }

    /// Logs one entry the first time the stop fires; repeat calls are no-ops
    fn fire(&mut self, price: Option<Price>, time: Timestamp) -> Result<()> {
        if self.is_done() {
            return Err(Error::InvalidState(format!(
                "cannot trigger order {} in {}",
                self.order.order_id(),
                self.status()
            )));
        }
        if self.order.is_triggered() {
            return Ok(());
        }
        let message = match price {
            Some(price) => {
                self.order.trigger_at(price)?;
                format!("Triggered at {price}")
            }
            None => {
                self.order.trigger()?;
                "Triggered".to_string()
            }
        };
        self.log.push(TradeLogEntry::new(time, self.status(), message));
        Ok(())
    }

    /// Follow `market_price` with the order's trailing stop.
    ///
    /// Returns true when the stop moved.
    pub fn advance_trail(&mut self, market_price: Price) -> Result<bool> {
        if self.is_done() {
            return Err(Error::InvalidState(format!(
                "cannot trail order {} in {}",
                self.order.order_id(),
                self.status()
            )));
        }
        let moved = self.order.advance_trail(market_price)?;
        if moved {
            debug!(
                "Order {} trail (stop, extreme) now {:?} at {}",
                self.order.order_id(),
                self.order.kind().trail_state(),
                market_price
            );
        }
        Ok(moved)
    }

    /// Move to `next`, logging the change at the current system time
    pub fn transition_status(&mut self, next: Status) -> Result<()> {
        self.transition_status_at(next, Utc::now(), "")
    }

    /// Move to `next` if the transition table allows it.
    ///
    /// Filled additionally needs `remaining == 0` and PartiallyFilled needs
    /// some quantity filled; the fill-driven path is [`Trade::apply_fill`].
    pub fn transition_status_at(
        &mut self,
        next: Status,
        time: Timestamp,
        message: impl Into<String>,
    ) -> Result<()> {
        let from = self.status();
        if !from.can_transition_to(next) {
            warn!(
                "Rejected transition {} -> {} for order {}",
                from,
                next,
                self.order.order_id()
            );
            return Err(Error::InvalidTransition { from, to: next });
        }
        match next {
            Status::Filled if !self.remaining().is_zero() => {
                return Err(Error::Validation(format!(
                    "cannot mark Filled with {} remaining",
                    self.remaining()
                )));
            }
            Status::PartiallyFilled if self.filled().is_zero() => {
                return Err(Error::Validation(
                    "cannot mark PartiallyFilled before any fill".to_string(),
                ));
            }
            _ => {}
        }

        debug!("Order {} {} -> {}", self.order.order_id(), from, next);
        self.order_status.status = next;
        self.log.push(TradeLogEntry::new(time, next, message));
        Ok(())
    }

    /// Cancel with a reason, at the current system time
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition_status_at(Status::Cancelled, Utc::now(), reason)
    }

    /// Append a free-form entry to the audit trail
    pub fn append_log(&mut self, status: Status, message: impl Into<String>, time: Timestamp) {
        self.log.push(TradeLogEntry::new(time, status, message));
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedTrade {
    order: Order,
    order_status: OrderStatus,
    #[serde(default)]
    fills: Vec<Fill>,
    #[serde(default)]
    log: Vec<TradeLogEntry>,
}

impl TryFrom<UncheckedTrade> for Trade {
    type Error = Error;

    fn try_from(raw: UncheckedTrade) -> Result<Self> {
        let total = raw.order.total_quantity();
        let status = &raw.order_status;
        if status.filled < Decimal::ZERO || status.remaining < Decimal::ZERO {
            return Err(Error::Validation(
                "filled and remaining must be >= 0".to_string(),
            ));
        }
        let accounted = checked("filled", status.filled.checked_add(status.remaining))?;
        if accounted != total {
            return Err(Error::Validation(format!(
                "filled ({}) + remaining ({}) != totalQuantity ({})",
                status.filled, status.remaining, total
            )));
        }
        let fill_total = checked_sum("filled", raw.fills.iter().map(Fill::shares))?;
        if fill_total != status.filled {
            return Err(Error::Validation(format!(
                "fills sum to {} but filled is {}",
                fill_total, status.filled
            )));
        }
        Ok(Trade {
            order: raw.order,
            order_status: raw.order_status,
            fills: raw.fills,
            log: raw.log,
        })
    }
}
