use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Fill, Order, Trade};
use crate::error::{Error, Result};
use crate::sentinel::{Sentinel, checked_sum};
use crate::values::{OrderId, Price, Quantity};

/// Read-only outcome of an execution pass: the fills produced, in order,
/// and the orders still working.
///
/// Every fill that names an order must name one that is either pending
/// (including bracket children) or already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedExecutionResult")]
pub struct ExecutionResult {
    fills: Vec<Fill>,
    pending_orders: Vec<Order>,
    resolved_order_ids: BTreeSet<OrderId>,
}

impl ExecutionResult {
    pub fn new(
        fills: Vec<Fill>,
        pending_orders: Vec<Order>,
        resolved_order_ids: impl IntoIterator<Item = OrderId>,
    ) -> Result<Self> {
        let result = Self {
            fills,
            pending_orders,
            resolved_order_ids: resolved_order_ids.into_iter().collect(),
        };
        result.validate()?;
        Ok(result)
    }

    /// Collect fills from every trade; trades that are not done contribute
    /// their order to the pending set, the rest count as resolved.
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Result<Self> {
        let mut fills = Vec::new();
        let mut pending_orders = Vec::new();
        let mut resolved = BTreeSet::new();
        for trade in trades {
            fills.extend(trade.fills().iter().cloned());
            if trade.is_done() {
                resolved.insert(trade.order().order_id());
            } else {
                pending_orders.push(trade.order().clone());
            }
        }
        Self::new(fills, pending_orders, resolved)
    }

    fn validate(&self) -> Result<()> {
        let mut known = self.resolved_order_ids.clone();
        for order in &self.pending_orders {
            collect_ids(order, &mut known);
        }
        for fill in &self.fills {
            let order_id = fill.order_id();
            if order_id.is_set() && !known.contains(&order_id) {
                return Err(Error::Validation(format!(
                    "fill {} references unknown order {}",
                    fill.exec_id(),
                    order_id
                )));
            }
        }
        Ok(())
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn pending_orders(&self) -> &[Order] {
        &self.pending_orders
    }

    pub fn resolved_order_ids(&self) -> &BTreeSet<OrderId> {
        &self.resolved_order_ids
    }

    /// No order left working
    pub fn is_complete(&self) -> bool {
        self.pending_orders.is_empty()
    }

    pub fn total_commission(&self) -> Result<Price> {
        checked_sum("commission", self.fills.iter().map(Fill::commission))
    }

    /// Shares filled for one order across this pass
    pub fn filled_quantity(&self, order_id: OrderId) -> Result<Quantity> {
        checked_sum(
            "filled",
            self.fills
                .iter()
                .filter(|f| f.order_id() == order_id)
                .map(Fill::shares),
        )
    }
}

fn collect_ids(order: &Order, ids: &mut BTreeSet<OrderId>) {
    if order.order_id().is_set() {
        ids.insert(order.order_id());
    }
    for child in order.children() {
        collect_ids(child, ids);
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedExecutionResult {
    #[serde(default)]
    fills: Vec<Fill>,
    #[serde(default)]
    pending_orders: Vec<Order>,
    #[serde(default)]
    resolved_order_ids: BTreeSet<OrderId>,
}

impl TryFrom<UncheckedExecutionResult> for ExecutionResult {
    type Error = Error;

    fn try_from(raw: UncheckedExecutionResult) -> Result<Self> {
        ExecutionResult::new(raw.fills, raw.pending_orders, raw.resolved_order_ids)
    }
}
