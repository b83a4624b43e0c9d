use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, trace};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order_type::{OrderKind, TrailingAmount};
use super::{Action, TimeInForce};
use crate::error::{Error, Result};
use crate::sentinel::{
    Sentinel, UNSET_DOUBLE, UNSET_INTEGER, checked, require_positive, require_price, unset_decimal,
    unset_integer,
};
use crate::values::{OrderId, Price, Quantity};

/// Order instruction.
///
/// Shared base fields plus an [`OrderKind`] variant. Construction validates;
/// once built, the only fields that change are the stop trigger and trailing
/// state on stop variants, and the bracket linkage via [`Order::add_child`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedOrder")]
pub struct Order {
    order_id: OrderId,
    pub perm_id: i32,
    pub client_id: OrderId,
    parent_id: OrderId,
    action: Action,
    total_quantity: Quantity,
    #[serde(flatten)]
    kind: OrderKind,
    tif: TimeInForce,
    good_till_date: Option<DateTime<Utc>>,
    pub good_after_time: Option<DateTime<Utc>>,
    pub oca_group: String,
    pub order_ref: String,
    pub account: String,
    pub transmit: bool,
    children: Vec<Order>,
}

impl Order {
    /// Create and validate an order of any variant
    pub fn new(action: Action, total_quantity: Quantity, kind: OrderKind) -> Result<Self> {
        let order = Self {
            order_id: UNSET_INTEGER,
            perm_id: 0,
            client_id: UNSET_INTEGER,
            parent_id: UNSET_INTEGER,
            action,
            total_quantity,
            kind,
            tif: TimeInForce::default(),
            good_till_date: None,
            good_after_time: None,
            oca_group: String::new(),
            order_ref: String::new(),
            account: String::new(),
            transmit: true,
            children: Vec::new(),
        };
        order.validate()?;
        Ok(order)
    }

    pub fn market(action: Action, total_quantity: Quantity) -> Result<Self> {
        Self::new(action, total_quantity, OrderKind::Market)
    }

    pub fn limit(action: Action, total_quantity: Quantity, lmt_price: Price) -> Result<Self> {
        Self::new(action, total_quantity, OrderKind::limit(lmt_price))
    }

    pub fn stop(action: Action, total_quantity: Quantity, aux_price: Price) -> Result<Self> {
        Self::new(action, total_quantity, OrderKind::stop(aux_price))
    }

    pub fn stop_limit(
        action: Action,
        total_quantity: Quantity,
        lmt_price: Price,
        aux_price: Price,
    ) -> Result<Self> {
        Self::new(
            action,
            total_quantity,
            OrderKind::stop_limit(lmt_price, aux_price),
        )
    }

    pub fn trailing_stop_market(
        action: Action,
        total_quantity: Quantity,
        amount: TrailingAmount,
    ) -> Result<Self> {
        Self::new(
            action,
            total_quantity,
            OrderKind::trailing_stop_market(amount),
        )
    }

    pub fn trailing_stop_limit(
        action: Action,
        total_quantity: Quantity,
        amount: TrailingAmount,
        lmt_price_offset: Price,
    ) -> Result<Self> {
        Self::new(
            action,
            total_quantity,
            OrderKind::trailing_stop_limit(amount, lmt_price_offset),
        )
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn with_client_id(mut self, client_id: OrderId) -> Self {
        self.client_id = client_id;
        self
    }

    /// Set the time-in-force. GTD needs a date, use [`Order::good_till`].
    pub fn with_tif(mut self, tif: TimeInForce) -> Result<Self> {
        if tif == TimeInForce::Gtd && self.good_till_date.is_none() {
            return Err(Error::Validation(
                "GTD orders require goodTillDate".to_string(),
            ));
        }
        self.tif = tif;
        Ok(self)
    }

    /// Make this a GTD order expiring at `date`
    pub fn good_till(mut self, date: DateTime<Utc>) -> Self {
        self.tif = TimeInForce::Gtd;
        self.good_till_date = Some(date);
        self
    }

    pub fn with_oca_group(mut self, group: impl Into<String>) -> Self {
        self.oca_group = group.into();
        self
    }

    pub fn with_order_ref(mut self, order_ref: impl Into<String>) -> Self {
        self.order_ref = order_ref.into();
        self
    }

    pub fn with_transmit(mut self, transmit: bool) -> Self {
        self.transmit = transmit;
        self
    }

    /// Validate base fields, then dispatch on the variant
    pub fn validate(&self) -> Result<()> {
        require_positive("totalQuantity", self.total_quantity)?;
        if self.tif == TimeInForce::Gtd && self.good_till_date.is_none() {
            return Err(Error::Validation(
                "GTD orders require goodTillDate".to_string(),
            ));
        }
        self.kind.validate()
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// `parentId`; unset or 0 both mean "no parent"
    pub fn parent_id(&self) -> OrderId {
        self.parent_id
    }

    pub fn has_parent(&self) -> bool {
        self.parent_id.is_set() && self.parent_id != 0
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn kind(&self) -> &OrderKind {
        &self.kind
    }

    /// IB `orderType` code
    pub fn order_type(&self) -> &'static str {
        self.kind.order_type()
    }

    /// `lmtPrice`. A TRAIL LIMIT order has no fixed limit: this is the
    /// working limit `lmtPriceOffset` away from the current trail stop,
    /// `UNSET_DOUBLE` until the trail has a stop.
    pub fn lmt_price(&self) -> Price {
        match self.kind {
            OrderKind::TrailingStopLimit { .. } => {
                self.trail_limit_price().unwrap_or(UNSET_DOUBLE)
            }
            _ => self.kind.lmt_price(),
        }
    }

    pub fn aux_price(&self) -> Price {
        self.kind.aux_price()
    }

    pub fn tif(&self) -> TimeInForce {
        self.tif
    }

    pub fn good_till_date(&self) -> Option<DateTime<Utc>> {
        self.good_till_date
    }

    /// Bracket children in attachment order
    pub fn children(&self) -> &[Order] {
        &self.children
    }

    pub fn is_triggered(&self) -> bool {
        self.kind.is_triggered()
    }

    /// Check the time-in-force against `current_time`
    pub fn is_expired(&self, current_time: DateTime<Utc>, day_end: Option<DateTime<Utc>>) -> bool {
        self.tif.is_expired(current_time, self.good_till_date, day_end)
    }

    /// Attach a bracket child, stamping its `parentId` with ours.
    ///
    /// Fails with `InvalidState` when this order has no id yet or the child
    /// already belongs to another parent.
    pub fn add_child(&mut self, mut child: Order) -> Result<()> {
        if self.order_id.is_unset() {
            return Err(Error::InvalidState(
                "cannot attach a child to an order without orderId".to_string(),
            ));
        }
        if child.has_parent() && child.parent_id != self.order_id {
            return Err(Error::InvalidState(format!(
                "child already attached to parent {}",
                child.parent_id
            )));
        }
        if child.order_id.is_set() && child.order_id == self.order_id {
            return Err(Error::InvalidState(format!(
                "order {} cannot be its own child",
                self.order_id
            )));
        }

        child.parent_id = self.order_id;
        trace!(
            "Attached {} child {} to parent {}",
            child.order_type(),
            child.order_id,
            self.order_id
        );
        self.children.push(child);
        Ok(())
    }

    /// Mark a stop-triggered order as fired. Repeat calls are no-ops.
    pub fn trigger(&mut self) -> Result<()> {
        self.fire(UNSET_DOUBLE)
    }

    /// Like [`Order::trigger`], also recording the price that fired the stop
    pub fn trigger_at(&mut self, price: Price) -> Result<()> {
        require_price("triggerPrice", price)?;
        self.fire(price)
    }

    fn fire(&mut self, price: Price) -> Result<()> {
        if self.kind.trigger(price)? {
            debug!("Order {} ({}) triggered", self.order_id, self.order_type());
        }
        Ok(())
    }

    /// Set the trailing state explicitly.
    ///
    /// A SELL trail keeps its stop at or below the extreme (highest) price, a
    /// BUY trail at or above the extreme (lowest) price.
    pub fn update_trail(&mut self, extreme_price: Price, trail_stop_price: Price) -> Result<()> {
        require_price("extremePrice", extreme_price)?;
        require_price("trailStopPrice", trail_stop_price)?;
        let wrong_side = match self.action {
            Action::Sell => trail_stop_price > extreme_price,
            Action::Buy => trail_stop_price < extreme_price,
        };
        if wrong_side {
            return Err(Error::Validation(format!(
                "{} trail stop {} is on the wrong side of extreme {}",
                self.action, trail_stop_price, extreme_price
            )));
        }
        self.kind.set_trail(trail_stop_price, extreme_price)
    }

    /// Follow a new market price: move the extreme when the price improves
    /// and recompute the stop from the trailing amount.
    ///
    /// Returns true when the stop moved.
    pub fn advance_trail(&mut self, market_price: Price) -> Result<bool> {
        require_price("marketPrice", market_price)?;
        let Some((stop, extreme)) = self.kind.trail_state() else {
            return Err(Error::InvalidState(format!(
                "{} order is not a trailing stop",
                self.order_type()
            )));
        };
        let improved = extreme.is_unset()
            || match self.action {
                Action::Sell => market_price > extreme,
                Action::Buy => market_price < extreme,
            };
        if !improved {
            return Ok(false);
        }

        let offset = match TrailingAmount::from_wire(
            self.kind.aux_price(),
            self.kind.trailing_percent(),
        ) {
            Some(TrailingAmount::Distance(d)) => d,
            Some(TrailingAmount::Percent(p)) => {
                let scaled = checked("trailStopPrice", market_price.checked_mul(p))?;
                checked("trailStopPrice", scaled.checked_div(Decimal::ONE_HUNDRED))?
            }
            None => {
                return Err(Error::InvalidState(
                    "trailing amount is not set".to_string(),
                ));
            }
        };
        let new_stop = match self.action {
            Action::Sell => checked("trailStopPrice", market_price.checked_sub(offset))?,
            Action::Buy => checked("trailStopPrice", market_price.checked_add(offset))?,
        };
        self.update_trail(market_price, new_stop)?;
        Ok(stop != new_stop)
    }

    /// Limit price of a TRAIL LIMIT order at its current stop, `UNSET_DOUBLE`
    /// until the trail has a stop
    pub fn trail_limit_price(&self) -> Result<Price> {
        match (&self.kind, self.kind.trail_state()) {
            (OrderKind::TrailingStopLimit { lmt_price_offset, .. }, Some((stop, _)))
                if stop.is_set() =>
            {
                let limit = match self.action {
                    Action::Sell => stop.checked_sub(*lmt_price_offset),
                    Action::Buy => stop.checked_add(*lmt_price_offset),
                };
                checked("lmtPrice", limit)
            }
            _ => Ok(UNSET_DOUBLE),
        }
    }
}

/// Wire form of [`Order`], validated on conversion
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedOrder {
    #[serde(default = "unset_integer")]
    order_id: OrderId,
    #[serde(default)]
    perm_id: i32,
    #[serde(default = "unset_integer")]
    client_id: OrderId,
    #[serde(default = "unset_integer")]
    parent_id: OrderId,
    action: Action,
    #[serde(with = "unset_decimal")]
    total_quantity: Quantity,
    #[serde(flatten)]
    kind: OrderKind,
    #[serde(default)]
    tif: TimeInForce,
    #[serde(default)]
    good_till_date: Option<DateTime<Utc>>,
    #[serde(default)]
    good_after_time: Option<DateTime<Utc>>,
    #[serde(default)]
    oca_group: String,
    #[serde(default)]
    order_ref: String,
    #[serde(default)]
    account: String,
    #[serde(default = "default_transmit")]
    transmit: bool,
    #[serde(default)]
    children: Vec<Order>,
}

fn default_transmit() -> bool {
    true
}

impl TryFrom<UncheckedOrder> for Order {
    type Error = Error;

    fn try_from(raw: UncheckedOrder) -> Result<Self> {
        let order = Order {
            order_id: raw.order_id,
            perm_id: raw.perm_id,
            client_id: raw.client_id,
            parent_id: raw.parent_id,
            action: raw.action,
            total_quantity: raw.total_quantity,
            kind: raw.kind,
            tif: raw.tif,
            good_till_date: raw.good_till_date,
            good_after_time: raw.good_after_time,
            oca_group: raw.oca_group,
            order_ref: raw.order_ref,
            account: raw.account,
            transmit: raw.transmit,
            children: raw.children,
        };
        order.validate()?;
        Ok(order)
    }
}

/// Hands out increasing order ids, starting at 1
#[derive(Debug)]
pub struct OrderIdSequence {
    next: AtomicI32,
}

impl Default for OrderIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderIdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Resume numbering, e.g. from the broker's `nextValidId`
    pub fn starting_at(first: OrderId) -> Self {
        Self {
            next: AtomicI32::new(first),
        }
    }

    pub fn next_id(&self) -> Result<OrderId> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < UNSET_INTEGER).then(|| n + 1)
            })
            .map_err(|_| Error::InvalidState("order id sequence exhausted".to_string()))
    }

    /// Give `order` and any unnumbered children an id.
    ///
    /// An order that already has an id keeps it. Returns the order's id.
    pub fn assign(&self, order: &mut Order) -> Result<OrderId> {
        if order.order_id.is_unset() {
            order.order_id = self.next_id()?;
        }
        for child in &mut order.children {
            child.parent_id = order.order_id;
            self.assign(child)?;
        }
        Ok(order.order_id)
    }
}
