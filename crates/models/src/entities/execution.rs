use serde::{Deserialize, Serialize};

use super::Action;
use crate::error::{Error, Result};
use crate::sentinel::{
    Sentinel, UNSET_DOUBLE, UNSET_INTEGER, require_non_negative, require_positive, require_price,
    unset_decimal, unset_double, unset_integer,
};
use crate::values::{OrderId, Price, Quantity, Timestamp};

/// Execution side as reported by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecSide {
    #[serde(rename = "BOT", alias = "BUY")]
    Bought,
    #[serde(rename = "SLD", alias = "SELL")]
    Sold,
}

impl ExecSide {
    pub fn from_action(action: Action) -> Self {
        match action {
            Action::Buy => ExecSide::Bought,
            Action::Sell => ExecSide::Sold,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            ExecSide::Bought => Action::Buy,
            ExecSide::Sold => Action::Sell,
        }
    }
}

/// Broker-reported execution of (part of) an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedExecution")]
pub struct Execution {
    exec_id: String,
    time: Timestamp,
    side: ExecSide,
    shares: Quantity,
    price: Price,
    pub order_id: OrderId,
    pub client_id: OrderId,
    pub perm_id: i32,
    pub acct_number: String,
    pub exchange: String,
    #[serde(with = "unset_decimal")]
    cum_qty: Quantity,
    #[serde(with = "unset_decimal")]
    avg_price: Price,
}

impl Execution {
    /// Requires a non-empty `execId`, `shares > 0` and a set price
    pub fn new(
        exec_id: impl Into<String>,
        time: Timestamp,
        side: ExecSide,
        shares: Quantity,
        price: Price,
    ) -> Result<Self> {
        let execution = Self {
            exec_id: exec_id.into(),
            time,
            side,
            shares,
            price,
            order_id: UNSET_INTEGER,
            client_id: UNSET_INTEGER,
            perm_id: 0,
            acct_number: String::new(),
            exchange: String::new(),
            cum_qty: UNSET_DOUBLE,
            avg_price: UNSET_DOUBLE,
        };
        execution.validate()?;
        Ok(execution)
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn with_client_id(mut self, client_id: OrderId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_account(mut self, acct_number: impl Into<String>) -> Self {
        self.acct_number = acct_number.into();
        self
    }

    pub fn on_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    /// Broker's running totals for the order after this execution
    pub fn with_cumulative(mut self, cum_qty: Quantity, avg_price: Price) -> Result<Self> {
        self.cum_qty = cum_qty;
        self.avg_price = avg_price;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.exec_id.trim().is_empty() {
            return Err(Error::Validation("execId is required".to_string()));
        }
        require_positive("shares", self.shares)?;
        require_price("price", self.price)?;
        if self.cum_qty.is_set() {
            require_non_negative("cumQty", self.cum_qty)?;
            if self.cum_qty < self.shares {
                return Err(Error::Validation(format!(
                    "cumQty ({}) must be >= shares ({})",
                    self.cum_qty, self.shares
                )));
            }
        }
        Ok(())
    }

    pub fn exec_id(&self) -> &str {
        &self.exec_id
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn side(&self) -> ExecSide {
        self.side
    }

    pub fn shares(&self) -> Quantity {
        self.shares
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// `cumQty`, `UNSET_DOUBLE` when not reported
    pub fn cum_qty(&self) -> Quantity {
        self.cum_qty
    }

    /// `avgPrice`, `UNSET_DOUBLE` when not reported
    pub fn avg_price(&self) -> Price {
        self.avg_price
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedExecution {
    exec_id: String,
    time: Timestamp,
    side: ExecSide,
    shares: Quantity,
    price: Price,
    #[serde(default = "unset_integer")]
    order_id: OrderId,
    #[serde(default = "unset_integer")]
    client_id: OrderId,
    #[serde(default)]
    perm_id: i32,
    #[serde(default)]
    acct_number: String,
    #[serde(default)]
    exchange: String,
    #[serde(with = "unset_decimal", default = "unset_double")]
    cum_qty: Quantity,
    #[serde(with = "unset_decimal", default = "unset_double")]
    avg_price: Price,
}

impl TryFrom<UncheckedExecution> for Execution {
    type Error = Error;

    fn try_from(raw: UncheckedExecution) -> Result<Self> {
        let mut execution = Execution::new(raw.exec_id, raw.time, raw.side, raw.shares, raw.price)?
            .with_order_id(raw.order_id)
            .with_client_id(raw.client_id)
            .with_account(raw.acct_number)
            .on_exchange(raw.exchange)
            .with_cumulative(raw.cum_qty, raw.avg_price)?;
        execution.perm_id = raw.perm_id;
        Ok(execution)
    }
}

/// Commission charged for one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedCommissionReport")]
pub struct CommissionReport {
    #[serde(rename = "execId")]
    exec_id: String,
    commission: Price,
    currency: String,
    #[serde(rename = "realizedPNL", with = "unset_decimal")]
    realized_pnl: Price,
}

impl CommissionReport {
    /// Requires a non-empty `execId` and `commission >= 0`
    pub fn new(
        exec_id: impl Into<String>,
        commission: Price,
        currency: impl Into<String>,
    ) -> Result<Self> {
        let exec_id = exec_id.into();
        if exec_id.trim().is_empty() {
            return Err(Error::Validation("execId is required".to_string()));
        }
        require_non_negative("commission", commission)?;
        Ok(Self {
            exec_id,
            commission,
            currency: currency.into(),
            realized_pnl: UNSET_DOUBLE,
        })
    }

    /// Realized P&L of the closing execution; may be negative
    pub fn with_realized_pnl(mut self, realized_pnl: Price) -> Self {
        self.realized_pnl = realized_pnl;
        self
    }

    pub fn exec_id(&self) -> &str {
        &self.exec_id
    }

    pub fn commission(&self) -> Price {
        self.commission
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// `realizedPNL`, `UNSET_DOUBLE` when unknown
    pub fn realized_pnl(&self) -> Price {
        self.realized_pnl
    }
}

#[derive(Deserialize)]
struct UncheckedCommissionReport {
    #[serde(rename = "execId")]
    exec_id: String,
    commission: Price,
    #[serde(default)]
    currency: String,
    #[serde(rename = "realizedPNL", with = "unset_decimal", default = "unset_double")]
    realized_pnl: Price,
}

impl TryFrom<UncheckedCommissionReport> for CommissionReport {
    type Error = Error;

    fn try_from(raw: UncheckedCommissionReport) -> Result<Self> {
        Ok(CommissionReport::new(raw.exec_id, raw.commission, raw.currency)?
            .with_realized_pnl(raw.realized_pnl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_execution_validation() {
        assert!(Execution::new("0001", time(), ExecSide::Bought, dec!(40), dec!(104.40)).is_ok());
        assert!(Execution::new("", time(), ExecSide::Bought, dec!(40), dec!(104.40)).is_err());
        assert!(Execution::new("0001", time(), ExecSide::Bought, dec!(0), dec!(104.40)).is_err());
        assert!(Execution::new("0001", time(), ExecSide::Sold, dec!(5), UNSET_DOUBLE).is_err());
    }

    #[test]
    fn test_execution_defaults_and_builders() {
        let exec = Execution::new("0001", time(), ExecSide::Sold, dec!(10), dec!(99.5))
            .unwrap()
            .with_order_id(42)
            .with_account("DU123")
            .on_exchange("ISLAND");

        assert_eq!(exec.order_id, 42);
        assert!(exec.client_id.is_unset());
        assert!(exec.cum_qty().is_unset());
        assert_eq!(exec.side().action(), Action::Sell);
        assert_eq!(exec.exchange, "ISLAND");

        assert!(exec.clone().with_cumulative(dec!(5), dec!(99.5)).is_err());
        let exec = exec.with_cumulative(dec!(30), dec!(99.4)).unwrap();
        assert_eq!(exec.cum_qty(), dec!(30));
    }

    #[test]
    fn test_exec_side_accepts_action_names() {
        let side: ExecSide = serde_json::from_str("\"BUY\"").unwrap();
        assert_eq!(side, ExecSide::Bought);
        let side: ExecSide = serde_json::from_str("\"SLD\"").unwrap();
        assert_eq!(side, ExecSide::Sold);
        assert_eq!(serde_json::to_string(&ExecSide::Bought).unwrap(), "\"BOT\"");
        assert_eq!(ExecSide::from_action(Action::Sell), ExecSide::Sold);
    }

    #[test]
    fn test_commission_report() {
        let report = CommissionReport::new("0001", dec!(1.00), "USD").unwrap();
        assert!(report.realized_pnl().is_unset());
        assert_eq!(report.commission(), dec!(1.00));

        let report = report.with_realized_pnl(dec!(-12.5));
        assert_eq!(report.realized_pnl(), dec!(-12.5));

        assert!(CommissionReport::new("0001", dec!(-0.01), "USD").is_err());
        assert!(CommissionReport::new(" ", dec!(1), "USD").is_err());
    }

    #[test]
    fn test_commission_report_wire_names() {
        let report = CommissionReport::new("0001", dec!(1.25), "USD").unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""execId":"0001""#));
        assert!(json.contains(r#""realizedPNL":"Infinity""#));

        let back: CommissionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);

        let bad = r#"{"execId":"0001","commission":"-1","currency":"USD"}"#;
        assert!(serde_json::from_str::<CommissionReport>(bad).is_err());
    }
}
