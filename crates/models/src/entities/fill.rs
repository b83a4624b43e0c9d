use serde::{Deserialize, Serialize};

use super::{CommissionReport, Contract, Execution};
use crate::error::{Error, Result};
use crate::sentinel::checked;
use crate::values::{OrderId, Price, Quantity, Timestamp};

/// One execution together with its commission, for a given contract.
///
/// The execution and the commission report must share the same `execId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedFill")]
pub struct Fill {
    contract: Contract,
    execution: Execution,
    commission_report: CommissionReport,
    time: Timestamp,
}

impl Fill {
    pub fn new(
        contract: Contract,
        execution: Execution,
        commission_report: CommissionReport,
    ) -> Result<Self> {
        if execution.exec_id() != commission_report.exec_id() {
            return Err(Error::Validation(format!(
                "commission report execId {} does not match execution {}",
                commission_report.exec_id(),
                execution.exec_id()
            )));
        }
        let time = execution.time();
        Ok(Self {
            contract,
            execution,
            commission_report,
            time,
        })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    pub fn commission_report(&self) -> &CommissionReport {
        &self.commission_report
    }

    /// Execution time
    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn exec_id(&self) -> &str {
        self.execution.exec_id()
    }

    pub fn order_id(&self) -> OrderId {
        self.execution.order_id
    }

    pub fn shares(&self) -> Quantity {
        self.execution.shares()
    }

    pub fn price(&self) -> Price {
        self.execution.price()
    }

    pub fn commission(&self) -> Price {
        self.commission_report.commission()
    }

    /// shares * price
    pub fn notional(&self) -> Result<Price> {
        checked("notional", self.shares().checked_mul(self.price()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedFill {
    contract: Contract,
    execution: Execution,
    commission_report: CommissionReport,
}

impl TryFrom<UncheckedFill> for Fill {
    type Error = Error;

    fn try_from(raw: UncheckedFill) -> Result<Self> {
        Fill::new(raw.contract, raw.execution, raw.commission_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ExecSide;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn execution(exec_id: &str) -> Execution {
        Execution::new(
            exec_id,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            ExecSide::Bought,
            dec!(40),
            dec!(104.40),
        )
        .unwrap()
        .with_order_id(42)
    }

    #[test]
    fn test_fill_requires_matching_exec_id() {
        let report = CommissionReport::new("0002", dec!(1.00), "USD").unwrap();
        let err = Fill::new(Contract::stock("AAPL"), execution("0001"), report).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_fill_accessors() {
        let report = CommissionReport::new("0001", dec!(1.00), "USD").unwrap();
        let fill = Fill::new(Contract::stock("AAPL"), execution("0001"), report).unwrap();

        assert_eq!(fill.exec_id(), "0001");
        assert_eq!(fill.order_id(), 42);
        assert_eq!(fill.shares(), dec!(40));
        assert_eq!(fill.notional().unwrap(), dec!(4176.00));
        assert_eq!(fill.commission(), dec!(1.00));
        assert_eq!(fill.time(), fill.execution().time());
        assert_eq!(fill.contract().symbol, "AAPL");
    }

    #[test]
    fn test_notional_overflow_is_an_error() {
        let execution = Execution::new(
            "0001",
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            ExecSide::Bought,
            Decimal::from(1_000_000_000_i64),
            Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
        )
        .unwrap();
        let report = CommissionReport::new("0001", dec!(0), "USD").unwrap();
        let fill = Fill::new(Contract::stock("AAPL"), execution, report).unwrap();
        assert!(matches!(fill.notional(), Err(Error::Validation(_))));
    }
}
