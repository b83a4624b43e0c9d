use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sentinel::{
    Sentinel, UNSET_DOUBLE, require_non_negative, require_positive, require_price, unset_decimal,
    unset_double,
};
use crate::values::Price;

/// How far a trailing stop sits from the best price seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingAmount {
    /// Absolute distance, carried on the wire as `auxPrice`
    Distance(Decimal),
    /// Percentage of the extreme price, carried as `trailingPercent`
    Percent(Decimal),
}

/// Order variant, tagged on the wire by `orderType`.
///
/// Each variant carries only the fields it needs. Stop-triggered variants
/// also carry `triggered`/`triggerPrice`, and trailing variants carry their
/// running `trailStopPrice`/`extremePrice`; these are transitional state,
/// not part of the instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "orderType")]
pub enum OrderKind {
    /// Execute at current market price
    #[serde(rename = "MKT")]
    Market,

    /// Execute at `lmtPrice` or better
    #[serde(rename = "LMT", rename_all = "camelCase")]
    Limit {
        #[serde(with = "unset_decimal")]
        lmt_price: Price,
    },

    /// Market order triggered when price reaches `auxPrice`
    #[serde(rename = "STP", rename_all = "camelCase")]
    Stop {
        #[serde(with = "unset_decimal")]
        aux_price: Price,
        #[serde(default)]
        triggered: bool,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trigger_price: Price,
    },

    /// Limit order at `lmtPrice` triggered when price reaches `auxPrice`
    #[serde(rename = "STP LMT", rename_all = "camelCase")]
    StopLimit {
        #[serde(with = "unset_decimal")]
        lmt_price: Price,
        #[serde(with = "unset_decimal")]
        aux_price: Price,
        #[serde(default)]
        triggered: bool,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trigger_price: Price,
    },

    /// Stop that follows the market by `auxPrice` or `trailingPercent`,
    /// then executes at market
    #[serde(rename = "TRAIL", rename_all = "camelCase")]
    TrailingStopMarket {
        #[serde(with = "unset_decimal", default = "unset_double")]
        aux_price: Price,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trailing_percent: Decimal,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trail_stop_price: Price,
        #[serde(with = "unset_decimal", default = "unset_double")]
        extreme_price: Price,
        #[serde(default)]
        triggered: bool,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trigger_price: Price,
    },

    /// Trailing stop that executes as a limit `lmtPriceOffset` away from
    /// the stop
    #[serde(rename = "TRAIL LIMIT", rename_all = "camelCase")]
    TrailingStopLimit {
        #[serde(with = "unset_decimal", default = "unset_double")]
        aux_price: Price,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trailing_percent: Decimal,
        #[serde(with = "unset_decimal")]
        lmt_price_offset: Price,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trail_stop_price: Price,
        #[serde(with = "unset_decimal", default = "unset_double")]
        extreme_price: Price,
        #[serde(default)]
        triggered: bool,
        #[serde(with = "unset_decimal", default = "unset_double")]
        trigger_price: Price,
    },
}

impl OrderKind {
    pub fn limit(lmt_price: Price) -> Self {
        OrderKind::Limit { lmt_price }
    }

    pub fn stop(aux_price: Price) -> Self {
        OrderKind::Stop {
            aux_price,
            triggered: false,
            trigger_price: UNSET_DOUBLE,
        }
    }

    pub fn stop_limit(lmt_price: Price, aux_price: Price) -> Self {
        OrderKind::StopLimit {
            lmt_price,
            aux_price,
            triggered: false,
            trigger_price: UNSET_DOUBLE,
        }
    }

    pub fn trailing_stop_market(amount: TrailingAmount) -> Self {
        let (aux_price, trailing_percent) = amount.into_wire();
        OrderKind::TrailingStopMarket {
            aux_price,
            trailing_percent,
            trail_stop_price: UNSET_DOUBLE,
            extreme_price: UNSET_DOUBLE,
            triggered: false,
            trigger_price: UNSET_DOUBLE,
        }
    }

    pub fn trailing_stop_limit(amount: TrailingAmount, lmt_price_offset: Price) -> Self {
        let (aux_price, trailing_percent) = amount.into_wire();
        OrderKind::TrailingStopLimit {
            aux_price,
            trailing_percent,
            lmt_price_offset,
            trail_stop_price: UNSET_DOUBLE,
            extreme_price: UNSET_DOUBLE,
            triggered: false,
            trigger_price: UNSET_DOUBLE,
        }
    }

    /// IB `orderType` code
    pub fn order_type(&self) -> &'static str {
        match self {
            OrderKind::Market => "MKT",
            OrderKind::Limit { .. } => "LMT",
            OrderKind::Stop { .. } => "STP",
            OrderKind::StopLimit { .. } => "STP LMT",
            OrderKind::TrailingStopMarket { .. } => "TRAIL",
            OrderKind::TrailingStopLimit { .. } => "TRAIL LIMIT",
        }
    }

    /// Variant-specific field validation
    pub fn validate(&self) -> Result<()> {
        match self {
            OrderKind::Market => Ok(()),
            OrderKind::Limit { lmt_price } => require_price("lmtPrice", *lmt_price).map(drop),
            OrderKind::Stop { aux_price, .. } => require_price("auxPrice", *aux_price).map(drop),
            OrderKind::StopLimit {
                lmt_price,
                aux_price,
                ..
            } => {
                require_price("lmtPrice", *lmt_price)?;
                require_price("auxPrice", *aux_price)?;
                Ok(())
            }
            OrderKind::TrailingStopMarket {
                aux_price,
                trailing_percent,
                ..
            } => validate_trailing(*aux_price, *trailing_percent),
            OrderKind::TrailingStopLimit {
                aux_price,
                trailing_percent,
                lmt_price_offset,
                ..
            } => {
                validate_trailing(*aux_price, *trailing_percent)?;
                require_non_negative("lmtPriceOffset", *lmt_price_offset)?;
                Ok(())
            }
        }
    }

    /// `lmtPrice`, or `UNSET_DOUBLE` for variants without one
    pub fn lmt_price(&self) -> Price {
        match self {
            OrderKind::Limit { lmt_price } | OrderKind::StopLimit { lmt_price, .. } => *lmt_price,
            _ => UNSET_DOUBLE,
        }
    }

    /// `auxPrice` (stop price or trailing amount), or `UNSET_DOUBLE`
    pub fn aux_price(&self) -> Price {
        match self {
            OrderKind::Stop { aux_price, .. }
            | OrderKind::StopLimit { aux_price, .. }
            | OrderKind::TrailingStopMarket { aux_price, .. }
            | OrderKind::TrailingStopLimit { aux_price, .. } => *aux_price,
            _ => UNSET_DOUBLE,
        }
    }

    /// `trailingPercent`, or `UNSET_DOUBLE`
    pub fn trailing_percent(&self) -> Decimal {
        match self {
            OrderKind::TrailingStopMarket {
                trailing_percent, ..
            }
            | OrderKind::TrailingStopLimit {
                trailing_percent, ..
            } => *trailing_percent,
            _ => UNSET_DOUBLE,
        }
    }

    pub fn is_stop_triggered_type(&self) -> bool {
        !matches!(self, OrderKind::Market | OrderKind::Limit { .. })
    }

    pub fn is_trailing(&self) -> bool {
        matches!(
            self,
            OrderKind::TrailingStopMarket { .. } | OrderKind::TrailingStopLimit { .. }
        )
    }

    pub fn is_triggered(&self) -> bool {
        match self {
            OrderKind::Stop { triggered, .. }
            | OrderKind::StopLimit { triggered, .. }
            | OrderKind::TrailingStopMarket { triggered, .. }
            | OrderKind::TrailingStopLimit { triggered, .. } => *triggered,
            _ => false,
        }
    }

    /// Price recorded when the stop fired, `UNSET_DOUBLE` otherwise
    pub fn trigger_price(&self) -> Price {
        match self {
            OrderKind::Stop { trigger_price, .. }
            | OrderKind::StopLimit { trigger_price, .. }
            | OrderKind::TrailingStopMarket { trigger_price, .. }
            | OrderKind::TrailingStopLimit { trigger_price, .. } => *trigger_price,
            _ => UNSET_DOUBLE,
        }
    }

    /// Current (`trailStopPrice`, `extremePrice`) of a trailing variant
    pub fn trail_state(&self) -> Option<(Price, Price)> {
        match self {
            OrderKind::TrailingStopMarket {
                trail_stop_price,
                extreme_price,
                ..
            }
            | OrderKind::TrailingStopLimit {
                trail_stop_price,
                extreme_price,
                ..
            } => Some((*trail_stop_price, *extreme_price)),
            _ => None,
        }
    }

    /// Marks the stop as fired. Returns false when it already was.
    pub(crate) fn trigger(&mut self, price: Price) -> Result<bool> {
        let order_type = self.order_type();
        match self {
            OrderKind::Stop {
                triggered,
                trigger_price,
                ..
            }
            | OrderKind::StopLimit {
                triggered,
                trigger_price,
                ..
            }
            | OrderKind::TrailingStopMarket {
                triggered,
                trigger_price,
                ..
            }
            | OrderKind::TrailingStopLimit {
                triggered,
                trigger_price,
                ..
            } => {
                if *triggered {
                    return Ok(false);
                }
                *triggered = true;
                *trigger_price = price;
                Ok(true)
            }
            OrderKind::Market | OrderKind::Limit { .. } => Err(Error::InvalidState(format!(
                "{order_type} order has no stop trigger"
            ))),
        }
    }

    pub(crate) fn set_trail(&mut self, stop: Price, extreme: Price) -> Result<()> {
        let order_type = self.order_type();
        match self {
            OrderKind::TrailingStopMarket {
                trail_stop_price,
                extreme_price,
                triggered,
                ..
            }
            | OrderKind::TrailingStopLimit {
                trail_stop_price,
                extreme_price,
                triggered,
                ..
            } => {
                if *triggered {
                    return Err(Error::InvalidState(
                        "trailing stop already triggered".to_string(),
                    ));
                }
                *trail_stop_price = stop;
                *extreme_price = extreme;
                Ok(())
            }
            _ => Err(Error::InvalidState(format!(
                "{order_type} order is not a trailing stop"
            ))),
        }
    }
}

impl TrailingAmount {
    /// (`auxPrice`, `trailingPercent`) with the unused one unset
    fn into_wire(self) -> (Price, Decimal) {
        match self {
            TrailingAmount::Distance(d) => (d, UNSET_DOUBLE),
            TrailingAmount::Percent(p) => (UNSET_DOUBLE, p),
        }
    }

    pub(crate) fn from_wire(aux_price: Price, trailing_percent: Decimal) -> Option<Self> {
        match (aux_price.is_set(), trailing_percent.is_set()) {
            (true, false) => Some(TrailingAmount::Distance(aux_price)),
            (false, true) => Some(TrailingAmount::Percent(trailing_percent)),
            _ => None,
        }
    }
}

fn validate_trailing(aux_price: Price, trailing_percent: Decimal) -> Result<()> {
    match TrailingAmount::from_wire(aux_price, trailing_percent) {
        Some(TrailingAmount::Distance(d)) => require_positive("auxPrice", d).map(drop),
        Some(TrailingAmount::Percent(p)) => {
            require_positive("trailingPercent", p)?;
            if p >= Decimal::ONE_HUNDRED {
                return Err(Error::Validation(format!(
                    "trailingPercent must be < 100, got {p}"
                )));
            }
            Ok(())
        }
        None => Err(Error::Validation(
            "Exactly one of auxPrice (trailing amount) or trailingPercent must be specified"
                .to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_price_variants() {
        assert!(OrderKind::Market.validate().is_ok());
        assert!(OrderKind::limit(dec!(104.50)).validate().is_ok());
        assert!(OrderKind::limit(UNSET_DOUBLE).validate().is_err());
        assert!(OrderKind::stop(UNSET_DOUBLE).validate().is_err());
        assert!(OrderKind::stop_limit(dec!(150.50), UNSET_DOUBLE).validate().is_err());
        assert!(OrderKind::stop_limit(UNSET_DOUBLE, dec!(150.00)).validate().is_err());
        assert!(OrderKind::stop_limit(dec!(150.50), dec!(150.00)).validate().is_ok());
    }

    #[test]
    fn test_trailing_requires_exactly_one_parameter() {
        let neither = OrderKind::TrailingStopMarket {
            aux_price: UNSET_DOUBLE,
            trailing_percent: UNSET_DOUBLE,
            trail_stop_price: UNSET_DOUBLE,
            extreme_price: UNSET_DOUBLE,
            triggered: false,
            trigger_price: UNSET_DOUBLE,
        };
        let err = neither.validate().unwrap_err();
        assert!(err.to_string().contains("Exactly one"));

        let both = OrderKind::TrailingStopMarket {
            aux_price: dec!(2.00),
            trailing_percent: dec!(2.5),
            trail_stop_price: UNSET_DOUBLE,
            extreme_price: UNSET_DOUBLE,
            triggered: false,
            trigger_price: UNSET_DOUBLE,
        };
        assert!(both.validate().unwrap_err().to_string().contains("Exactly one"));
    }

    #[test]
    fn test_trailing_amount_bounds() {
        let pct = OrderKind::trailing_stop_market(TrailingAmount::Percent(dec!(100)));
        assert!(pct.validate().is_err());

        let dist = OrderKind::trailing_stop_market(TrailingAmount::Distance(dec!(-1)));
        assert!(dist.validate().is_err());

        let offset = OrderKind::trailing_stop_limit(TrailingAmount::Percent(dec!(1.5)), dec!(-0.25));
        assert!(offset.validate().is_err());

        let ok = OrderKind::trailing_stop_limit(TrailingAmount::Distance(dec!(2)), dec!(0.50));
        assert!(ok.validate().is_ok());
        assert_eq!(ok.aux_price(), dec!(2));
        assert!(ok.trailing_percent().is_unset());
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let mut kind = OrderKind::stop(dec!(145.00));
        assert!(!kind.is_triggered());
        assert!(kind.trigger(dec!(144.90)).unwrap());
        assert!(!kind.trigger(dec!(140.00)).unwrap());
        assert!(kind.is_triggered());
        assert_eq!(kind.trigger_price(), dec!(144.90));

        let mut limit = OrderKind::limit(dec!(1));
        assert!(matches!(limit.trigger(dec!(1)), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_order_type_codes() {
        assert_eq!(OrderKind::Market.order_type(), "MKT");
        assert_eq!(OrderKind::stop_limit(dec!(1), dec!(1)).order_type(), "STP LMT");
        assert_eq!(
            OrderKind::trailing_stop_limit(TrailingAmount::Percent(dec!(1)), dec!(0)).order_type(),
            "TRAIL LIMIT"
        );
    }
}
