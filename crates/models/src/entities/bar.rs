use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sentinel::{
    Sentinel, UNSET_DOUBLE, UNSET_INTEGER, checked, require_non_negative, require_price,
    unset_decimal, unset_double, unset_integer,
};
use crate::values::{Price, Quantity, Timestamp};

/// OHLCV bar.
///
/// Validated on construction: every price set, `volume >= 0`, and
/// `low <= open, close <= high`. `average` (WAP) and `barCount` are
/// sentinel-typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedBar")]
pub struct BarData {
    date: Timestamp,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
    volume: Quantity,
    #[serde(with = "unset_decimal")]
    average: Price,
    bar_count: i32,
}

impl BarData {
    pub fn new(
        date: Timestamp,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Result<Self> {
        let bar = Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            average: UNSET_DOUBLE,
            bar_count: UNSET_INTEGER,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Attach the weighted average price and trade count
    pub fn with_wap(mut self, average: Price, bar_count: i32) -> Result<Self> {
        self.average = average;
        self.bar_count = bar_count;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        require_price("open", self.open)?;
        require_price("high", self.high)?;
        require_price("low", self.low)?;
        require_price("close", self.close)?;
        require_non_negative("volume", self.volume)?;

        if self.high < self.low {
            return Err(bar_error("High", self.high, ">=", "Low", self.low));
        }
        if self.high < self.open {
            return Err(bar_error("High", self.high, ">=", "Open", self.open));
        }
        if self.high < self.close {
            return Err(bar_error("High", self.high, ">=", "Close", self.close));
        }
        if self.low > self.open {
            return Err(bar_error("Low", self.low, "<=", "Open", self.open));
        }
        if self.low > self.close {
            return Err(bar_error("Low", self.low, "<=", "Close", self.close));
        }

        if self.average.is_set() && self.average < Decimal::ZERO {
            return Err(Error::Validation(format!(
                "average must be >= 0, got {}",
                self.average
            )));
        }
        if self.bar_count.is_set() && self.bar_count < 0 {
            return Err(Error::Validation(format!(
                "barCount must be >= 0, got {}",
                self.bar_count
            )));
        }
        Ok(())
    }

    pub fn date(&self) -> Timestamp {
        self.date
    }

    pub fn open(&self) -> Price {
        self.open
    }

    pub fn high(&self) -> Price {
        self.high
    }

    pub fn low(&self) -> Price {
        self.low
    }

    pub fn close(&self) -> Price {
        self.close
    }

    pub fn volume(&self) -> Quantity {
        self.volume
    }

    /// WAP, `UNSET_DOUBLE` when not supplied
    pub fn average(&self) -> Price {
        self.average
    }

    /// Trade count, `UNSET_INTEGER` when not supplied
    pub fn bar_count(&self) -> i32 {
        self.bar_count
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> Result<Price> {
        let sum = checked("typicalPrice", self.high.checked_add(self.low))?;
        let sum = checked("typicalPrice", sum.checked_add(self.close))?;
        checked("typicalPrice", sum.checked_div(Decimal::from(3)))
    }

    /// high - low
    pub fn range(&self) -> Result<Price> {
        checked("range", self.high.checked_sub(self.low))
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: Price) -> Result<Price> {
        require_price("prevClose", prev_close)?;
        let hc = checked("trueRange", self.high.checked_sub(prev_close))?.abs();
        let lc = checked("trueRange", self.low.checked_sub(prev_close))?.abs();
        Ok(self.range()?.max(hc).max(lc))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedBar {
    date: Timestamp,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
    volume: Quantity,
    #[serde(with = "unset_decimal", default = "unset_double")]
    average: Price,
    #[serde(default = "unset_integer")]
    bar_count: i32,
}

impl TryFrom<UncheckedBar> for BarData {
    type Error = Error;

    fn try_from(raw: UncheckedBar) -> Result<Self> {
        BarData::new(raw.date, raw.open, raw.high, raw.low, raw.close, raw.volume)?
            .with_wap(raw.average, raw.bar_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn date() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    fn sample_bar() -> BarData {
        BarData::new(
            date(),
            dec!(100.00),
            dec!(105.00),
            dec!(99.00),
            dec!(104.00),
            dec!(1000000),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_bar() {
        let bar = sample_bar();
        assert_eq!(bar.open(), dec!(100.00));
        assert_eq!(bar.volume(), dec!(1000000));
        assert!(bar.average().is_unset());
        assert!(bar.bar_count().is_unset());
    }

    #[test]
    fn test_low_above_high_rejected() {
        let err = BarData::new(
            date(),
            dec!(100.00),
            dec!(105.00),
            dec!(106.00),
            dec!(104.00),
            dec!(1000000),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("High (105.00) must be >= Low (106.00)"));
    }

    #[test]
    fn test_ohlc_relationships() {
        let d = date();
        // open above high
        assert!(BarData::new(d, dec!(106), dec!(105), dec!(99), dec!(104), dec!(1)).is_err());
        // close above high
        assert!(BarData::new(d, dec!(100), dec!(105), dec!(99), dec!(106), dec!(1)).is_err());
        // open below low
        assert!(BarData::new(d, dec!(98), dec!(105), dec!(99), dec!(104), dec!(1)).is_err());
        // close below low
        assert!(BarData::new(d, dec!(100), dec!(105), dec!(99), dec!(98), dec!(1)).is_err());
        // flat bar is fine
        assert!(BarData::new(d, dec!(100), dec!(100), dec!(100), dec!(100), dec!(0)).is_ok());
    }

    #[test]
    fn test_negative_volume_and_unset_price_rejected() {
        let d = date();
        assert!(BarData::new(d, dec!(100), dec!(105), dec!(99), dec!(104), dec!(-1)).is_err());
        assert!(BarData::new(d, UNSET_DOUBLE, dec!(105), dec!(99), dec!(104), dec!(1)).is_err());
    }

    #[test]
    fn test_wap_fields() {
        let bar = sample_bar().with_wap(dec!(102.10), 5321).unwrap();
        assert_eq!(bar.average(), dec!(102.10));
        assert_eq!(bar.bar_count(), 5321);
        assert!(sample_bar().with_wap(dec!(-1), 1).is_err());
        assert!(sample_bar().with_wap(UNSET_DOUBLE, -3).is_err());
    }

    #[test]
    fn test_derived_prices() {
        let bar = sample_bar();
        // (105 + 99 + 104) / 3 = 102.666...
        assert_eq!(bar.typical_price().unwrap().round_dp(4), dec!(102.6667));
        assert_eq!(bar.range().unwrap(), dec!(6.00));
        // gap from 90: |105 - 90| = 15 dominates
        assert_eq!(bar.true_range(dec!(90)).unwrap(), dec!(15));
        assert!(bar.true_range(UNSET_DOUBLE).is_err());
    }

    #[test]
    fn test_derived_prices_report_overflow() {
        let huge = Decimal::MAX - Decimal::ONE;
        let top = BarData::new(date(), huge, huge, huge, huge, dec!(1)).unwrap();
        assert!(matches!(top.typical_price(), Err(Error::Validation(_))));
        assert_eq!(top.range().unwrap(), dec!(0));

        let wide = BarData::new(date(), dec!(0), huge, -huge, dec!(0), dec!(1)).unwrap();
        assert_eq!(wide.typical_price().unwrap(), dec!(0));
        assert!(matches!(wide.range(), Err(Error::Validation(_))));
        assert!(matches!(wide.true_range(dec!(-10)), Err(Error::Validation(_))));
    }
}
