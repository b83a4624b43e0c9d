use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time-in-force instructions for order validity (`tif`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Day order: automatically canceled at end of trading day
    #[default]
    #[serde(rename = "DAY")]
    Day,

    /// Good Till Canceled: order remains active until explicitly canceled
    #[serde(rename = "GTC")]
    Gtc,

    /// Immediate or Cancel: execute immediately (partially or fully) and cancel unfilled portion
    #[serde(rename = "IOC")]
    Ioc,

    /// Fill or Kill: execute immediately and completely, or cancel entire order
    #[serde(rename = "FOK")]
    Fok,

    /// Good Till Date: active until the order's `goodTillDate`
    #[serde(rename = "GTD")]
    Gtd,

    /// Market-on-open / limit-on-open
    #[serde(rename = "OPG")]
    Opg,
}

impl TimeInForce {
    /// Check if an order with this tif has expired.
    ///
    /// `good_till` is only consulted for GTD, `day_end` only for DAY.
    pub fn is_expired(
        &self,
        current_time: DateTime<Utc>,
        good_till: Option<DateTime<Utc>>,
        day_end: Option<DateTime<Utc>>,
    ) -> bool {
        match self {
            TimeInForce::Gtd => good_till.is_some_and(|expiry| current_time >= expiry),
            TimeInForce::Day => day_end.is_some_and(|end| current_time >= end),
            _ => false,
        }
    }

    /// Returns true if partial fills are allowed
    pub fn allows_partial_fill(&self) -> bool {
        !matches!(self, TimeInForce::Fok)
    }

    /// IB `tif` code
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Day => "DAY",
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
            TimeInForce::Gtd => "GTD",
            TimeInForce::Opg => "OPG",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_gtd_expiry() {
        let expiry = Utc.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 1, 15, 15, 59, 59).unwrap();

        assert!(!TimeInForce::Gtd.is_expired(before, Some(expiry), None));
        assert!(TimeInForce::Gtd.is_expired(expiry, Some(expiry), None));
        assert!(!TimeInForce::Gtc.is_expired(expiry, Some(expiry), Some(expiry)));
    }

    #[test]
    fn test_day_expiry_and_partials() {
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 21, 0, 0).unwrap();
        assert!(TimeInForce::Day.is_expired(end, None, Some(end)));
        assert!(!TimeInForce::Day.is_expired(end, None, None));
        assert!(!TimeInForce::Fok.allows_partial_fill());
        assert!(TimeInForce::Ioc.allows_partial_fill());
        assert_eq!(TimeInForce::default(), TimeInForce::Day);
        assert_eq!(TimeInForce::Fok.to_string(), "FOK");
    }
}
