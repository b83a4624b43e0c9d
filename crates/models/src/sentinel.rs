//! Reserved "unset" magnitudes for numeric fields.
//!
//! The brokerage convention never leaves a numeric field absent: an unset
//! price carries `UNSET_DOUBLE` and an unset identifier carries
//! `UNSET_INTEGER`. Consumers test with [`Sentinel::is_unset`], never with
//! `Option`.
//!
//! `Decimal` has no infinity, so `UNSET_DOUBLE` is `Decimal::MAX`: the one
//! magnitude no real price or quantity can reach. On the wire it is written
//! as `"Infinity"` (see [`unset_decimal`]).

use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Sentinel for unset decimal fields (plays the role of +infinity)
pub const UNSET_DOUBLE: Decimal = Decimal::MAX;

/// Sentinel for unset integer fields (2^31 - 1)
pub const UNSET_INTEGER: i32 = i32::MAX;

/// A numeric type with a reserved "unset" value
pub trait Sentinel: Copy + PartialEq {
    const UNSET: Self;

    /// Exact comparison against the reserved value
    fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    fn is_set(&self) -> bool {
        !self.is_unset()
    }
}

impl Sentinel for Decimal {
    const UNSET: Self = UNSET_DOUBLE;
}

impl Sentinel for i32 {
    const UNSET: Self = UNSET_INTEGER;
}

/// Free-function form of [`Sentinel::is_unset`]
pub fn is_unset<T: Sentinel>(value: T) -> bool {
    value.is_unset()
}

/// serde default for sentinel-typed decimal fields
pub fn unset_double() -> Decimal {
    UNSET_DOUBLE
}

/// serde default for sentinel-typed integer fields
pub fn unset_integer() -> i32 {
    UNSET_INTEGER
}

/// Price must carry a real value (not the sentinel)
pub(crate) fn require_price(field: &str, value: Decimal) -> Result<Decimal> {
    if value.is_unset() {
        return Err(Error::Validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Quantity-like value must be set and strictly positive
pub(crate) fn require_positive(field: &str, value: Decimal) -> Result<Decimal> {
    require_price(field, value)?;
    if value <= Decimal::ZERO {
        return Err(Error::Validation(format!(
            "{field} must be > 0, got {value}"
        )));
    }
    Ok(value)
}

/// Value must be set and not negative
pub(crate) fn require_non_negative(field: &str, value: Decimal) -> Result<Decimal> {
    require_price(field, value)?;
    if value < Decimal::ZERO {
        return Err(Error::Validation(format!(
            "{field} must be >= 0, got {value}"
        )));
    }
    Ok(value)
}

/// Unwrap a `checked_*` result. Overflow, and a result that lands on the
/// sentinel, are validation errors.
pub(crate) fn checked(field: &str, value: Option<Decimal>) -> Result<Decimal> {
    value
        .filter(|v| v.is_set())
        .ok_or_else(|| Error::Validation(format!("{field} overflows the decimal range")))
}

/// Overflow-checked sum
pub(crate) fn checked_sum(
    field: &str,
    values: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked(field, acc.checked_add(v)))
}

/// serde adapter for sentinel-typed decimals.
///
/// Writes the sentinel as `"Infinity"` and every other value in the usual
/// `rust_decimal` string form. Reads `"Infinity"`, `"inf"`, a float
/// infinity, decimal strings and plain numbers.
pub mod unset_decimal {
    use std::fmt;
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serialize, Serializer};

    use super::{Sentinel, UNSET_DOUBLE};

    pub const INFINITY: &str = "Infinity";

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_unset() {
            serializer.serialize_str(INFINITY)
        } else {
            Serialize::serialize(value, serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        deserializer.deserialize_any(UnsetDecimalVisitor)
    }

    struct UnsetDecimalVisitor;

    impl Visitor<'_> for UnsetDecimalVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a decimal number or \"Infinity\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
            let v = v.trim();
            if v.eq_ignore_ascii_case(INFINITY) || v.eq_ignore_ascii_case("inf") {
                return Ok(UNSET_DOUBLE);
            }
            Decimal::from_str(v)
                .or_else(|_| Decimal::from_scientific(v))
                .map_err(|e| E::custom(format!("invalid decimal {v:?}: {e}")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
            if v.is_infinite() && v.is_sign_positive() {
                return Ok(UNSET_DOUBLE);
            }
            Decimal::try_from(v).map_err(|e| E::custom(format!("invalid decimal {v}: {e}")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }
    }
}
