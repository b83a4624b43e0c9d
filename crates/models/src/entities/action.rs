use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Order action (`BUY` or `SELL`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl Action {
    /// Returns the opposite action
    pub fn opposite(&self) -> Self {
        match self {
            Action::Buy => Action::Sell,
            Action::Sell => Action::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            other => Err(Error::Validation(format!(
                "action must be BUY or SELL, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!("BUY".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!("SELL".parse::<Action>().unwrap(), Action::Sell);
        assert!(matches!("HOLD".parse::<Action>(), Err(Error::Validation(_))));
        assert!("buy".parse::<Action>().is_err());
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Action::Buy.opposite(), Action::Sell);
        assert_eq!(Action::Sell.opposite(), Action::Buy);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Action::Buy).unwrap(), "\"BUY\"");
        assert!(serde_json::from_str::<Action>("\"SHORT\"").is_err());
    }
}
