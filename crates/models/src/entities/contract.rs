use std::fmt;

use serde::{Deserialize, Serialize};

/// Security type (`secType`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecType {
    #[default]
    #[serde(rename = "STK")]
    Stock,
    #[serde(rename = "FUT")]
    Future,
    #[serde(rename = "OPT")]
    Option,
    #[serde(rename = "CASH")]
    Forex,
    #[serde(rename = "CRYPTO")]
    Crypto,
}

/// The instrument an order or fill refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Broker contract id, 0 when unknown
    #[serde(default)]
    pub con_id: i32,
    pub symbol: String,
    #[serde(default)]
    pub sec_type: SecType,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub currency: String,
}

impl Contract {
    pub fn new(symbol: impl Into<String>, sec_type: SecType) -> Self {
        Self {
            con_id: 0,
            symbol: symbol.into(),
            sec_type,
            exchange: String::new(),
            currency: String::new(),
        }
    }

    /// SMART-routed USD stock
    pub fn stock(symbol: impl Into<String>) -> Self {
        Self::new(symbol, SecType::Stock)
            .on_exchange("SMART")
            .in_currency("USD")
    }

    pub fn on_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn in_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_con_id(mut self, con_id: i32) -> Self {
        self.con_id = con_id;
        self
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)?;
        if !self.exchange.is_empty() {
            write!(f, "@{}", self.exchange)?;
        }
        Ok(())
    }
}
