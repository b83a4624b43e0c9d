//! Order defaults configuration

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{Order, TimeInForce};
use crate::sentinel::{Sentinel, UNSET_INTEGER};
use crate::values::OrderId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Values stamped on orders that leave them unset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDefaults {
    #[serde(default = "crate::sentinel::unset_integer")]
    pub client_id: OrderId,
    #[serde(default)]
    pub tif: TimeInForce,
    /// `false` holds every order (parked, not sent)
    #[serde(default = "default_transmit")]
    pub transmit: bool,
    #[serde(default)]
    pub order_ref: String,
    #[serde(default)]
    pub account: String,
}

fn default_transmit() -> bool {
    true
}

impl Default for OrderDefaults {
    fn default() -> Self {
        Self {
            client_id: UNSET_INTEGER,
            tif: TimeInForce::default(),
            transmit: true,
            order_ref: String::new(),
            account: String::new(),
        }
    }
}

/// Load order defaults from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<OrderDefaults, ConfigError> {
    let path = path.as_ref();
    debug!("Loading order defaults from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load order defaults from a JSON string
pub fn load_config_from_str(json: &str) -> Result<OrderDefaults, ConfigError> {
    let config: OrderDefaults = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the embedded default configuration
pub fn load_default_config() -> Result<OrderDefaults, ConfigError> {
    load_config_from_str(include_str!("order_defaults.json"))
}

impl OrderDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_set() && self.client_id < 0 {
            return Err(ConfigError::Invalid {
                field: "clientId",
                reason: format!("must be >= 0, got {}", self.client_id),
            });
        }
        if self.tif == TimeInForce::Gtd {
            return Err(ConfigError::Invalid {
                field: "tif",
                reason: "GTD needs a per-order goodTillDate".to_string(),
            });
        }
        Ok(())
    }

    /// Fill in what `order` left unset.
    ///
    /// Only an unset `clientId`, an empty `orderRef`/`account` and a DAY
    /// tif are replaced; `transmit: false` here holds the order.
    pub fn apply(&self, mut order: Order) -> crate::Result<Order> {
        if order.client_id.is_unset() {
            order.client_id = self.client_id;
        }
        if order.order_ref.is_empty() {
            order.order_ref.clone_from(&self.order_ref);
        }
        if order.account.is_empty() {
            order.account.clone_from(&self.account);
        }
        order.transmit &= self.transmit;
        if order.tif() == TimeInForce::Day {
            order = order.with_tif(self.tif)?;
        }
        Ok(order)
    }
}
