use std::sync::Arc;

use parking_lot::Mutex;

use super::{Fill, Status, Trade};
use crate::error::Result;
use crate::values::{Price, Timestamp};

/// Thread-safe handle to one [`Trade`].
///
/// Every mutation takes the trade's lock, so a fill callback and a status
/// poller can share the same trade without breaking
/// `filled + remaining == totalQuantity`. Clones share the same trade.
#[derive(Debug, Clone)]
pub struct SharedTrade {
    inner: Arc<Mutex<Trade>>,
}

impl SharedTrade {
    pub fn new(trade: Trade) -> Self {
        Self {
            inner: Arc::new(Mutex::new(trade)),
        }
    }

    pub fn apply_fill(&self, fill: Fill) -> Result<()> {
        self.inner.lock().apply_fill(fill)
    }

    pub fn transition_status(&self, next: Status) -> Result<()> {
        self.inner.lock().transition_status(next)
    }

    pub fn transition_status_at(
        &self,
        next: Status,
        time: Timestamp,
        message: impl Into<String>,
    ) -> Result<()> {
        self.inner.lock().transition_status_at(next, time, message)
    }

    pub fn trigger(&self) -> Result<()> {
        self.inner.lock().trigger()
    }

    pub fn trigger_at(&self, price: Price, time: Timestamp) -> Result<()> {
        self.inner.lock().trigger_at(price, time)
    }

    pub fn advance_trail(&self, market_price: Price) -> Result<bool> {
        self.inner.lock().advance_trail(market_price)
    }

    pub fn append_log(&self, status: Status, message: impl Into<String>, time: Timestamp) {
        self.inner.lock().append_log(status, message, time);
    }

    pub fn status(&self) -> Status {
        self.inner.lock().status()
    }

    /// Read under the lock without cloning
    pub fn with_trade<R>(&self, f: impl FnOnce(&Trade) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> Trade {
        self.inner.lock().clone()
    }
}

impl From<Trade> for SharedTrade {
    fn from(trade: Trade) -> Self {
        Self::new(trade)
    }
}
