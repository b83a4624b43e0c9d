use thiserror::Error;

use crate::entities::Status;

/// Errors raised by model construction and mutation.
///
/// Every failing operation leaves the entity exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invariant violated by the supplied input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation preconditions not met
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Status transition not permitted from the current state
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },
}

pub type Result<T> = std::result::Result<T, Error>;
