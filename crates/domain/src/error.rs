//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the backing store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),
}

impl DomainError {
    /// Returns true if the caller may retry the surrounding transaction.
    ///
    /// Only store round-trip failures are transient; validation and
    /// reference errors need corrected input.
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::Store(e) => e.is_transient(),
            DomainError::Order(_) => false,
        }
    }
}
