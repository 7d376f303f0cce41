use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store round trip failed.
    ///
    /// Callers may retry at the transaction level.
    #[error("Store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back to its record type.
    #[error("Invalid {table} row: {reason}")]
    InvalidRow {
        table: &'static str,
        reason: String,
    },
}

impl StoreError {
    /// Returns true if retrying the surrounding transaction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
