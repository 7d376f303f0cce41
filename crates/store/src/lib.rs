//! Persistence layer for the commerce bookkeeping core.
//!
//! Provides the row types written by the domain layer, the store traits the
//! domain depends on, and two implementations: an in-memory store for tests
//! and embedding, and a PostgreSQL store backed by `sqlx`.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::UsageQuery;
pub use record::{LineItem, OrderRecord, UsageCount, UsageRecord};
pub use store::{LineItemStore, OrderStore, UsageStore};
