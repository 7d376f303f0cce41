use async_trait::async_trait;
use common::{LineItemId, OrderId, PromotionId};

use crate::{LineItem, OrderRecord, Result, UsageCount, UsageQuery, UsageRecord};

/// Persistence for orders.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts or replaces an order.
    async fn save_order(&self, order: &OrderRecord) -> Result<()>;

    /// Retrieves an order by id.
    ///
    /// Returns None if the order doesn't exist.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Deletes the given orders, returning how many rows were removed.
    ///
    /// An empty id list is a no-op.
    async fn delete_orders(&self, ids: &[OrderId]) -> Result<u64>;
}

/// Persistence for line items.
#[async_trait]
pub trait LineItemStore: Send + Sync {
    /// Retrieves a line item by id.
    async fn get_line_item(&self, id: LineItemId) -> Result<Option<LineItem>>;

    /// Inserts or replaces a line item.
    async fn save_line_item(&self, item: &LineItem) -> Result<()>;

    /// Deletes the given line items in one operation.
    ///
    /// An empty id list is a no-op.
    async fn delete_line_items(&self, ids: &[LineItemId]) -> Result<u64>;
}

/// Append-only storage for promotion usage records.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Appends one usage record atomically.
    async fn insert_usage(&self, record: &UsageRecord) -> Result<()>;

    /// Deletes every record belonging to one of the given promotions.
    ///
    /// An empty id list is a no-op and never reaches the backend.
    async fn delete_usage(&self, promotion_ids: &[PromotionId]) -> Result<u64>;

    /// Counts matching records grouped by promotion.
    ///
    /// Like a SQL `GROUP BY`, promotions without matching records are absent
    /// from the result.
    async fn count_usage(&self, query: &UsageQuery) -> Result<Vec<UsageCount>>;

    /// Lists matching records in insertion order.
    async fn list_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>>;
}
