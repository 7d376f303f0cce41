use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{LineItemId, OrderId, PromotionId};
use tokio::sync::RwLock;

use crate::{
    LineItem, OrderRecord, Result, UsageCount, UsageQuery, UsageRecord,
    store::{LineItemStore, OrderStore, UsageStore},
};

/// Write counters kept by [`InMemoryStore`].
#[derive(Debug, Default)]
struct WriteStats {
    order_saves: AtomicUsize,
    line_item_saves: AtomicUsize,
    line_item_delete_calls: AtomicUsize,
}

/// In-memory store implementation for testing.
///
/// Implements every store trait with the same semantics as the PostgreSQL
/// implementation, and records write counts so tests can assert on the
/// number of round trips an operation performed.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
    line_items: Arc<RwLock<HashMap<LineItemId, LineItem>>>,
    usage: Arc<RwLock<Vec<UsageRecord>>>,
    stats: Arc<WriteStats>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of order writes performed.
    pub fn order_save_count(&self) -> usize {
        self.stats.order_saves.load(Ordering::SeqCst)
    }

    /// Returns the number of line item writes performed.
    pub fn line_item_save_count(&self) -> usize {
        self.stats.line_item_saves.load(Ordering::SeqCst)
    }

    /// Returns the number of bulk line item deletes that reached the store.
    pub fn line_item_delete_calls(&self) -> usize {
        self.stats.line_item_delete_calls.load(Ordering::SeqCst)
    }

    /// Returns the total number of usage records stored.
    pub async fn usage_count(&self) -> usize {
        self.usage.read().await.len()
    }

    /// Returns the number of line items stored.
    pub async fn line_item_count(&self) -> usize {
        self.line_items.read().await.len()
    }

    /// Clears all rows. Write counters are kept.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
        self.line_items.write().await.clear();
        self.usage.write().await.clear();
    }

    fn matches(query: &UsageQuery, record: &UsageRecord) -> bool {
        if !query.promotion_ids.contains(&record.promotion_id) {
            return false;
        }
        if let Some(coupons) = query.coupon_filter() {
            match record.coupon_id {
                Some(coupon) if coupons.contains(&coupon) => {}
                _ => return false,
            }
        }
        if let Some(email) = query.email_filter()
            && record.email != email
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn save_order(&self, order: &OrderRecord) -> Result<()> {
        self.orders.write().await.insert(order.id, order.clone());
        self.stats.order_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn delete_orders(&self, ids: &[OrderId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut orders = self.orders.write().await;
        let removed = ids.iter().filter_map(|id| orders.remove(id)).count();
        Ok(removed as u64)
    }
}

#[async_trait]
impl LineItemStore for InMemoryStore {
    async fn get_line_item(&self, id: LineItemId) -> Result<Option<LineItem>> {
        Ok(self.line_items.read().await.get(&id).cloned())
    }

    async fn save_line_item(&self, item: &LineItem) -> Result<()> {
        self.line_items.write().await.insert(item.id, item.clone());
        self.stats.line_item_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_line_items(&self, ids: &[LineItemId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.stats
            .line_item_delete_calls
            .fetch_add(1, Ordering::SeqCst);
        let mut items = self.line_items.write().await;
        let removed = ids.iter().filter_map(|id| items.remove(id)).count();
        Ok(removed as u64)
    }
}

#[async_trait]
impl UsageStore for InMemoryStore {
    async fn insert_usage(&self, record: &UsageRecord) -> Result<()> {
        self.usage.write().await.push(record.clone());
        Ok(())
    }

    async fn delete_usage(&self, promotion_ids: &[PromotionId]) -> Result<u64> {
        if promotion_ids.is_empty() {
            return Ok(0);
        }
        let mut usage = self.usage.write().await;
        let before = usage.len();
        usage.retain(|r| !promotion_ids.contains(&r.promotion_id));
        Ok((before - usage.len()) as u64)
    }

    async fn count_usage(&self, query: &UsageQuery) -> Result<Vec<UsageCount>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let usage = self.usage.read().await;
        let mut counts: HashMap<PromotionId, u64> = HashMap::new();
        for record in usage.iter().filter(|r| Self::matches(query, r)) {
            *counts.entry(record.promotion_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(promotion_id, count)| UsageCount {
                promotion_id,
                count,
            })
            .collect())
    }

    async fn list_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let usage = self.usage.read().await;
        Ok(usage
            .iter()
            .filter(|r| Self::matches(query, r))
            .cloned()
            .collect())
    }
}
