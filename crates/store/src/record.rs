//! Rows persisted by the stores.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CouponId, LineItemId, Money, OrderId, ProfileId, PromotionId, StoreId, UserId};
use serde::{Deserialize, Serialize};

/// Persisted form of an order.
///
/// Produced by the domain layer once all required fields are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_type: String,
    pub order_number: String,
    pub store_id: StoreId,
    pub owner_id: Option<UserId>,
    pub email: Option<String>,
    pub hostname: Option<String>,
    pub billing_profile_id: Option<ProfileId>,
    pub state: String,
    pub line_item_ids: Vec<LineItemId>,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

/// A line item, referenced by id from its order.
///
/// `order_id` is the back-reference to the owning order. It is empty until
/// the order that lists the item has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: Option<OrderId>,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    /// Creates a new line item that is not yet attached to any order.
    pub fn new(title: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            id: LineItemId::new(),
            order_id: None,
            title: title.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl From<&LineItem> for LineItemId {
    fn from(item: &LineItem) -> Self {
        item.id
    }
}

/// One promotion redemption.
///
/// `coupon_id` is `None` when the promotion was applied without a coupon.
/// `email` is empty when the order had no email at redemption time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub promotion_id: PromotionId,
    pub coupon_id: Option<CouponId>,
    pub order_id: OrderId,
    pub email: String,
}

/// Result row of a grouped usage count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageCount {
    pub promotion_id: PromotionId,
    pub count: u64,
}
