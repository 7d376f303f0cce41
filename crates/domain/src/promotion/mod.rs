//! Promotions, coupons and the usage ledger counting their redemptions.

mod ledger;

pub use ledger::PromotionUsageLedger;

use common::{CouponId, PromotionId};
use serde::{Deserialize, Serialize};

/// A promotion reference.
///
/// `usage_limit` caps total redemptions; `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    pub name: String,
    pub usage_limit: Option<u64>,
}

impl Promotion {
    /// Creates an unlimited promotion.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PromotionId::new(),
            name: name.into(),
            usage_limit: None,
        }
    }

    /// Sets the total redemption limit.
    pub fn with_usage_limit(mut self, limit: u64) -> Self {
        self.usage_limit = Some(limit);
        self
    }
}

/// A coupon unlocking a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub promotion_id: PromotionId,
    pub code: String,
    pub usage_limit: Option<u64>,
}

impl Coupon {
    /// Creates an unlimited coupon for a promotion.
    pub fn new(promotion: &Promotion, code: impl Into<String>) -> Self {
        Self {
            id: CouponId::new(),
            promotion_id: promotion.id,
            code: code.into(),
            usage_limit: None,
        }
    }

    /// Sets the redemption limit for this coupon.
    pub fn with_usage_limit(mut self, limit: u64) -> Self {
        self.usage_limit = Some(limit);
        self
    }
}
