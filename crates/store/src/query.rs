use common::{CouponId, PromotionId};

/// Filter for promotion usage queries.
///
/// Empty `coupon_ids` means usages are counted regardless of coupon, and a
/// missing or empty `email` means usages are counted regardless of email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageQuery {
    /// Promotions to match (any of these).
    pub promotion_ids: Vec<PromotionId>,

    /// Coupons to match (any of these). Ignored when empty.
    pub coupon_ids: Vec<CouponId>,

    /// Email to match exactly. Ignored when `None` or empty.
    pub email: Option<String>,
}

impl UsageQuery {
    /// Creates a query for the given promotions.
    pub fn for_promotions(promotion_ids: impl IntoIterator<Item = PromotionId>) -> Self {
        Self {
            promotion_ids: promotion_ids.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Narrows the query to the given coupons.
    pub fn coupons(mut self, coupon_ids: impl IntoIterator<Item = CouponId>) -> Self {
        self.coupon_ids = coupon_ids.into_iter().collect();
        self
    }

    /// Narrows the query to one email address.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns the email filter, if one applies.
    pub fn email_filter(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    /// Returns the coupon filter, if one applies.
    pub fn coupon_filter(&self) -> Option<&[CouponId]> {
        (!self.coupon_ids.is_empty()).then_some(self.coupon_ids.as_slice())
    }

    /// Returns true if no promotion can match.
    pub fn is_empty(&self) -> bool {
        self.promotion_ids.is_empty()
    }
}
