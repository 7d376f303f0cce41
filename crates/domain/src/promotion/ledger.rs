//! Promotion usage ledger.
//!
//! Every redemption appends one record; counts are read back with grouped
//! queries. The ledger only counts. Enforcing a limit is a read followed by
//! a conditional [`PromotionUsageLedger::add_usage`], and two concurrent
//! redemptions can both pass the read before either insert lands. Callers
//! that need hard limits must run the check and the insert inside one
//! serializable transaction or an equivalent optimistic guard.

use std::collections::HashMap;

use common::PromotionId;
use store::{UsageQuery, UsageRecord, UsageStore};

use crate::error::DomainError;
use crate::order::Order;

use super::{Coupon, Promotion};

/// Append-only record of promotion and coupon redemptions.
pub struct PromotionUsageLedger<S: UsageStore> {
    store: S,
}

impl<S: UsageStore> PromotionUsageLedger<S> {
    /// Creates a ledger over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records one redemption of `promotion` by `order`.
    ///
    /// No deduplication: redeeming twice records two usages.
    #[tracing::instrument(skip_all, fields(promotion_id = %promotion.id, order_id = %order.id()))]
    pub async fn add_usage(
        &self,
        order: &Order,
        promotion: &Promotion,
        coupon: Option<&Coupon>,
    ) -> Result<(), DomainError> {
        let record = UsageRecord {
            promotion_id: promotion.id,
            coupon_id: coupon.map(|c| c.id),
            order_id: order.id(),
            email: order.email().unwrap_or_default().to_string(),
        };

        self.store.insert_usage(&record).await?;
        metrics::counter!("promotion_usage_recorded_total").increment(1);
        Ok(())
    }

    /// Deletes every usage of the given promotions.
    ///
    /// An empty slice is a no-op. Returns the number of records removed.
    #[tracing::instrument(skip_all, fields(promotions = promotions.len()))]
    pub async fn delete_usage(&self, promotions: &[Promotion]) -> Result<u64, DomainError> {
        if promotions.is_empty() {
            return Ok(0);
        }
        let ids: Vec<PromotionId> = promotions.iter().map(|p| p.id).collect();

        let deleted = self.store.delete_usage(&ids).await?;
        metrics::counter!("promotion_usage_deleted_total").increment(deleted);
        tracing::debug!(deleted, "promotion usage deleted");
        Ok(deleted)
    }

    /// Returns how often `promotion` was redeemed, optionally narrowed to
    /// one coupon and/or one email. No matching records means zero.
    pub async fn get_usage(
        &self,
        promotion: &Promotion,
        coupon: Option<&Coupon>,
        email: Option<&str>,
    ) -> Result<u64, DomainError> {
        let coupons: Vec<Coupon> = coupon.into_iter().cloned().collect();
        let counts = self
            .get_usage_multiple(std::slice::from_ref(promotion), &coupons, email)
            .await?;
        Ok(counts.get(&promotion.id).copied().unwrap_or(0))
    }

    /// Returns the usage count of each promotion.
    ///
    /// Every requested promotion appears in the result, with zero when it
    /// has no matching records. An empty `coupons` slice counts usages with
    /// or without a coupon; an empty or missing `email` counts all emails.
    pub async fn get_usage_multiple(
        &self,
        promotions: &[Promotion],
        coupons: &[Coupon],
        email: Option<&str>,
    ) -> Result<HashMap<PromotionId, u64>, DomainError> {
        let mut counts: HashMap<PromotionId, u64> =
            promotions.iter().map(|p| (p.id, 0)).collect();
        if counts.is_empty() {
            return Ok(counts);
        }

        let mut query = UsageQuery::for_promotions(promotions.iter().map(|p| p.id))
            .coupons(coupons.iter().map(|c| c.id));
        if let Some(email) = email.filter(|e| !e.is_empty()) {
            query = query.email(email);
        }

        for row in self.store.count_usage(&query).await? {
            if let Some(count) = counts.get_mut(&row.promotion_id) {
                *count = row.count;
            }
        }

        Ok(counts)
    }

    /// Returns how many more redemptions the limits allow, or `None` when
    /// neither the promotion nor the coupon is limited.
    ///
    /// This is a read only; see the module docs for the race between this
    /// check and a later `add_usage`.
    pub async fn remaining_usage(
        &self,
        promotion: &Promotion,
        coupon: Option<&Coupon>,
    ) -> Result<Option<u64>, DomainError> {
        let mut remaining: Option<u64> = None;

        if let Some(limit) = promotion.usage_limit {
            let used = self.get_usage(promotion, None, None).await?;
            remaining = Some(limit.saturating_sub(used));
        }

        if let Some(coupon) = coupon
            && let Some(limit) = coupon.usage_limit
        {
            let used = self.get_usage(promotion, Some(coupon), None).await?;
            let left = limit.saturating_sub(used);
            remaining = Some(remaining.map_or(left, |r| r.min(left)));
        }

        Ok(remaining)
    }

    /// Lists the usage records of the given promotions.
    pub async fn list_usage(&self, promotions: &[Promotion]) -> Result<Vec<UsageRecord>, DomainError> {
        let query = UsageQuery::for_promotions(promotions.iter().map(|p| p.id));
        Ok(self.store.list_usage(&query).await?)
    }
}
