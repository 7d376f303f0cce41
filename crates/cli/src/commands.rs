//! Subcommand implementations.

use common::{CouponId, OrderId, PromotionId};
use domain::{Coupon, DomainError, OrderService, Promotion, PromotionUsageLedger};
use sqlx::postgres::PgPoolOptions;
use store::{PostgresStore, StoreError};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}

pub async fn connect(config: &Config) -> Result<PostgresStore, CliError> {
    tracing::debug!(max_connections = config.max_connections, "connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(PostgresStore::new(pool))
}

pub async fn migrate(store: &PostgresStore) -> Result<(), CliError> {
    tracing::info!("running migrations");
    store.run_migrations().await?;
    tracing::info!("migrations complete");
    Ok(())
}

/// Ledger lookups only need ids; names and limits are not stored here.
fn promotion_refs(ids: &[PromotionId]) -> Vec<Promotion> {
    ids.iter()
        .map(|&id| Promotion {
            id,
            name: String::new(),
            usage_limit: None,
        })
        .collect()
}

fn coupon_refs(ids: &[CouponId]) -> Vec<Coupon> {
    ids.iter()
        .map(|&id| Coupon {
            id,
            promotion_id: PromotionId::nil(),
            code: String::new(),
            usage_limit: None,
        })
        .collect()
}

pub async fn usage(
    store: PostgresStore,
    promotion_ids: &[PromotionId],
    coupon_ids: &[CouponId],
    email: Option<&str>,
) -> Result<(), CliError> {
    let ledger = PromotionUsageLedger::new(store);
    let promotions = promotion_refs(promotion_ids);
    let counts = ledger
        .get_usage_multiple(&promotions, &coupon_refs(coupon_ids), email)
        .await?;

    for promotion in &promotions {
        let count = counts.get(&promotion.id).copied().unwrap_or(0);
        println!("{}\t{count}", promotion.id);
    }
    Ok(())
}

pub async fn purge(store: PostgresStore, promotion_ids: &[PromotionId]) -> Result<(), CliError> {
    let ledger = PromotionUsageLedger::new(store);
    let deleted = ledger.delete_usage(&promotion_refs(promotion_ids)).await?;
    tracing::info!(deleted, "promotion usage purged");
    println!("{deleted}");
    Ok(())
}

pub async fn show_order(store: PostgresStore, order_id: OrderId) -> Result<(), CliError> {
    let service = OrderService::new(store);
    let order = service
        .load(order_id)
        .await?
        .ok_or(CliError::OrderNotFound(order_id))?;

    println!("id:           {}", order.id());
    println!("type:         {}", order.order_type());
    println!("number:       {}", order.order_number());
    println!("state:        {}", order.state());
    if let Some(store_id) = order.store_id() {
        println!("store:        {store_id}");
    }
    if let Some(owner_id) = order.owner_id() {
        println!("owner:        {owner_id}");
    }
    println!("email:        {}", order.email().unwrap_or_default());
    println!("hostname:     {}", order.hostname().unwrap_or_default());
    println!("line items:   {}", order.line_item_ids().len());
    println!("created:      {}", order.created_at().to_rfc3339());
    println!("changed:      {}", order.changed_at().to_rfc3339());
    Ok(())
}
