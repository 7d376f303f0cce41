use std::collections::HashMap;

use async_trait::async_trait;
use common::{CouponId, LineItemId, Money, OrderId, ProfileId, PromotionId, StoreId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    LineItem, OrderRecord, Result, StoreError, UsageCount, UsageQuery, UsageRecord,
    store::{LineItemStore, OrderStore, UsageStore},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::debug!("commerce migrations applied");
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        let data_json: serde_json::Value = row.try_get("data")?;
        let data: HashMap<String, serde_json::Value> = serde_json::from_value(data_json)?;
        let line_item_ids: Vec<Uuid> = row.try_get("line_item_ids")?;

        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get("id")?),
            order_type: row.try_get("order_type")?,
            order_number: row.try_get("order_number")?,
            store_id: StoreId::from_uuid(row.try_get("store_id")?),
            owner_id: row.try_get::<Option<Uuid>, _>("owner_id")?.map(UserId::from),
            email: row.try_get("mail")?,
            hostname: row.try_get("hostname")?,
            billing_profile_id: row
                .try_get::<Option<Uuid>, _>("billing_profile_id")?
                .map(ProfileId::from),
            state: row.try_get("state")?,
            line_item_ids: line_item_ids.into_iter().map(LineItemId::from).collect(),
            data,
            created_at: row.try_get("created_at")?,
            changed_at: row.try_get("changed_at")?,
        })
    }

    fn row_to_line_item(row: PgRow) -> Result<LineItem> {
        let quantity: i64 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity).map_err(|_| StoreError::InvalidRow {
            table: "commerce_line_items",
            reason: format!("quantity {quantity} out of range"),
        })?;

        Ok(LineItem {
            id: LineItemId::from_uuid(row.try_get("id")?),
            order_id: row.try_get::<Option<Uuid>, _>("order_id")?.map(OrderId::from),
            title: row.try_get("title")?,
            quantity,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_usage(row: PgRow) -> Result<UsageRecord> {
        Ok(UsageRecord {
            promotion_id: PromotionId::from_uuid(row.try_get("promotion_id")?),
            coupon_id: row.try_get::<Option<Uuid>, _>("coupon_id")?.map(CouponId::from),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            email: row.try_get("mail")?,
        })
    }

    /// Builds the WHERE clause for a usage query. `$1` is always the
    /// promotion id list; coupon and email parameters follow when present.
    fn usage_where_clause(query: &UsageQuery) -> String {
        let mut sql = String::from(" WHERE promotion_id = ANY($1)");
        let mut param_count = 1;

        if query.coupon_filter().is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND coupon_id = ANY(${param_count})"));
        }
        if query.email_filter().is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND mail = ${param_count}"));
        }

        sql
    }

    fn bind_usage_query<'q>(
        mut sqlx_query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
        query: &'q UsageQuery,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        let promotion_ids: Vec<Uuid> = query.promotion_ids.iter().map(|p| p.as_uuid()).collect();
        sqlx_query = sqlx_query.bind(promotion_ids);

        if let Some(coupons) = query.coupon_filter() {
            let coupon_ids: Vec<Uuid> = coupons.iter().map(|c| c.as_uuid()).collect();
            sqlx_query = sqlx_query.bind(coupon_ids);
        }
        if let Some(email) = query.email_filter() {
            sqlx_query = sqlx_query.bind(email);
        }

        sqlx_query
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn save_order(&self, order: &OrderRecord) -> Result<()> {
        let data_json = serde_json::to_value(&order.data)?;
        let line_item_ids: Vec<Uuid> = order.line_item_ids.iter().map(|id| id.as_uuid()).collect();

        sqlx::query(
            r#"
            INSERT INTO commerce_orders (
                id, order_type, order_number, store_id, owner_id, mail, hostname,
                billing_profile_id, state, line_item_ids, data, created_at, changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                order_type = EXCLUDED.order_type,
                order_number = EXCLUDED.order_number,
                store_id = EXCLUDED.store_id,
                owner_id = EXCLUDED.owner_id,
                mail = EXCLUDED.mail,
                hostname = EXCLUDED.hostname,
                billing_profile_id = EXCLUDED.billing_profile_id,
                state = EXCLUDED.state,
                line_item_ids = EXCLUDED.line_item_ids,
                data = EXCLUDED.data,
                created_at = EXCLUDED.created_at,
                changed_at = EXCLUDED.changed_at
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_type)
        .bind(&order.order_number)
        .bind(order.store_id.as_uuid())
        .bind(order.owner_id.map(|id| id.as_uuid()))
        .bind(&order.email)
        .bind(&order.hostname)
        .bind(order.billing_profile_id.map(|id| id.as_uuid()))
        .bind(&order.state)
        .bind(line_item_ids)
        .bind(data_json)
        .bind(order.created_at)
        .bind(order.changed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, order_type, order_number, store_id, owner_id, mail, hostname,
                   billing_profile_id, state, line_item_ids, data, created_at, changed_at
            FROM commerce_orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn delete_orders(&self, ids: &[OrderId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM commerce_orders WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted = result.rows_affected();
        tracing::debug!(table = "commerce_orders", deleted, "rows deleted");
        Ok(deleted)
    }
}

#[async_trait]
impl LineItemStore for PostgresStore {
    async fn get_line_item(&self, id: LineItemId) -> Result<Option<LineItem>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, order_id, title, quantity, unit_price_cents
            FROM commerce_line_items
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_line_item).transpose()
    }

    async fn save_line_item(&self, item: &LineItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO commerce_line_items (id, order_id, title, quantity, unit_price_cents)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                order_id = EXCLUDED.order_id,
                title = EXCLUDED.title,
                quantity = EXCLUDED.quantity,
                unit_price_cents = EXCLUDED.unit_price_cents
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.map(|id| id.as_uuid()))
        .bind(&item.title)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price.cents())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_line_items(&self, ids: &[LineItemId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM commerce_line_items WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted = result.rows_affected();
        tracing::debug!(table = "commerce_line_items", deleted, "rows deleted");
        Ok(deleted)
    }
}

#[async_trait]
impl UsageStore for PostgresStore {
    async fn insert_usage(&self, record: &UsageRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO commerce_promotion_usage (promotion_id, coupon_id, order_id, mail)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.promotion_id.as_uuid())
        .bind(record.coupon_id.map(|id| id.as_uuid()))
        .bind(record.order_id.as_uuid())
        .bind(&record.email)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_usage(&self, promotion_ids: &[PromotionId]) -> Result<u64> {
        // `promotion_id IN ()` is not valid SQL in most backends.
        if promotion_ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = promotion_ids.iter().map(|id| id.as_uuid()).collect();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM commerce_promotion_usage WHERE promotion_id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted = result.rows_affected();
        tracing::debug!(table = "commerce_promotion_usage", deleted, "rows deleted");
        Ok(deleted)
    }

    async fn count_usage(&self, query: &UsageQuery) -> Result<Vec<UsageCount>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT promotion_id, COUNT(promotion_id) AS count FROM commerce_promotion_usage{} GROUP BY promotion_id",
            Self::usage_where_clause(query)
        );
        let rows = Self::bind_usage_query(sqlx::query(&sql), query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let count: i64 = row.try_get("count")?;
                Ok(UsageCount {
                    promotion_id: PromotionId::from_uuid(row.try_get("promotion_id")?),
                    count: count.max(0) as u64,
                })
            })
            .collect()
    }

    async fn list_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT promotion_id, coupon_id, order_id, mail FROM commerce_promotion_usage{} ORDER BY usage_id ASC",
            Self::usage_where_clause(query)
        );
        let rows = Self::bind_usage_query(sqlx::query(&sql), query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_usage).collect()
    }
}
