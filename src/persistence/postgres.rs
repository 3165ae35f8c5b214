use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

use super::OrderRepository;
use crate::domain::order::{Order, OrderDetails, OrderId, OrderStatus, TaxpayerId, Transition};

const ORDER_COLUMNS: &str = "id, taxpayer_id, product_id, quantity, status, created_at";

/// PostgreSQL-backed order store
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connecting to PostgreSQL")?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("running database migrations")?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self, details), fields(product_id = details.product_id))]
    async fn insert(&self, details: &OrderDetails, created_at: DateTime<Utc>) -> Result<Order> {
        let row = sqlx::query(&format!(
            "INSERT INTO orders (taxpayer_id, product_id, quantity, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(details.taxpayer_id.as_str())
        .bind(details.product_id)
        .bind(details.quantity)
        .bind(OrderStatus::Created.as_str())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .context("inserting order")?;

        let order = order_from_row(&row)?;
        debug!(order_id = %order.id, "Order row inserted");
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .context("selecting order by id")?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_by_id_and_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND status = $2"
        ))
        .bind(id.value())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("selecting order by id and status")?;

        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), fields(from = %transition.from, to = %transition.to))]
    async fn transition(
        &self,
        id: OrderId,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $3, created_at = $4 \
             WHERE id = $1 AND status = $2 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.value())
        .bind(transition.from.as_str())
        .bind(transition.to.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .context("updating order status")?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| anyhow!("unknown order status in store: {status}"))?;

    let taxpayer_id: String = row.try_get("taxpayer_id")?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?)?,
        taxpayer_id: TaxpayerId::parse(&taxpayer_id)?,
        product_id: row.try_get("product_id")?,
        quantity: row.try_get("quantity")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}
