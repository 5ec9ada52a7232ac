use std::{fmt::Debug, str::FromStr};

use log::debug;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    db::sqlite::{orders, SqliteDatabaseError},
    db_types::{FulfillmentStatus, NewOrder, Order, OrderId, PaymentMethod, PaymentStatus},
    traits::{OrderStore, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating the file if necessary, and applies any pending migrations.
    ///
    /// For in-memory databases (`sqlite::memory:`) use a single connection, otherwise each pool connection gets its
    /// own empty database.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("🗃️ Connected to database at {url}");
        Ok(Self { pool })
    }
}

impl OrderStore for SqliteDatabase {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} created for customer {}", order.order_id, order.customer_id);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_gateway_ref(&self, txref: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_order_by_gateway_ref(txref, &mut conn).await?)
    }

    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_orders_for_customer(customer_id, &mut conn).await?)
    }

    async fn update_fulfillment(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
        assigned_staff: Option<&str>,
        expected_version: i64,
    ) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order =
            orders::update_fulfillment(order_id, status, assigned_staff, expected_version, &mut conn).await?;
        debug!("🗃️ Order {order_id} fulfillment is now {status}");
        Ok(order)
    }

    async fn update_payment(
        &self,
        order_id: &OrderId,
        status: PaymentStatus,
        expected_version: i64,
    ) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::update_payment(order_id, status, expected_version, &mut conn).await?;
        debug!("🗃️ Order {order_id} payment is now {status}");
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &OrderId, expected_version: i64) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::cancel_order(order_id, expected_version, &mut conn).await?;
        debug!("🗃️ Order {order_id} cancelled on both axes");
        Ok(order)
    }

    async fn record_payment_attempt(
        &self,
        order_id: &OrderId,
        method: PaymentMethod,
        txref: &str,
        expected_version: i64,
    ) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::record_payment_attempt(order_id, method, txref, expected_version, &mut *tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        debug!("🗃️ Order {order_id} has a new live payment attempt [{txref}] via {method}");
        Ok(order)
    }
}
