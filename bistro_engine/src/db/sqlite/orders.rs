use bistro_common::Money;
use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{FulfillmentStatus, NewOrder, Order, OrderId, PaymentMethod, PaymentStatus},
    helpers::new_order_id,
};

const ORDER_COLUMNS: &str = "id, order_id, customer_id, items, total_price, fulfillment_status, payment_status, \
                             payment_method, gateway_ref, assigned_staff, version, created_at, updated_at";

fn order_from_row(row: &SqliteRow) -> Result<Order, SqliteDatabaseError> {
    let items_json: String = row.try_get("items")?;
    let items = serde_json::from_str(&items_json)
        .map_err(|e| SqliteDatabaseError::CorruptRecord(format!("line items: {e}")))?;
    let fulfillment_status = row
        .try_get::<String, _>("fulfillment_status")?
        .parse::<FulfillmentStatus>()
        .map_err(|e| SqliteDatabaseError::CorruptRecord(e.to_string()))?;
    let payment_status = row
        .try_get::<String, _>("payment_status")?
        .parse::<PaymentStatus>()
        .map_err(|e| SqliteDatabaseError::CorruptRecord(e.to_string()))?;
    let payment_method = row
        .try_get::<String, _>("payment_method")?
        .parse::<PaymentMethod>()
        .map_err(|e| SqliteDatabaseError::CorruptRecord(e.to_string()))?;
    Ok(Order {
        id: row.try_get("id")?,
        order_id: OrderId(row.try_get("order_id")?),
        customer_id: row.try_get("customer_id")?,
        items,
        total_price: Money::from_paisa(row.try_get("total_price")?),
        fulfillment_status,
        payment_status,
        payment_method,
        gateway_ref: row.try_get("gateway_ref")?,
        assigned_staff: row.try_get("assigned_staff")?,
        version: row.try_get("version")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    let order_id = new_order_id();
    let items_json = serde_json::to_string(&order.items)
        .map_err(|e| SqliteDatabaseError::CorruptRecord(format!("line items: {e}")))?;
    let total = order.total_price().value();
    let method = order.payment_method.to_string();
    let row = sqlx::query(&format!(
        "INSERT INTO orders (order_id, customer_id, items, total_price, payment_method) VALUES ($1, $2, $3, $4, $5) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(&order_id)
    .bind(&order.customer_id)
    .bind(&items_json)
    .bind(total)
    .bind(&method)
    .fetch_one(conn)
    .await?;
    order_from_row(&row)
}

/// Returns the order for the given public id, or `None`.
pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"))
        .bind(order_id.as_str())
        .fetch_one(conn)
        .await;
    match row {
        Err(sqlx::Error::RowNotFound) => Ok(None),
        Err(e) => Err(e.into()),
        Ok(row) => Ok(Some(order_from_row(&row)?)),
    }
}

/// Resolves a transaction reference to its order through the attempts index. Superseded references still resolve.
pub async fn fetch_order_by_gateway_ref(
    txref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let row = sqlx::query(&format!(
        "SELECT o.{} FROM orders o JOIN payment_attempts pa ON pa.order_id = o.order_id WHERE pa.txref = $1",
        ORDER_COLUMNS.replace(", ", ", o.")
    ))
    .bind(txref)
    .fetch_one(conn)
    .await;
    match row {
        Err(sqlx::Error::RowNotFound) => Ok(None),
        Err(e) => Err(e.into()),
        Ok(row) => Ok(Some(order_from_row(&row)?)),
    }
}

pub async fn fetch_orders_for_customer(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let rows = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(customer_id)
    .fetch_all(conn)
    .await?;
    rows.iter().map(order_from_row).collect()
}

/// Applies a version-checked UPDATE. Zero affected rows means either the order does not exist or a concurrent
/// writer got there first; the caller finds out which and maps accordingly.
async fn checked_update(
    order_id: &OrderId,
    expected_version: i64,
    set_clause: &str,
    binds: &[&str],
    conn: &mut SqliteConnection,
) -> Result<Order, SqliteDatabaseError> {
    let sql = format!(
        "UPDATE orders SET {set_clause}, version = version + 1, updated_at = CURRENT_TIMESTAMP WHERE order_id = \
         ${} AND version = ${}",
        binds.len() + 1,
        binds.len() + 2
    );
    trace!("🗃️ Executing query: {sql}");
    let mut query = sqlx::query(&sql);
    for bind in binds {
        query = query.bind(*bind);
    }
    let result = query.bind(order_id.as_str()).bind(expected_version).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return match fetch_order(order_id, conn).await? {
            Some(_) => Err(SqliteDatabaseError::VersionConflict(order_id.clone())),
            None => Err(SqliteDatabaseError::OrderNotFound(order_id.clone())),
        };
    }
    fetch_order(order_id, conn).await?.ok_or_else(|| SqliteDatabaseError::OrderNotFound(order_id.clone()))
}

pub async fn update_fulfillment(
    order_id: &OrderId,
    status: FulfillmentStatus,
    assigned_staff: Option<&str>,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, SqliteDatabaseError> {
    let status = status.to_string();
    match assigned_staff {
        Some(staff) => {
            checked_update(
                order_id,
                expected_version,
                "fulfillment_status = $1, assigned_staff = $2",
                &[&status, staff],
                conn,
            )
            .await
        },
        None => checked_update(order_id, expected_version, "fulfillment_status = $1", &[&status], conn).await,
    }
}

pub async fn update_payment(
    order_id: &OrderId,
    status: PaymentStatus,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, SqliteDatabaseError> {
    let status = status.to_string();
    checked_update(order_id, expected_version, "payment_status = $1", &[&status], conn).await
}

/// Cancels both axes in one atomic write. The payment axis is forced to `Cancelled` whatever it was.
pub async fn cancel_order(
    order_id: &OrderId,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, SqliteDatabaseError> {
    checked_update(
        order_id,
        expected_version,
        "fulfillment_status = 'Cancelled', payment_status = 'Cancelled'",
        &[],
        conn,
    )
    .await
}

/// Registers a new payment attempt: appends the reference to the attempts index and installs it as the order's
/// live reference. A `Failed` payment status is reset to `Pending` so the retry can settle.
pub async fn record_payment_attempt(
    order_id: &OrderId,
    method: PaymentMethod,
    txref: &str,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, SqliteDatabaseError> {
    let insert = sqlx::query("INSERT INTO payment_attempts (order_id, txref, method) VALUES ($1, $2, $3)")
        .bind(order_id.as_str())
        .bind(txref)
        .bind(method.to_string())
        .execute(&mut *conn)
        .await;
    if let Err(e) = insert {
        let unique = e
            .as_database_error()
            .map(|d| d.kind() == sqlx::error::ErrorKind::UniqueViolation)
            .unwrap_or(false);
        return if unique { Err(SqliteDatabaseError::DuplicateReference(txref.to_string())) } else { Err(e.into()) };
    }
    let method = method.to_string();
    checked_update(
        order_id,
        expected_version,
        "gateway_ref = $1, payment_method = $2, payment_status = CASE payment_status WHEN 'Failed' THEN 'Pending' \
         ELSE payment_status END",
        &[txref, &method],
        conn,
    )
    .await
}
