use thiserror::Error;

use crate::db_types::{FulfillmentStatus, NewOrder, Order, OrderId, PaymentMethod, PaymentStatus};

/// The persistence contract for orders. Backends implement this; the lifecycle and payment-flow APIs are generic
/// over it.
///
/// Concurrency discipline: every mutation takes the `expected_version` the caller read. The backend must apply the
/// change atomically and only if the stored version still matches, bumping the version on success. A mismatch
/// returns [`StoreError::VersionConflict`] and the caller re-reads and retries. The two status axes live in one
/// record, so this check is what prevents a write on one axis silently erasing a concurrent write on the other.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone + Send + Sync {
    /// Creates a new order with both status axes at `Pending`. The total price is computed from the line-item
    /// snapshot here and never changes afterwards.
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Resolves a transaction reference to its order via the payment-attempts index. Superseded references still
    /// resolve; deciding staleness against the order's current live reference is the reconciliation engine's job.
    async fn fetch_order_by_gateway_ref(&self, txref: &str) -> Result<Option<Order>, StoreError>;

    /// All orders placed by the given customer, newest first.
    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Moves the fulfillment axis. When `assigned_staff` is given (the Pending → Cooking transition) it is recorded
    /// on the order.
    async fn update_fulfillment(
        &self,
        order_id: &OrderId,
        status: FulfillmentStatus,
        assigned_staff: Option<&str>,
        expected_version: i64,
    ) -> Result<Order, StoreError>;

    /// Moves the payment axis.
    async fn update_payment(
        &self,
        order_id: &OrderId,
        status: PaymentStatus,
        expected_version: i64,
    ) -> Result<Order, StoreError>;

    /// Cancels the order: fulfillment becomes `Cancelled` and the payment axis is forced to `Cancelled` in the same
    /// atomic write, whatever it was before.
    async fn cancel_order(&self, order_id: &OrderId, expected_version: i64) -> Result<Order, StoreError>;

    /// Records a new payment attempt: the order's live `gateway_ref` is replaced, the method is switched, a
    /// `Failed` payment status is reset to `Pending`, and the reference is appended to the attempts index. The
    /// reference must never have been used before, for any order.
    async fn record_payment_attempt(
        &self,
        order_id: &OrderId,
        method: PaymentMethod,
        txref: &str,
        expected_version: i64,
    ) -> Result<Order, StoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The order was modified concurrently; re-read and retry")]
    VersionConflict,
    #[error("Transaction reference {0} has already been issued")]
    DuplicateReference(String),
    #[error("Stored record is corrupt: {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
