use bistro_common::Money;
use thiserror::Error;

use crate::{
    db_types::{FulfillmentStatus, OrderId, PaymentMethod},
    traits::StoreError,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} is already paid; a new payment attempt cannot be initiated")]
    AlreadyPaid(OrderId),
    /// The outcome references a superseded attempt. Benign: log it and acknowledge, never surface it to the
    /// gateway as a failure.
    #[error("Transaction [{txref}] is no longer the live attempt for order {order_id}")]
    StaleTransaction { order_id: OrderId, txref: String },
    #[error("Amount mismatch for order {order_id}: order total is {expected}, outcome reports {actual}")]
    AmountMismatch { order_id: OrderId, expected: Money, actual: Money },
    #[error("Transaction reference [{0}] does not correspond to any known payment attempt")]
    UnknownReference(String),
    #[error("{0} payments do not go through a gateway")]
    UnsupportedMethod(PaymentMethod),
    #[error("Gave up applying the outcome to order {0} after repeated concurrent modifications")]
    RetriesExhausted(OrderId),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{actor} ({role}) may not perform this transition on order {order_id}")]
    Unauthorized { order_id: OrderId, actor: String, role: String },
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition { order_id: OrderId, from: FulfillmentStatus, to: FulfillmentStatus },
    #[error("Gave up on order {0} after repeated concurrent modifications")]
    RetriesExhausted(OrderId),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for PaymentFlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => PaymentFlowError::OrderNotFound(id),
            e => PaymentFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => LifecycleError::OrderNotFound(id),
            e => LifecycleError::DatabaseError(e.to_string()),
        }
    }
}
