use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId};

/// Emitted exactly once when an order reaches `Ready`. Addressed to the order's owner; delivery is fire-and-forget
/// (the push/socket mechanism is an external collaborator and the core never retries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReadyEvent {
    pub order: Order,
}

impl OrderReadyEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }

    /// The user the notification is addressed to.
    pub fn recipient(&self) -> &str {
        &self.order.customer_id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order.order_id
    }
}
