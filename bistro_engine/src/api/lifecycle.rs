use std::fmt::Debug;

use log::*;

use crate::{
    api::LifecycleError,
    db_types::{FulfillmentStatus, Order, OrderId, PaymentStatus, Role},
    events::{EventProducers, OrderReadyEvent},
    traits::{OrderStore, StoreError},
};

const MAX_CONFLICT_RETRIES: usize = 4;

/// The authenticated party requesting a transition. Supplied by the server's authorization layer.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new<S: Into<String>>(id: S, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

/// `LifecycleApi` owns the fulfillment axis of an order.
///
/// The complete transition table:
///
/// ```text
/// Pending --(chef/admin: start cooking)--> Cooking     (records the actor as assigned preparer)
/// Pending --(owner or admin: cancel)-----> Cancelled   (forces the payment axis to Cancelled)
/// Cooking --(chef/admin: mark ready)-----> Ready       (notifies the owner, exactly once)
/// Ready   --(owner/chef/admin: complete)-> Completed
/// ```
///
/// Everything else is an [`LifecycleError::InvalidTransition`]. In particular, cancellation is refused once
/// cooking has started, so no prepared food is wasted.
pub struct LifecycleApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for LifecycleApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LifecycleApi")
    }
}

impl<B> LifecycleApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> LifecycleApi<B>
where B: OrderStore
{
    /// Moves the order to `target`, enforcing the transition table and the actor's authority over the edge.
    ///
    /// A version conflict (a concurrent writer on either status axis) triggers a re-read; the transition table then
    /// decides again from fresh state, so a request that raced e.g. a payment callback still behaves as if it had
    /// arrived after it.
    pub async fn transition(
        &self,
        order_id: &OrderId,
        target: FulfillmentStatus,
        actor: &Actor,
    ) -> Result<Order, LifecycleError> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let order =
                self.db.fetch_order(order_id).await?.ok_or_else(|| LifecycleError::OrderNotFound(order_id.clone()))?;
            match self.apply_transition(&order, target, actor).await? {
                Some(updated) => return Ok(updated),
                None => trace!("🍳️ Order {order_id} changed concurrently; re-reading"),
            }
        }
        Err(LifecycleError::RetriesExhausted(order_id.clone()))
    }

    /// Runs one transition attempt against the given snapshot. `Ok(None)` means the snapshot went stale under us
    /// and the caller should re-read and retry.
    async fn apply_transition(
        &self,
        order: &Order,
        target: FulfillmentStatus,
        actor: &Actor,
    ) -> Result<Option<Order>, LifecycleError> {
        use FulfillmentStatus::*;
        let order_id = &order.order_id;
        let write = match (order.fulfillment_status, target) {
            (Pending, Cooking) => {
                self.require_staff(order, actor)?;
                self.db.update_fulfillment(order_id, Cooking, Some(&actor.id), order.version).await
            },
            (Cooking, Ready) => {
                self.require_staff(order, actor)?;
                self.db.update_fulfillment(order_id, Ready, None, order.version).await
            },
            (Ready, Completed) => {
                self.require_owner_or_staff(order, actor)?;
                self.db.update_fulfillment(order_id, Completed, None, order.version).await
            },
            (Pending, Cancelled) => {
                self.require_owner_or_admin(order, actor)?;
                if order.payment_status == PaymentStatus::Paid {
                    // Preserved source behavior: a paid order can still be cancelled and its payment status is
                    // annulled. Refunds happen out of band; make sure an operator sees this.
                    warn!(
                        "🍳️ Order {order_id} was already paid ({}) and has been cancelled by {}. The payment must \
                         be refunded manually.",
                        order.total_price, actor.id
                    );
                }
                self.db.cancel_order(order_id, order.version).await
            },
            (from, to) => {
                return Err(LifecycleError::InvalidTransition { order_id: order_id.clone(), from, to });
            },
        };
        match write {
            Ok(updated) => {
                info!("🍳️ Order {order_id}: {} → {target} by {} ({})", order.fulfillment_status, actor.id, actor.role);
                if target == Ready {
                    self.notify_order_ready(&updated).await;
                }
                Ok(Some(updated))
            },
            Err(StoreError::VersionConflict) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_staff(&self, order: &Order, actor: &Actor) -> Result<(), LifecycleError> {
        if actor.role.is_staff() {
            Ok(())
        } else {
            Err(self.unauthorized(order, actor))
        }
    }

    fn require_owner_or_staff(&self, order: &Order, actor: &Actor) -> Result<(), LifecycleError> {
        if actor.role.is_staff() || order.is_owned_by(&actor.id) {
            Ok(())
        } else {
            Err(self.unauthorized(order, actor))
        }
    }

    fn require_owner_or_admin(&self, order: &Order, actor: &Actor) -> Result<(), LifecycleError> {
        if actor.role == Role::Admin || order.is_owned_by(&actor.id) {
            Ok(())
        } else {
            Err(self.unauthorized(order, actor))
        }
    }

    fn unauthorized(&self, order: &Order, actor: &Actor) -> LifecycleError {
        LifecycleError::Unauthorized {
            order_id: order.order_id.clone(),
            actor: actor.id.clone(),
            role: actor.role.to_string(),
        }
    }

    async fn notify_order_ready(&self, order: &Order) {
        for producer in &self.producers.order_ready_producer {
            debug!("📬️ Notifying {} that order {} is ready", order.customer_id, order.order_id);
            producer.publish_event(OrderReadyEvent::new(order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
