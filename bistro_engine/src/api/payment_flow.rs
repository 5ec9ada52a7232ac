use std::fmt::Debug;

use log::*;

use crate::{
    api::PaymentFlowError,
    db_types::{Order, OrderId, OutcomeStatus, PaymentMethod, PaymentOutcome, PaymentStatus},
    helpers::new_transaction_ref,
    traits::{OrderStore, StoreError},
};

/// How many times a version-conflicted write is retried before giving up. Conflicts are re-read and re-decided, so
/// the idempotency rules keep re-application safe.
const MAX_CONFLICT_RETRIES: usize = 4;

/// The result of applying a payment outcome to an order.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The order transitioned Pending → Paid.
    NewlyPaid(Order),
    /// The order was already paid under the same transaction reference. Idempotent no-op.
    AlreadyPaid(Order),
    /// The order transitioned Pending → Failed.
    MarkedFailed(Order),
    /// The outcome did not warrant a mutation (pending/unknown status, or a late failure after settlement).
    NoChange(Order),
}

impl Applied {
    pub fn order(&self) -> &Order {
        match self {
            Applied::NewlyPaid(o) | Applied::AlreadyPaid(o) | Applied::MarkedFailed(o) | Applied::NoChange(o) => o,
        }
    }
}

/// `PaymentFlowApi` owns the payment axis of an order: initiating attempts and reconciling asynchronous,
/// possibly duplicated, possibly out-of-order, possibly forged gateway notifications against authoritative local
/// state. Reference-matching and exact amount-matching are the trust anchors.
pub struct PaymentFlowApi<B> {
    db: B,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> PaymentFlowApi<B>
where B: OrderStore
{
    /// First half of payment initiation: loads the order and checks that a new attempt is allowed. No lock is held
    /// afterwards — the caller talks to the gateway (blocking I/O) and then calls [`Self::record_attempt`] with the
    /// reference the gateway session is keyed on.
    pub async fn begin_attempt(&self, order_id: &OrderId, method: PaymentMethod) -> Result<Order, PaymentFlowError> {
        if !method.is_gateway() {
            return Err(PaymentFlowError::UnsupportedMethod(method));
        }
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| PaymentFlowError::OrderNotFound(order_id.clone()))?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(PaymentFlowError::AlreadyPaid(order_id.clone()));
        }
        trace!("🔄️💰️ Order {order_id} cleared for a new {method} attempt");
        Ok(order)
    }

    /// Generates a fresh transaction reference for gateways that key sessions on a client-side identifier.
    pub fn next_transaction_ref(&self, order_id: &OrderId) -> String {
        new_transaction_ref(order_id.as_str())
    }

    /// Second half of payment initiation: persists `txref` as the order's live reference. Supersedes any previous
    /// attempt and resets a `Failed` payment status back to `Pending`.
    pub async fn record_attempt(
        &self,
        order_id: &OrderId,
        method: PaymentMethod,
        txref: &str,
    ) -> Result<Order, PaymentFlowError> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let order = self
                .db
                .fetch_order(order_id)
                .await?
                .ok_or_else(|| PaymentFlowError::OrderNotFound(order_id.clone()))?;
            // A payment may have settled while the gateway call was in flight.
            if order.payment_status == PaymentStatus::Paid {
                return Err(PaymentFlowError::AlreadyPaid(order_id.clone()));
            }
            match self.db.record_payment_attempt(order_id, method, txref, order.version).await {
                Ok(order) => {
                    debug!("🔄️💰️ Order {order_id}: attempt [{txref}] via {method} is now live");
                    return Ok(order);
                },
                Err(StoreError::VersionConflict) => {
                    trace!("🔄️💰️ Order {order_id} changed while recording attempt [{txref}]; retrying");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(PaymentFlowError::RetriesExhausted(order_id.clone()))
    }

    /// Applies a normalized payment outcome to the order.
    ///
    /// The checks run in a fixed sequence, and every rejection leaves the order untouched:
    /// 1. the outcome's reference must equal the order's live reference ([`PaymentFlowError::StaleTransaction`]
    ///    otherwise — a superseded or duplicate notification, benign);
    /// 2. the amount must exactly equal the order total ([`PaymentFlowError::AmountMismatch`] — tampering or a
    ///    currency-unit bug, never auto-corrected);
    /// 3. `Paid` settles Pending → Paid and is idempotent under redelivery; `Failed` only moves Pending → Failed
    ///    so a late duplicate failure can never overwrite a settled order; anything else is a no-op.
    pub async fn apply_outcome(
        &self,
        order_id: &OrderId,
        outcome: &PaymentOutcome,
    ) -> Result<Applied, PaymentFlowError> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let order = self
                .db
                .fetch_order(order_id)
                .await?
                .ok_or_else(|| PaymentFlowError::OrderNotFound(order_id.clone()))?;
            if order.gateway_ref.as_deref() != Some(outcome.txref.as_str()) {
                return Err(PaymentFlowError::StaleTransaction {
                    order_id: order_id.clone(),
                    txref: outcome.txref.clone(),
                });
            }
            if outcome.amount != order.total_price {
                return Err(PaymentFlowError::AmountMismatch {
                    order_id: order_id.clone(),
                    expected: order.total_price,
                    actual: outcome.amount,
                });
            }
            let attempt = match (outcome.status, order.payment_status) {
                (OutcomeStatus::Paid, PaymentStatus::Paid) => {
                    trace!("🔄️💰️ Order {order_id} already settled under [{}]; duplicate ignored", outcome.txref);
                    return Ok(Applied::AlreadyPaid(order));
                },
                (OutcomeStatus::Paid, PaymentStatus::Pending) => {
                    self.db.update_payment(order_id, PaymentStatus::Paid, order.version).await
                },
                (OutcomeStatus::Paid, other) => {
                    // Settled funds arriving for a failed or cancelled order need a human. The payment axis never
                    // moves Failed/Cancelled → Paid.
                    warn!(
                        "🔄️💰️ Order {order_id} received a Paid outcome for [{}] while {other}. Leaving the order \
                         untouched; reconcile manually.",
                        outcome.txref
                    );
                    return Ok(Applied::NoChange(order));
                },
                (OutcomeStatus::Failed, PaymentStatus::Pending) => {
                    self.db.update_payment(order_id, PaymentStatus::Failed, order.version).await
                },
                (OutcomeStatus::Failed, _) => {
                    trace!("🔄️💰️ Order {order_id}: failure outcome for [{}] is a no-op", outcome.txref);
                    return Ok(Applied::NoChange(order));
                },
                (OutcomeStatus::Pending, _) => {
                    trace!("🔄️💰️ Order {order_id}: attempt [{}] still pending at the gateway", outcome.txref);
                    return Ok(Applied::NoChange(order));
                },
            };
            match attempt {
                Ok(updated) if outcome.status == OutcomeStatus::Paid => {
                    info!("🔄️💰️ Order {order_id} is paid ({}) via [{}]", updated.total_price, outcome.txref);
                    return Ok(Applied::NewlyPaid(updated));
                },
                Ok(updated) => {
                    info!("🔄️💰️ Order {order_id}: attempt [{}] failed; retry allowed", outcome.txref);
                    return Ok(Applied::MarkedFailed(updated));
                },
                Err(StoreError::VersionConflict) => {
                    trace!("🔄️💰️ Order {order_id} changed while applying [{}]; re-reading", outcome.txref);
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(PaymentFlowError::RetriesExhausted(order_id.clone()))
    }

    /// Callback-path variant: resolves the order through the attempts index first. Gateways sometimes send
    /// references we have no record of (garbage, or replay across environments); those come back as
    /// [`PaymentFlowError::UnknownReference`], which callback handlers absorb with a generic acknowledgment so the
    /// gateway stops redelivering.
    pub async fn apply_outcome_by_ref(&self, outcome: &PaymentOutcome) -> Result<Applied, PaymentFlowError> {
        let order = self
            .db
            .fetch_order_by_gateway_ref(&outcome.txref)
            .await?
            .ok_or_else(|| PaymentFlowError::UnknownReference(outcome.txref.clone()))?;
        self.apply_outcome(&order.order_id, outcome).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
