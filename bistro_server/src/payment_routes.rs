//! Payment initiation, verification, and the gateway return endpoints.
//!
//! The return endpoints are the reason this module exists at all: gateways redeliver, reorder and sometimes never
//! deliver their notifications, and customers share redirect URLs around. These handlers therefore always
//! acknowledge with a 200 and let the reconciliation engine decide whether anything changes; an error here only ever
//! shows up in the logs, never as a failure the gateway would retry forever.
use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use bistro_engine::{
    db_types::{PaymentMethod, PaymentOutcome},
    traits::OrderStore,
    Applied,
    PaymentFlowApi,
    PaymentFlowError,
};
use bistro_gateways::{AnyGateway, GatewayRegistry, PaymentGateway};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{InitiatePaymentRequest, JsonResponse, VerifyPaymentRequest},
    errors::ServerError,
    route,
};

route!(initiate_payment => Post "/payments/initiate" impl OrderStore);
/// Starts a payment attempt: checks the order is still payable, opens a gateway session, and records the session's
/// reference as the order's live attempt. No database lock is held while the gateway is on the wire; a payment that
/// settles in the meantime surfaces as [`PaymentFlowError::AlreadyPaid`] when the attempt is recorded.
pub async fn initiate_payment<B: OrderStore>(
    claims: JwtClaims,
    body: web::Json<InitiatePaymentRequest>,
    api: web::Data<PaymentFlowApi<B>>,
    gateways: web::Data<GatewayRegistry>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    debug!("💻️ POST initiate {} payment for order {} by {}", req.method, req.order_id, claims.sub);
    let order = api.begin_attempt(&req.order_id, req.method).await?;
    if !claims.is_staff() && !order.is_owned_by(&claims.sub) {
        return Err(PaymentFlowError::OrderNotFound(req.order_id).into());
    }
    let gateway = gateways.get(req.method)?;
    let txref = api.next_transaction_ref(&order.order_id);
    let initiated = gateway.initiate(&order, &txref).await?;
    // The gateway may have issued its own session reference; that is the one the order is keyed on from here.
    api.record_attempt(&order.order_id, req.method, &initiated.txref).await?;
    info!("💻️ Order {}: {} attempt [{}] initiated", order.order_id, req.method, initiated.txref);
    Ok(HttpResponse::Ok().json(initiated))
}

route!(verify_payment => Post "/payments/verify" impl OrderStore);
/// Client-driven verification, for when a redirect never lands: resolves the transaction reference through the
/// attempts index, asks the gateway for the authoritative state, and applies the result. Superseded references
/// still resolve to their order; the reconciliation engine then reports them as stale.
pub async fn verify_payment<B: OrderStore>(
    claims: JwtClaims,
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<PaymentFlowApi<B>>,
    gateways: web::Data<GatewayRegistry>,
) -> Result<HttpResponse, ServerError> {
    let txref = body.into_inner().txref;
    debug!("💻️ POST verify payment [{txref}] by {}", claims.sub);
    let order = api
        .db()
        .fetch_order_by_gateway_ref(&txref)
        .await
        .map_err(PaymentFlowError::from)?
        .filter(|o| claims.is_staff() || o.is_owned_by(&claims.sub))
        .ok_or_else(|| PaymentFlowError::UnknownReference(txref.clone()))?;
    let gateway = gateways.get(order.payment_method)?;
    let outcome = gateway.lookup(&txref, order.total_price).await?;
    let applied = api.apply_outcome(&order.order_id, &outcome).await?;
    Ok(HttpResponse::Ok().json(applied.order()))
}

//----------------------------------------------   Gateway returns  ----------------------------------------------

route!(esewa_success => Get "/esewa/success" impl OrderStore);
/// The signed success redirect. The payload's own signature is the trust anchor, so a valid payload is applied
/// directly; anything else is logged and acknowledged.
pub async fn esewa_success<B: OrderStore>(
    params: web::Query<HashMap<String, String>>,
    api: web::Data<PaymentFlowApi<B>>,
    gateways: web::Data<GatewayRegistry>,
) -> HttpResponse {
    trace!("🔔️ eSewa success redirect received");
    let result = match gateways.get(PaymentMethod::Esewa).and_then(|gw| gw.parse_callback(&params)) {
        Ok(outcome) => apply_and_absorb(&api, outcome).await,
        Err(e) => {
            warn!("🔔️ Discarding eSewa success redirect. {e}");
            JsonResponse::failure("Payload could not be verified")
        },
    };
    HttpResponse::Ok().json(result)
}

route!(esewa_failure => Get "/esewa/failure" impl OrderStore);
/// The failure redirect carries no signature, so nothing in it is believed. If it names a transaction we know, the
/// authoritative status is fetched from the gateway; either way the redirect is acknowledged.
pub async fn esewa_failure<B: OrderStore>(
    params: web::Query<HashMap<String, String>>,
    api: web::Data<PaymentFlowApi<B>>,
    gateways: web::Data<GatewayRegistry>,
) -> HttpResponse {
    trace!("🔔️ eSewa failure redirect received");
    let result = match params.get("transaction_uuid") {
        Some(txref) => confirm_and_absorb(&api, &gateways, PaymentMethod::Esewa, txref).await,
        None => {
            debug!("🔔️ eSewa failure redirect carried no transaction reference; nothing to do");
            JsonResponse::success("Acknowledged")
        },
    };
    HttpResponse::Ok().json(result)
}

route!(khalti_return => Get "/khalti/return" impl OrderStore);
/// Khalti's return redirect is unauthenticated, so it only tells us *which* session to verify; the status always
/// comes from the lookup endpoint over our own authenticated connection.
pub async fn khalti_return<B: OrderStore>(
    params: web::Query<HashMap<String, String>>,
    api: web::Data<PaymentFlowApi<B>>,
    gateways: web::Data<GatewayRegistry>,
) -> HttpResponse {
    trace!("🔔️ Khalti return redirect received");
    let result = match gateways.get(PaymentMethod::Khalti).and_then(|gw| gw.parse_callback(&params)) {
        Ok(outcome) => confirm_and_absorb(&api, &gateways, PaymentMethod::Khalti, &outcome.txref).await,
        Err(e) => {
            debug!("🔔️ Discarding Khalti return redirect. {e}");
            JsonResponse::failure("Missing session reference")
        },
    };
    HttpResponse::Ok().json(result)
}

/// Applies an already-authenticated outcome, reducing every result to a log line and an acknowledgment.
async fn apply_and_absorb<B: OrderStore>(
    api: &PaymentFlowApi<B>,
    outcome: PaymentOutcome,
) -> JsonResponse {
    match api.apply_outcome_by_ref(&outcome).await {
        Ok(Applied::NewlyPaid(order)) => {
            info!("🔔️ Order {} settled via [{}]", order.order_id, outcome.txref);
            JsonResponse::success("Payment confirmed")
        },
        Ok(Applied::AlreadyPaid(order)) => {
            debug!("🔔️ Duplicate settlement notice for order {}", order.order_id);
            JsonResponse::success("Payment confirmed")
        },
        Ok(Applied::MarkedFailed(order)) => {
            info!("🔔️ Order {}: attempt [{}] failed", order.order_id, outcome.txref);
            JsonResponse::success("Acknowledged")
        },
        Ok(Applied::NoChange(order)) => {
            debug!("🔔️ Notification for order {} required no action", order.order_id);
            JsonResponse::success("Acknowledged")
        },
        Err(e) => {
            // Stale references, unknown references and amount mismatches all land here. The gateway gets a generic
            // acknowledgment either way; an operator gets the log.
            warn!("🔔️ Notification for [{}] was not applied. {e}", outcome.txref);
            JsonResponse::success("Acknowledged")
        },
    }
}

/// Resolves a transaction reference to its order, fetches the authoritative status from the gateway, and applies it.
async fn confirm_and_absorb<B: OrderStore>(
    api: &PaymentFlowApi<B>,
    gateways: &GatewayRegistry,
    method: PaymentMethod,
    txref: &str,
) -> JsonResponse {
    match confirm_by_reference(api, gateways, method, txref).await {
        Ok(outcome) => apply_and_absorb(api, outcome).await,
        Err(e) => {
            warn!("🔔️ Could not confirm [{txref}] with the gateway. {e}");
            JsonResponse::success("Acknowledged")
        },
    }
}

async fn confirm_by_reference<B: OrderStore>(
    api: &PaymentFlowApi<B>,
    gateways: &GatewayRegistry,
    method: PaymentMethod,
    txref: &str,
) -> Result<PaymentOutcome, ServerError> {
    let order = api
        .db()
        .fetch_order_by_gateway_ref(txref)
        .await
        .map_err(PaymentFlowError::from)?
        .ok_or_else(|| PaymentFlowError::UnknownReference(txref.to_string()))?;
    let gateway: &AnyGateway = gateways.get(method)?;
    let outcome = gateway.lookup(txref, order.total_price).await?;
    Ok(outcome)
}
