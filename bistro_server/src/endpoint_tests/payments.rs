use actix_web::{http::StatusCode, test};
use bistro_common::Money;
use bistro_engine::{
    db_types::{Order, PaymentMethod, PaymentStatus, Role},
    traits::OrderStore,
};
use bistro_gateways::{config::EsewaConfig, helpers::sign_message, InitiatedPayment};

use super::helpers::{get, issue_token, order_items, post, test_db, test_service};

/// Places an order through the API and returns it. A macro because the test service type is unnameable.
macro_rules! place_order {
    ($app:expr, $token:expr, $method:expr) => {{
        let body = serde_json::json!({ "items": order_items(), "payment_method": $method });
        let res = test::call_service(&$app, post("/api/orders", $token, body).to_request()).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let order: Order = test::read_body_json(res).await;
        order
    }};
}

/// A success-redirect payload as eSewa would send it, signed with the sandbox key.
fn esewa_callback_data(status: &str, total_amount: &str, txref: &str) -> String {
    let config = EsewaConfig::default();
    let message = format!("total_amount={total_amount},transaction_uuid={txref},product_code={}", config.product_code);
    let signature = sign_message(&config.secret_key, &message).unwrap();
    let payload = serde_json::json!({
        "transaction_code": "000ABC",
        "status": status,
        "total_amount": total_amount,
        "transaction_uuid": txref,
        "product_code": config.product_code,
        "signed_field_names": "total_amount,transaction_uuid,product_code",
        "signature": signature,
    });
    base64::encode(payload.to_string())
}

#[actix_web::test]
async fn initiating_an_esewa_payment_returns_a_signed_form() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let order = place_order!(app, &alice, "esewa");

    let body = serde_json::json!({ "order_id": order.order_id.as_str(), "method": "esewa" });
    let res = test::call_service(&app, post("/api/payments/initiate", &alice, body).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let initiated: InitiatedPayment = test::read_body_json(res).await;
    assert_eq!(initiated.method, PaymentMethod::Esewa);
    let fields: std::collections::HashMap<_, _> = initiated.form_fields.iter().cloned().collect();
    assert_eq!(fields["total_amount"], "850");
    assert!(!fields["signature"].is_empty());

    // The attempt reference is now the order's live reference.
    let updated = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(updated.gateway_ref.as_deref(), Some(initiated.txref.as_str()));
}

#[actix_web::test]
async fn strangers_cannot_initiate_payments_on_foreign_orders() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let trudy = issue_token("trudy", Role::Customer);
    let order = place_order!(app, &alice, "esewa");
    let body = serde_json::json!({ "order_id": order.order_id.as_str(), "method": "esewa" });
    let res = test::call_service(&app, post("/api/payments/initiate", &trudy, body).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cash_orders_cannot_initiate_gateway_payments() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let order = place_order!(app, &alice, "cash");
    let body = serde_json::json!({ "order_id": order.order_id.as_str(), "method": "cash" });
    let res = test::call_service(&app, post("/api/payments/initiate", &alice, body).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn a_signed_success_redirect_settles_the_order() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let order = place_order!(app, &alice, "esewa");
    db.record_payment_attempt(&order.order_id, PaymentMethod::Esewa, "T1", order.version).await.unwrap();

    let data = esewa_callback_data("COMPLETE", "850", "T1");
    let path = format!("/payments/esewa/success?data={}", urlencode(&data));
    let res = test::call_service(&app, get(&path, "").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(updated.payment_status, PaymentStatus::Paid);

    // Redelivery changes nothing and is still acknowledged.
    let res = test::call_service(&app, get(&path, "").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn a_forged_redirect_is_acknowledged_but_changes_nothing() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let order = place_order!(app, &alice, "esewa");
    db.record_payment_attempt(&order.order_id, PaymentMethod::Esewa, "T1", order.version).await.unwrap();

    // Signed over 850, claims 850 for an order that costs 850 — but the signature is from the wrong key.
    let config = EsewaConfig { secret_key: bistro_common::Secret::new("wrong-key".into()), ..EsewaConfig::default() };
    let message = format!("total_amount=850,transaction_uuid=T1,product_code={}", config.product_code);
    let signature = sign_message(&config.secret_key, &message).unwrap();
    let payload = serde_json::json!({
        "status": "COMPLETE",
        "total_amount": "850",
        "transaction_uuid": "T1",
        "product_code": config.product_code,
        "signed_field_names": "total_amount,transaction_uuid,product_code",
        "signature": signature,
    });
    let path = format!("/payments/esewa/success?data={}", urlencode(&base64::encode(payload.to_string())));
    let res = test::call_service(&app, get(&path, "").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(updated.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn an_amount_mismatch_is_acknowledged_but_changes_nothing() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let order = place_order!(app, &alice, "esewa");
    db.record_payment_attempt(&order.order_id, PaymentMethod::Esewa, "T1", order.version).await.unwrap();

    // Correctly signed, but for the wrong amount: the engine refuses it.
    let data = esewa_callback_data("COMPLETE", "10", "T1");
    let path = format!("/payments/esewa/success?data={}", urlencode(&data));
    let res = test::call_service(&app, get(&path, "").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(updated.payment_status, PaymentStatus::Pending);
    assert_eq!(updated.total_price, Money::from_rupees(850));
}

#[actix_web::test]
async fn redirects_for_unknown_references_are_acknowledged() {
    let db = test_db().await;
    let app = test_service!(db);
    let data = esewa_callback_data("COMPLETE", "850", "NO-SUCH-REF");
    let path = format!("/payments/esewa/success?data={}", urlencode(&data));
    let res = test::call_service(&app, get(&path, "").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn a_khalti_return_without_a_pidx_is_acknowledged() {
    let db = test_db().await;
    let app = test_service!(db);
    let res = test::call_service(&app, get("/payments/khalti/return?status=Completed", "").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn an_esewa_failure_redirect_without_a_reference_is_acknowledged() {
    let db = test_db().await;
    let app = test_service!(db);
    let res = test::call_service(&app, get("/payments/esewa/failure", "").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn verification_resolves_references_with_the_same_404_for_unknown_and_foreign() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let trudy = issue_token("trudy", Role::Customer);
    let order = place_order!(app, &alice, "esewa");
    db.record_payment_attempt(&order.order_id, PaymentMethod::Esewa, "T1", order.version).await.unwrap();

    let body = serde_json::json!({ "txref": "T-NOPE" });
    let res = test::call_service(&app, post("/api/payments/verify", &alice, body).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Someone else's reference looks exactly like a missing one.
    let body = serde_json::json!({ "txref": "T1" });
    let res = test::call_service(&app, post("/api/payments/verify", &trudy, body).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn verification_requires_a_token() {
    let db = test_db().await;
    let app = test_service!(db);
    let body = serde_json::json!({ "txref": "T-NOPE" });
    let res = test::call_service(&app, post("/api/payments/verify", "", body).to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

/// Percent-encodes the base64 payload for use in a query string (base64 uses `+`, `/` and `=`).
fn urlencode(s: &str) -> String {
    s.replace('%', "%25").replace('+', "%2B").replace('/', "%2F").replace('=', "%3D").replace('&', "%26")
}
