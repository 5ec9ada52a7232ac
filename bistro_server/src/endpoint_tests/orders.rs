use actix_web::{http::StatusCode, test};
use bistro_engine::db_types::{FulfillmentStatus, Order, PaymentStatus, Role};

use super::helpers::{get, issue_token, order_items, post, test_db, test_service};

#[actix_web::test]
async fn health_check() {
    let db = test_db().await;
    let app = test_service!(db);
    let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn placing_an_order_requires_a_token() {
    let db = test_db().await;
    let app = test_service!(db);
    let body = serde_json::json!({ "items": order_items(), "payment_method": "esewa" });
    let res = test::call_service(&app, post("/api/orders", "", body).to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn tampered_tokens_are_rejected() {
    let db = test_db().await;
    let app = test_service!(db);
    let mut token = issue_token("alice", Role::Customer);
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    let res = test::call_service(&app, get("/api/orders", &token).to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn customers_place_and_fetch_their_own_orders() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let body = serde_json::json!({ "items": order_items(), "payment_method": "esewa" });
    let res = test::call_service(&app, post("/api/orders", &alice, body).to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Order = test::read_body_json(res).await;
    assert_eq!(order.customer_id, "alice");
    assert_eq!(order.total_price, bistro_common::Money::from_rupees(850));
    assert_eq!(order.fulfillment_status, FulfillmentStatus::Pending);

    let path = format!("/api/orders/{}", order.order_id.as_str());
    let res = test::call_service(&app, get(&path, &alice).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);

    // A stranger gets the same 404 as a missing order.
    let trudy = issue_token("trudy", Role::Customer);
    let res = test::call_service(&app, get(&path, &trudy).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Staff can see it.
    let chef = issue_token("chef-nir", Role::Chef);
    let res = test::call_service(&app, get(&path, &chef).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = test::call_service(&app, get("/api/orders", &alice).to_request()).await;
    let orders: Vec<Order> = test::read_body_json(res).await;
    assert_eq!(orders.len(), 1);
}

#[actix_web::test]
async fn empty_orders_are_rejected() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let body = serde_json::json!({ "items": [], "payment_method": "cash" });
    let res = test::call_service(&app, post("/api/orders", &alice, body).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn the_kitchen_drives_fulfillment_through_the_status_endpoint() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let chef = issue_token("chef-nir", Role::Chef);
    let body = serde_json::json!({ "items": order_items(), "payment_method": "cash" });
    let res = test::call_service(&app, post("/api/orders", &alice, body).to_request()).await;
    let order: Order = test::read_body_json(res).await;
    let path = format!("/api/orders/{}/status", order.order_id.as_str());

    // The owner may not start cooking.
    let cooking = serde_json::json!({ "status": "Cooking" });
    let res = test::call_service(&app, post(&path, &alice, cooking.clone()).to_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = test::call_service(&app, post(&path, &chef, cooking).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let order: Order = test::read_body_json(res).await;
    assert_eq!(order.fulfillment_status, FulfillmentStatus::Cooking);
    assert_eq!(order.assigned_staff.as_deref(), Some("chef-nir"));

    // Cancellation is too late now.
    let cancel = serde_json::json!({ "status": "Cancelled" });
    let res = test::call_service(&app, post(&path, &alice, cancel).to_request()).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = test::call_service(&app, post(&path, &chef, serde_json::json!({ "status": "Ready" })).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res =
        test::call_service(&app, post(&path, &alice, serde_json::json!({ "status": "Completed" })).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let order: Order = test::read_body_json(res).await;
    assert_eq!(order.fulfillment_status, FulfillmentStatus::Completed);
}

#[actix_web::test]
async fn cancelling_a_pending_order_voids_its_payment() {
    let db = test_db().await;
    let app = test_service!(db);
    let alice = issue_token("alice", Role::Customer);
    let body = serde_json::json!({ "items": order_items(), "payment_method": "khalti" });
    let res = test::call_service(&app, post("/api/orders", &alice, body).to_request()).await;
    let order: Order = test::read_body_json(res).await;
    let path = format!("/api/orders/{}/status", order.order_id.as_str());
    let res =
        test::call_service(&app, post(&path, &alice, serde_json::json!({ "status": "Cancelled" })).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let order: Order = test::read_body_json(res).await;
    assert_eq!(order.fulfillment_status, FulfillmentStatus::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Cancelled);
}
