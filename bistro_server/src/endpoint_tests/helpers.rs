use actix_web::test::TestRequest;
use bistro_common::Secret;
use bistro_engine::db_types::Role;
use bistro_gateways::{config::{EsewaConfig, KhaltiConfig}, esewa::EsewaGateway, khalti::KhaltiGateway, AnyGateway, GatewayRegistry};
use chrono::{Duration, Utc};

use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::AuthConfig,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("bistro-endpoint-test-secret-0123456789abcdef".to_string()) }
}

pub fn issue_token(sub: &str, role: Role) -> String {
    let claims = JwtClaims { sub: sub.to_string(), role, exp: (Utc::now() + Duration::days(1)).timestamp() };
    TokenIssuer::new(&test_auth_config()).issue_token(&claims).expect("Failed to sign token")
}

pub fn test_registry() -> GatewayRegistry {
    GatewayRegistry::default()
        .register(AnyGateway::Esewa(EsewaGateway::new(EsewaConfig::default()).expect("esewa gateway")))
        .register(AnyGateway::Khalti(KhaltiGateway::new(KhaltiConfig::default()).expect("khalti gateway")))
}

pub fn get(path: &str, token: &str) -> TestRequest {
    with_auth(TestRequest::get().uri(path), token)
}

pub fn post(path: &str, token: &str, body: serde_json::Value) -> TestRequest {
    with_auth(TestRequest::post().uri(path).set_json(body), token)
}

fn with_auth(req: TestRequest, token: &str) -> TestRequest {
    if token.is_empty() {
        req
    } else {
        req.insert_header(("Authorization", format!("Bearer {token}")))
    }
}

/// Builds the full test service against a real (in-memory) backend. A macro because the `App` type is unnameable.
macro_rules! test_service {
    ($db:expr) => {{
        let validator = $crate::auth::TokenValidator::new(&$crate::endpoint_tests::helpers::test_auth_config());
        let lifecycle_api =
            bistro_engine::LifecycleApi::new($db.clone(), bistro_engine::events::EventProducers::default());
        let payments_api = bistro_engine::PaymentFlowApi::new($db.clone());
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(lifecycle_api))
                .app_data(actix_web::web::Data::new(payments_api))
                .app_data(actix_web::web::Data::new(validator))
                .app_data(actix_web::web::Data::new($crate::endpoint_tests::helpers::test_registry()))
                .service($crate::routes::health)
                .service(
                    actix_web::web::scope("/api")
                        .service($crate::routes::CreateOrderRoute::<bistro_engine::SqliteDatabase>::new())
                        .service($crate::routes::MyOrdersRoute::<bistro_engine::SqliteDatabase>::new())
                        .service($crate::routes::OrderByIdRoute::<bistro_engine::SqliteDatabase>::new())
                        .service($crate::routes::OrderStatusRoute::<bistro_engine::SqliteDatabase>::new())
                        .service($crate::payment_routes::InitiatePaymentRoute::<bistro_engine::SqliteDatabase>::new())
                        .service($crate::payment_routes::VerifyPaymentRoute::<bistro_engine::SqliteDatabase>::new()),
                )
                .service(
                    actix_web::web::scope("/payments")
                        .service($crate::payment_routes::EsewaSuccessRoute::<bistro_engine::SqliteDatabase>::new())
                        .service($crate::payment_routes::EsewaFailureRoute::<bistro_engine::SqliteDatabase>::new())
                        .service($crate::payment_routes::KhaltiReturnRoute::<bistro_engine::SqliteDatabase>::new()),
                ),
        )
        .await
    }};
}
pub(crate) use test_service;

pub async fn test_db() -> bistro_engine::SqliteDatabase {
    let _ = env_logger::try_init();
    bistro_engine::SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("in-memory database")
}

pub fn order_items() -> serde_json::Value {
    serde_json::json!([
        { "menu_item_id": "momo-steam", "name": "Steamed Momo", "quantity": 2, "unit_price": 25_000 },
        { "menu_item_id": "thukpa", "name": "Chicken Thukpa", "quantity": 1, "unit_price": 35_000 }
    ])
}
