use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bistro_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    LifecycleApi,
    PaymentFlowApi,
    SqliteDatabase,
};
use bistro_gateways::{esewa::EsewaGateway, khalti::KhaltiGateway, AnyGateway, GatewayRegistry};
use log::*;

use crate::{
    auth::TokenValidator,
    config::ServerConfig,
    errors::ServerError,
    payment_routes::{EsewaFailureRoute, EsewaSuccessRoute, InitiatePaymentRoute, KhaltiReturnRoute, VerifyPaymentRoute},
    routes::{health, CreateOrderRoute, MyOrdersRoute, OrderByIdRoute, OrderStatusRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let hooks = if config.disable_notifications {
        info!("📣️ Order-ready notifications are disabled by configuration");
        EventHooks::default()
    } else {
        default_hooks()
    };
    let handlers = EventHandlers::new(25, hooks);
    let producers = handlers.producers();
    let srv = create_server_instance(config, db, producers)?;
    tokio::spawn(handlers.start_handlers());
    srv.await.map_err(|e| ServerError::IOError(e))
}

/// The stock notification hook: there is no push channel yet, so "notify the customer" means a prominent log line
/// the counter display tails.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_ready(|ev| {
        Box::pin(async move {
            info!("📣️ Order {} is ready for collection. Paging {}.", ev.order_id(), ev.recipient());
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let registry = GatewayRegistry::default()
        .register(AnyGateway::Esewa(EsewaGateway::new(config.esewa.clone())?))
        .register(AnyGateway::Khalti(KhaltiGateway::new(config.khalti.clone())?));
    let srv = HttpServer::new(move || {
        let lifecycle_api = LifecycleApi::new(db.clone(), producers.clone());
        let payments_api = PaymentFlowApi::new(db.clone());
        let validator = TokenValidator::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bistro::access_log"))
            .app_data(web::Data::new(lifecycle_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(validator))
            .app_data(web::Data::new(registry.clone()));
        // Routes that require a bearer token. Authentication happens in the JwtClaims extractor.
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(InitiatePaymentRoute::<SqliteDatabase>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new());
        // The gateway return endpoints are necessarily unauthenticated: the caller is the customer's browser coming
        // back from the gateway. They acknowledge everything and trust nothing.
        let payments_scope = web::scope("/payments")
            .service(EsewaSuccessRoute::<SqliteDatabase>::new())
            .service(EsewaFailureRoute::<SqliteDatabase>::new())
            .service(KhaltiReturnRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(payments_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
