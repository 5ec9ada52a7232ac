//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the [`OrderStore`] backend, which actix cannot express with its attribute macros, so
//! the service factories are implemented manually via the `route!` macro.
use actix_web::{get, web, HttpResponse, Responder};
use bistro_engine::{
    db_types::{NewOrder, OrderId},
    traits::OrderStore,
    LifecycleApi,
    LifecycleError,
};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{NewOrderRequest, StatusUpdateRequest},
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so the service registration is implemented manually using this macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

//----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderStore);
/// Places a new order for the authenticated party. The order is owned by the token's subject; the body only carries
/// the line items and the chosen payment method. The total is computed server-side from the item snapshot.
pub async fn create_order<B: OrderStore>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<LifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    if req.items.is_empty() {
        return Err(ServerError::InvalidRequestBody("An order must contain at least one item".to_string()));
    }
    if req.items.iter().any(|i| i.quantity == 0) {
        return Err(ServerError::InvalidRequestBody("Item quantities must be positive".to_string()));
    }
    let new_order = NewOrder::new(claims.sub.clone(), req.items, req.payment_method);
    debug!("💻️ POST new order for {} totalling {}", claims.sub, new_order.total_price());
    let order = api.db().create_order(new_order).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderStore);
pub async fn my_orders<B: OrderStore>(
    claims: JwtClaims,
    api: web::Data<LifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.sub);
    let orders =
        api.db().fetch_orders_for_customer(&claims.sub).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderStore);
/// Customers can only see their own orders. Foreign orders get the same 404 as missing ones, so order ids cannot be
/// probed.
pub async fn order_by_id<B: OrderStore>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<LifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let order = api
        .db()
        .fetch_order(&order_id)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .filter(|o| claims.is_staff() || o.is_owned_by(&claims.sub))
        .ok_or_else(|| ServerError::LifecycleError(LifecycleError::OrderNotFound(order_id)))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_status => Post "/orders/{order_id}/status" impl OrderStore);
/// Moves the order along its fulfillment lifecycle. The engine enforces the transition table and who may drive each
/// edge; this handler only relays the authenticated actor.
pub async fn order_status<B: OrderStore>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<LifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let target = body.into_inner().status;
    debug!("💻️ POST status {target} for order {order_id} by {}", claims.sub);
    let order = api.transition(&order_id, target, &claims.actor()).await?;
    Ok(HttpResponse::Ok().json(order))
}
