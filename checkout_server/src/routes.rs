//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! Note that buyer identity arrives in the path: authentication is an external collaborator in front of this
//! service, and by the time a request lands here it has already been vouched for.
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use checkout_engine::objects::CheckoutRequest;
use log::*;

use crate::{errors::ServerError, GatewayCheckoutApi, GatewaySettlementApi};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------  Checkout  ---------------------------------------------------
/// Route handler for the checkout endpoint. One call settles the whole cart selection: every seller group in
/// the body becomes one order, all covered by a single pending payment.
#[post("/checkout/{buyer_id}")]
pub async fn checkout(
    path: web::Path<i64>,
    body: web::Json<CheckoutRequest>,
    api: web::Data<GatewayCheckoutApi>,
) -> Result<HttpResponse, ServerError> {
    let buyer_id = path.into_inner();
    let request = body.into_inner();
    debug!("💻️ POST checkout for buyer {buyer_id} covering {} seller groups", request.groups.len());
    let result = api.checkout(buyer_id, &request).await?;
    info!("💻️ Buyer {buyer_id} checked out payment {}", result.payment_id);
    Ok(HttpResponse::Ok().json(result))
}

// ----------------------------------------------   Orders  ----------------------------------------------------
/// Route handler for buyers fetching their own orders.
#[get("/order/{buyer_id}")]
pub async fn my_orders(
    path: web::Path<i64>,
    api: web::Data<GatewaySettlementApi>,
) -> Result<HttpResponse, ServerError> {
    let buyer_id = path.into_inner();
    trace!("💻️ GET orders for buyer {buyer_id}");
    let orders = api.orders_for_buyer(buyer_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Route handler for manual order cancellation. Only permitted while the order is still awaiting payment, and
/// deliberately does not release the stock the order is holding.
#[delete("/order/{buyer_id}/{order_id}")]
pub async fn cancel_order(
    path: web::Path<(i64, i64)>,
    api: web::Data<GatewaySettlementApi>,
) -> Result<HttpResponse, ServerError> {
    let (buyer_id, order_id) = path.into_inner();
    debug!("💻️ DELETE order {order_id} for buyer {buyer_id}");
    let order = api.cancel_order(buyer_id, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}
