//----------------------------------------------  Settlement webhook  ----------------------------------------------

use actix_web::{post, web, HttpRequest, HttpResponse};
use checkout_engine::{db_types::NewPaymentTransaction, CheckoutGatewayError};
use log::*;
use scg_common::{Cents, Secret};

use crate::{data_objects::{JsonResponse, PaymentWebhook}, GatewaySettlementApi};

/// The shared static key incoming webhooks must present in the `x-webhook-key` header.
#[derive(Clone, Default)]
pub struct WebhookKey(pub Secret<String>);

pub const WEBHOOK_KEY_HEADER: &str = "x-webhook-key";

fn key_matches(req: &HttpRequest, key: &WebhookKey) -> bool {
    let expected = key.0.reveal();
    if expected.is_empty() {
        // An unset key means webhooks were never configured; nothing can authenticate.
        return false;
    }
    req.headers()
        .get(WEBHOOK_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|presented| presented == expected)
        .unwrap_or(false)
}

/// Route handler for the payment gateway's settlement webhook.
///
/// Apart from a bad key (401), responses are always 200 with a `{success, message}` body, because the gateway
/// retries non-2xx deliveries and most failures here (duplicate, mismatch, unknown payment) will not improve
/// with a retry.
#[post("/webhook/payment")]
pub async fn payment_webhook(
    req: HttpRequest,
    body: web::Json<PaymentWebhook>,
    api: web::Data<GatewaySettlementApi>,
    key: web::Data<WebhookKey>,
) -> HttpResponse {
    trace!("🛎️ Received payment webhook: {}", req.uri());
    if !key_matches(&req, &key) {
        warn!("🛎️ Webhook presented a missing or invalid key");
        return HttpResponse::Unauthorized().json(JsonResponse::failure("Invalid webhook key"));
    }
    let webhook = body.into_inner();
    let reference = match webhook.reference() {
        Some(r) => r.to_string(),
        None => {
            warn!("🛎️ Webhook [{}] carried neither code nor content", webhook.id);
            return HttpResponse::Ok().json(JsonResponse::failure("No transfer reference supplied"));
        },
    };
    let mut transaction = NewPaymentTransaction::new(webhook.id.clone(), reference, Cents::from(webhook.transfer_amount));
    if let Some(code) = webhook.code.clone() {
        transaction = transaction.with_gateway_code(code);
    }
    let result = match api.settle_webhook(transaction).await {
        Ok(settled) => {
            info!("🛎️ Payment {} settled for buyer {}", settled.payment.id, settled.buyer_id);
            JsonResponse::success("Payment settled")
        },
        Err(CheckoutGatewayError::DuplicateTransaction(id)) => {
            info!("🛎️ Transaction [{id}] was already recorded; original settlement stands");
            JsonResponse::failure("Duplicate transaction")
        },
        Err(e @ CheckoutGatewayError::AmountMismatch { .. }) => {
            warn!("🛎️ Webhook [{}] rejected: {e}", webhook.id);
            JsonResponse::failure(e)
        },
        Err(e) => {
            warn!("🛎️ Could not settle webhook [{}]. {e}", webhook.id);
            JsonResponse::failure(e)
        },
    };
    HttpResponse::Ok().json(result)
}
