use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewPaymentTransaction, Order},
    events::{EventProducers, PaymentExpiredEvent, PaymentSettledEvent},
    flow_api::objects::{ExpiryOutcome, SettledPayment},
    helpers::extract_payment_id,
    traits::{CancellationQueue, CheckoutGatewayDatabase, CheckoutGatewayError},
};

/// `SettlementApi` owns the payment state machine.
///
/// Two entry points drive it: the gateway webhook ([`Self::settle_webhook`]) and the delayed cancellation job
/// ([`Self::expire`]). Both are written so that whichever commits first wins and the loser's status guard makes
/// it a no-op; no lock is taken between them. Manual cancellation ([`Self::cancel_order`]) is the third,
/// buyer-initiated transition.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> SettlementApi<B>
where B: CheckoutGatewayDatabase + CancellationQueue
{
    /// Settle a payment from an incoming gateway webhook.
    ///
    /// The payment id is parsed out of the transfer reference; the amount is verified against the order-item
    /// snapshots; the transaction is recorded under its gateway id so a replayed webhook fails with
    /// [`CheckoutGatewayError::DuplicateTransaction`] and the original settlement stays authoritative.
    ///
    /// Returns the settled payment, including the buyer id so the caller can emit a notification.
    pub async fn settle_webhook(&self, transaction: NewPaymentTransaction) -> Result<SettledPayment, CheckoutGatewayError> {
        let payment_id = extract_payment_id(&transaction.reference)
            .ok_or_else(|| CheckoutGatewayError::InvalidReference(transaction.reference.clone()))?;
        let txid = transaction.tx_id.clone();
        let settled = self.db.settle_payment(payment_id, transaction).await?;
        info!("💳️ Payment #{payment_id} settled by gateway transaction [{txid}]");
        // Best-effort: if the job survives, the timeout handler runs against a Success payment and no-ops.
        if let Err(e) = self.db.cancel_scheduled(payment_id).await {
            warn!("💳️ Could not remove the cancellation job for payment #{payment_id}: {e}");
        }
        self.call_payment_settled_hook(&settled).await;
        Ok(settled)
    }

    /// The timeout path, invoked by the delayed-job worker. Safe to run more than once: a payment that is
    /// already terminal, or orders that already left `PendingPayment`, are left untouched.
    pub async fn expire(&self, payment_id: i64) -> Result<Option<ExpiryOutcome>, CheckoutGatewayError> {
        let Some(outcome) = self.db.expire_payment(payment_id).await? else {
            debug!("🕰️ Payment #{payment_id} no longer exists; expiry treated as already handled");
            return Ok(None);
        };
        if outcome.is_noop() {
            debug!("🕰️ Expiry for payment #{payment_id} was a no-op (already settled or already swept)");
        } else {
            let units: i64 = outcome.restored.iter().map(|(_, qty)| qty).sum();
            info!(
                "🕰️ Payment #{payment_id} expired: {} orders cancelled, {units} units restocked",
                outcome.cancelled_orders.len()
            );
            self.call_payment_expired_hook(&outcome).await;
        }
        Ok(Some(outcome))
    }

    /// Manual cancellation by the buyer. Only an order still `PendingPayment` can be cancelled, and the stock
    /// it consumed is NOT restored here; the ledger is only credited by the timeout path.
    pub async fn cancel_order(&self, buyer_id: i64, order_id: i64) -> Result<Order, CheckoutGatewayError> {
        let order = self.db.cancel_order(buyer_id, order_id).await?;
        info!("💳️ Order #{order_id} cancelled by buyer #{buyer_id}");
        Ok(order)
    }

    /// All orders placed by the buyer, oldest first.
    pub async fn orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, CheckoutGatewayError> {
        self.db.fetch_orders_for_buyer(buyer_id).await
    }

    async fn call_payment_settled_hook(&self, settled: &SettledPayment) {
        for emitter in &self.producers.payment_settled_producer {
            debug!("💳️ Notifying payment-settled hook subscribers");
            let event =
                PaymentSettledEvent::new(settled.buyer_id, settled.payment.clone(), settled.orders.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_payment_expired_hook(&self, outcome: &ExpiryOutcome) {
        for emitter in &self.producers.payment_expired_producer {
            debug!("🕰️ Notifying payment-expired hook subscribers");
            let event = PaymentExpiredEvent {
                payment: outcome.payment.clone(),
                cancelled_orders: outcome.cancelled_orders.clone(),
            };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
