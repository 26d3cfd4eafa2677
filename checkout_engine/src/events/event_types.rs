use crate::db_types::{Order, Payment};

/// Emitted after a webhook settlement commits: the payment is `Success` and the listed orders moved to
/// `PendingPickup`. Subscribers typically notify the buyer; delivery mechanics are outside the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSettledEvent {
    pub buyer_id: i64,
    pub payment: Payment,
    pub orders: Vec<Order>,
}

impl PaymentSettledEvent {
    pub fn new(buyer_id: i64, payment: Payment, orders: Vec<Order>) -> Self {
        Self { buyer_id, payment, orders }
    }
}

/// Emitted after the timeout sweep cancels a payment's outstanding orders and restores their stock.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentExpiredEvent {
    pub payment: Payment,
    pub cancelled_orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    PaymentSettled(PaymentSettledEvent),
    PaymentExpired(PaymentExpiredEvent),
}
