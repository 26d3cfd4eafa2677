use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, Payment, ReceiverInfo};

/// One seller's slice of a checkout call: the receiver the seller ships to and the cart items bought from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerGroup {
    pub seller_id: i64,
    pub receiver: ReceiverInfo,
    pub cart_item_ids: Vec<i64>,
}

/// The checkout request body: one group per seller. A single request produces one payment covering every group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutRequest {
    pub groups: Vec<SellerGroup>,
}

impl CheckoutRequest {
    /// Every cart item id referenced across all groups, in request order.
    pub fn cart_item_ids(&self) -> Vec<i64> {
        self.groups.iter().flat_map(|g| g.cart_item_ids.iter().copied()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// What the atomic checkout transaction produced. `product_ids` feeds the post-commit cache invalidation.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    pub payment: Payment,
    pub orders: Vec<OrderWithItems>,
    pub product_ids: Vec<i64>,
}

/// The caller-facing checkout response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub payment_id: i64,
    pub orders: Vec<OrderWithItems>,
}

/// The outcome of a successful webhook settlement.
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub buyer_id: i64,
    pub payment: Payment,
    /// The orders moved to `PendingPickup` by this settlement.
    pub orders: Vec<Order>,
}

/// The outcome of one timeout-expiry invocation.
#[derive(Debug, Clone)]
pub struct ExpiryOutcome {
    pub payment: Payment,
    /// The orders cancelled by *this* invocation (already-terminal orders are untouched).
    pub cancelled_orders: Vec<Order>,
    /// `(sku_id, quantity)` restored to the ledger, one entry per order-item whose SKU still exists.
    pub restored: Vec<(i64, i64)>,
}

impl ExpiryOutcome {
    /// True if this invocation flipped no orders and moved no stock (a redelivered job, a payment that
    /// already settled, or one whose orders were all cancelled by hand).
    pub fn is_noop(&self) -> bool {
        self.cancelled_orders.is_empty() && self.restored.is_empty()
    }
}
