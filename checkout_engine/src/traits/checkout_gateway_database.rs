use chrono::Duration;
use scg_common::Cents;
use thiserror::Error;

use crate::{
    db_types::{CartLine, NewPaymentTransaction, Order, OrderStatusType, Payment, PaymentStatusType},
    objects::{CheckoutCommit, ExpiryOutcome, SellerGroup, SettledPayment},
};

/// This trait defines the highest level of behaviour for backends supporting the checkout engine.
///
/// This behaviour includes:
/// * Resolving cart items ahead of lock acquisition.
/// * Running the single atomic checkout transaction (validate, snapshot, decrement, schedule).
/// * Driving the payment state machine: webhook settlement, timeout expiry, manual cancellation.
#[allow(async_fn_in_trait)]
pub trait CheckoutGatewayDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches the cart lines (cart item + SKU + product join) for the given cart item ids belonging to
    /// `buyer_id`. Items belonging to another user, or referencing a deleted SKU, are silently absent from the
    /// result; callers detect that by comparing counts.
    async fn fetch_cart_lines(&self, buyer_id: i64, cart_item_ids: &[i64]) -> Result<Vec<CartLine>, CheckoutGatewayError>;

    /// Runs the whole checkout commit in a single atomic transaction:
    /// * re-fetches the cart lines and fails with [`CheckoutGatewayError::CartItemNotFound`] if any disappeared,
    /// * validates stock, product availability and seller ownership,
    /// * creates the `Pending` payment, one `PendingPayment` order per seller group, and the order-item
    ///   snapshots,
    /// * deletes the consumed cart items,
    /// * applies the guarded stock decrement per distinct SKU using the versions read at the start of the
    ///   transaction,
    /// * schedules the compensating cancellation job `cancel_delay` in the future.
    ///
    /// Any failure rolls the whole transaction back; no partial order, payment or stock mutation survives.
    async fn commit_checkout(
        &self,
        buyer_id: i64,
        groups: &[SellerGroup],
        cancel_delay: Duration,
    ) -> Result<CheckoutCommit, CheckoutGatewayError>;

    /// Settles a payment against an incoming gateway transaction, in one atomic transaction:
    /// * rejects a transaction id that was already recorded ([`CheckoutGatewayError::DuplicateTransaction`]),
    /// * rejects a payment that is not `Pending` ([`CheckoutGatewayError::PaymentNotPending`]),
    /// * verifies the transferred amount against the sum of the order-item snapshots
    ///   ([`CheckoutGatewayError::AmountMismatch`]),
    /// * records the transaction, sets the payment to `Success` and every order still `PendingPayment` to
    ///   `PendingPickup`.
    ///
    /// Removing the scheduled cancellation job is NOT part of this transaction; see
    /// [`CancellationQueue::cancel_scheduled`](crate::traits::CancellationQueue::cancel_scheduled).
    async fn settle_payment(
        &self,
        payment_id: i64,
        transaction: NewPaymentTransaction,
    ) -> Result<SettledPayment, CheckoutGatewayError>;

    /// The timeout-compensation path. Returns `Ok(None)` if the payment does not exist (the job outlived its
    /// payment; treat as handled). Otherwise, in one transaction: cancels every order still `PendingPayment`
    /// under the payment, restores stock for the snapshot quantities of the orders cancelled in *this*
    /// invocation (so redelivery never double-restores), and fails the payment if it is still `Pending`.
    async fn expire_payment(&self, payment_id: i64) -> Result<Option<ExpiryOutcome>, CheckoutGatewayError>;

    /// Manual cancellation by the buyer. Permitted only while the order is `PendingPayment`. Does not restore
    /// stock and does not touch the payment or sibling orders; stock is only reclaimed by the timeout path.
    async fn cancel_order(&self, buyer_id: i64, order_id: i64) -> Result<Order, CheckoutGatewayError>;

    /// Fetches the payment record.
    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, CheckoutGatewayError>;

    /// Fetches a single order.
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, CheckoutGatewayError>;

    /// Fetches all orders placed by the given buyer, oldest first.
    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, CheckoutGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), CheckoutGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Could not lease every SKU lock for the checkout. {0}")]
    LockUnavailable(String),
    #[error("One or more cart items no longer exist")]
    CartItemNotFound,
    #[error("SKU {sku_id} has {available} units left, but {requested} were requested")]
    OutOfStock { sku_id: i64, requested: i64, available: i64 },
    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(i64),
    #[error("Cart item {cart_item_id} does not belong to seller {seller_id}")]
    SellerMismatch { seller_id: i64, cart_item_id: i64 },
    #[error("The stock version for SKU {0} moved during the checkout transaction")]
    VersionConflict(i64),
    #[error("A transaction with gateway id {0} has already been recorded")]
    DuplicateTransaction(String),
    #[error("The requested payment {0} does not exist")]
    PaymentNotFound(i64),
    #[error("Payment {payment_id} is {status}, not Pending")]
    PaymentNotPending { payment_id: i64, status: PaymentStatusType },
    #[error("The transferred amount {actual} does not match the order total {expected}")]
    AmountMismatch { expected: Cents, actual: Cents },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {order_id} is {status} and can no longer be cancelled")]
    CannotCancel { order_id: i64, status: OrderStatusType },
    #[error("No payment id could be extracted from the transfer reference: {0}")]
    InvalidReference(String),
}

impl From<sqlx::Error> for CheckoutGatewayError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutGatewayError::DatabaseError(e.to_string())
    }
}
