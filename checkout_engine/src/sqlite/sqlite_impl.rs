//! `SqliteDatabase` is a concrete implementation of a checkout gateway backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`]
//! module. Every multi-row operation runs inside a single `pool.begin()` transaction, so a failure at any step
//! leaves no partial order, payment, stock or job mutation behind.
use std::{collections::HashMap, fmt::Debug};

use chrono::{Duration, Utc};
use log::*;
use scg_common::Cents;
use sqlx::SqlitePool;

use super::db::{cart, db_url, jobs, new_pool, orders, payments, skus};
use crate::{
    db_types::{
        CartLine,
        DelayedJob,
        NewPaymentTransaction,
        Order,
        OrderStatusType,
        Payment,
        PaymentStatusType,
    },
    objects::{CheckoutCommit, ExpiryOutcome, OrderWithItems, SellerGroup, SettledPayment},
    traits::{CancellationQueue, CheckoutGatewayDatabase, CheckoutGatewayError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database instance, using the URL in `SCG_DATABASE_URL`, or the default if it is not set.
    pub async fn new(max_connections: u32) -> Result<Self, CheckoutGatewayError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, CheckoutGatewayError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), CheckoutGatewayError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CheckoutGatewayError::DatabaseError(e.to_string()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CheckoutGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_cart_lines(
        &self,
        buyer_id: i64,
        cart_item_ids: &[i64],
    ) -> Result<Vec<CartLine>, CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        cart::fetch_lines(buyer_id, cart_item_ids, &mut conn).await
    }

    async fn commit_checkout(
        &self,
        buyer_id: i64,
        groups: &[SellerGroup],
        cancel_delay: Duration,
    ) -> Result<CheckoutCommit, CheckoutGatewayError> {
        let requested: Vec<i64> = groups.iter().flat_map(|g| g.cart_item_ids.iter().copied()).collect();
        let mut tx = self.pool.begin().await?;

        // (a) Re-fetch under the transaction. A count mismatch means another process consumed or removed a
        // cart item since the caller resolved it.
        let lines = cart::fetch_lines(buyer_id, &requested, &mut tx).await?;
        if lines.len() != requested.len() {
            return Err(CheckoutGatewayError::CartItemNotFound);
        }
        let by_id: HashMap<i64, &CartLine> = lines.iter().map(|l| (l.cart_item_id, l)).collect();

        // (b) Stock and (c) product availability.
        let now = Utc::now();
        for line in &lines {
            if line.sku_stock < line.quantity {
                return Err(CheckoutGatewayError::OutOfStock {
                    sku_id: line.sku_id,
                    requested: line.quantity,
                    available: line.sku_stock,
                });
            }
            if !line.product_available(now) {
                return Err(CheckoutGatewayError::ProductUnavailable(line.product_id));
            }
        }

        // (d) Every cart item in a group must actually be sold by the group's seller.
        for group in groups {
            for cart_item_id in &group.cart_item_ids {
                let line = by_id.get(cart_item_id).ok_or(CheckoutGatewayError::CartItemNotFound)?;
                if line.seller_id != group.seller_id {
                    return Err(CheckoutGatewayError::SellerMismatch {
                        seller_id: group.seller_id,
                        cart_item_id: *cart_item_id,
                    });
                }
            }
        }

        // (e) One payment covering the whole call.
        let payment = payments::insert_pending(&mut tx).await?;

        // (f) One order per seller group, with write-once item snapshots.
        let mut product_ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let translations = cart::fetch_translations(&product_ids, &mut tx).await?;
        let empty = Vec::new();
        let mut created = Vec::with_capacity(groups.len());
        for group in groups {
            let order = orders::insert_order(buyer_id, group.seller_id, payment.id, &group.receiver, &mut tx).await?;
            let mut items = Vec::with_capacity(group.cart_item_ids.len());
            for cart_item_id in &group.cart_item_ids {
                let line = by_id[cart_item_id];
                let set = translations.get(&line.product_id).unwrap_or(&empty);
                let snapshot = serde_json::to_string(set)
                    .map_err(|e| CheckoutGatewayError::DatabaseError(e.to_string()))?;
                items.push(orders::insert_order_item(order.id, line, &snapshot, &mut tx).await?);
            }
            created.push(OrderWithItems { order, items });
        }

        // (g) The cart items are consumed by the purchase.
        cart::delete_items(&requested, &mut tx).await?;

        // (h) Guarded decrement per SKU, with the version read at (a). A conflict here means a writer slipped
        // past the SKU lease; abort the whole checkout rather than retry, so lock-manager bugs stay visible.
        for line in &lines {
            skus::decrement_stock(line.sku_id, line.quantity, line.sku_version, &mut tx).await?;
        }

        // (i) The compensating cancellation is scheduled atomically with the commit, so a crash between the
        // two cannot strand an order that never expires.
        let fire_at = Utc::now() + cancel_delay;
        jobs::schedule_cancellation(payment.id, fire_at, &mut tx).await?;

        tx.commit().await?;
        debug!("🗃️ Checkout for buyer #{buyer_id} committed as payment #{}", payment.id);
        Ok(CheckoutCommit { payment, orders: created, product_ids })
    }

    async fn settle_payment(
        &self,
        payment_id: i64,
        transaction: NewPaymentTransaction,
    ) -> Result<SettledPayment, CheckoutGatewayError> {
        let mut tx = self.pool.begin().await?;
        if payments::fetch_transaction(&transaction.tx_id, &mut tx).await?.is_some() {
            return Err(CheckoutGatewayError::DuplicateTransaction(transaction.tx_id));
        }
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(CheckoutGatewayError::PaymentNotFound(payment_id))?;
        if payment.status != PaymentStatusType::Pending {
            return Err(CheckoutGatewayError::PaymentNotPending { payment_id, status: payment.status });
        }
        let items = orders::fetch_items_for_payment(payment_id, &mut tx).await?;
        let expected: Cents = items.iter().map(|i| i.subtotal()).sum();
        if expected != transaction.amount {
            return Err(CheckoutGatewayError::AmountMismatch { expected, actual: transaction.amount });
        }
        let all_orders = orders::fetch_orders_for_payment(payment_id, &mut tx).await?;
        let buyer_id = all_orders
            .first()
            .map(|o| o.buyer_id)
            .ok_or_else(|| CheckoutGatewayError::DatabaseError(format!("Payment #{payment_id} has no orders")))?;
        payments::record_transaction(transaction, &mut tx).await?;
        let payment = payments::update_status_guarded(payment_id, PaymentStatusType::Pending, PaymentStatusType::Success, &mut tx)
            .await?
            .ok_or(CheckoutGatewayError::PaymentNotFound(payment_id))?;
        let settled_orders = orders::update_status_for_payment_guarded(
            payment_id,
            OrderStatusType::PendingPayment,
            OrderStatusType::PendingPickup,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!("🗃️ Payment #{payment_id} settled; {} orders moved to PendingPickup", settled_orders.len());
        Ok(SettledPayment { buyer_id, payment, orders: settled_orders })
    }

    async fn expire_payment(&self, payment_id: i64) -> Result<Option<ExpiryOutcome>, CheckoutGatewayError> {
        let mut tx = self.pool.begin().await?;
        if payments::fetch_payment(payment_id, &mut tx).await?.is_none() {
            return Ok(None);
        }
        // Only orders still awaiting payment are swept; anything already picked up or cancelled stays as-is,
        // which is what makes redelivered jobs harmless.
        let cancelled = orders::update_status_for_payment_guarded(
            payment_id,
            OrderStatusType::PendingPayment,
            OrderStatusType::Cancelled,
            &mut tx,
        )
        .await?;
        let mut restored = Vec::new();
        for order in &cancelled {
            for item in orders::fetch_items_for_order(order.id, &mut tx).await? {
                if let Some(sku_id) = item.sku_id {
                    if skus::restore_stock(sku_id, item.quantity, &mut tx).await? {
                        restored.push((sku_id, item.quantity));
                    } else {
                        trace!("🗃️ SKU #{sku_id} is gone; skipping restock of {} units", item.quantity);
                    }
                }
            }
        }
        let payment = match payments::update_status_guarded(
            payment_id,
            PaymentStatusType::Pending,
            PaymentStatusType::Failed,
            &mut tx,
        )
        .await?
        {
            Some(p) => p,
            // Already terminal: the webhook won the race, or an earlier sweep got here first.
            None => payments::fetch_payment(payment_id, &mut tx)
                .await?
                .ok_or(CheckoutGatewayError::PaymentNotFound(payment_id))?,
        };
        tx.commit().await?;
        Ok(Some(ExpiryOutcome { payment, cancelled_orders: cancelled, restored }))
    }

    async fn cancel_order(&self, buyer_id: i64, order_id: i64) -> Result<Order, CheckoutGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx)
            .await?
            .ok_or(CheckoutGatewayError::OrderNotFound(order_id))?;
        if order.buyer_id != buyer_id {
            // Another buyer's order is indistinguishable from a missing one.
            return Err(CheckoutGatewayError::OrderNotFound(order_id));
        }
        let cancelled = orders::update_status_guarded(
            order_id,
            OrderStatusType::PendingPayment,
            OrderStatusType::Cancelled,
            &mut tx,
        )
        .await?
        .ok_or(CheckoutGatewayError::CannotCancel { order_id, status: order.status })?;
        tx.commit().await?;
        Ok(cancelled)
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_buyer(buyer_id, &mut conn).await?;
        Ok(orders)
    }

    async fn close(&mut self) -> Result<(), CheckoutGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CancellationQueue for SqliteDatabase {
    async fn schedule_cancellation(&self, payment_id: i64, delay: Duration) -> Result<DelayedJob, CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let fire_at = Utc::now() + delay;
        let job = jobs::schedule_cancellation(payment_id, fire_at, &mut conn).await?;
        debug!("🗃️ Cancellation job [{}] scheduled for {}", job.job_id, job.fire_at);
        Ok(job)
    }

    async fn cancel_scheduled(&self, payment_id: i64) -> Result<(), CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        jobs::cancel_scheduled(payment_id, &mut conn).await
    }

    async fn due_cancellations(&self, now: chrono::DateTime<Utc>) -> Result<Vec<DelayedJob>, CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let due = jobs::due_jobs(now, &mut conn).await?;
        Ok(due)
    }

    async fn remove_job(&self, job_id: &str) -> Result<(), CheckoutGatewayError> {
        let mut conn = self.pool.acquire().await?;
        jobs::remove_job(job_id, &mut conn).await
    }
}
