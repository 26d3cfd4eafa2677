use std::{collections::HashSet, fmt::Debug, sync::Arc, time::Duration};

use log::*;

use crate::{
    flow_api::objects::{CheckoutRequest, CheckoutResult},
    locks::{sku_lock_key, LockManager},
    traits::{CacheDomain, CacheInvalidator, CheckoutGatewayDatabase, CheckoutGatewayError},
};

/// How long a checkout holds its SKU leases. Long enough to cover the transaction, short enough that a crashed
/// holder self-heals without operator intervention.
pub const LOCK_TTL: Duration = Duration::from_secs(3);

/// How long an unsettled payment lives before the compensating cancellation fires.
pub const DEFAULT_CANCEL_DELAY: chrono::Duration = chrono::Duration::hours(24);

/// `CheckoutApi` is the primary API for turning a cart into orders.
///
/// It owns the request-level orchestration: resolving the cart, leasing every distinct SKU, running the atomic
/// commit on the backend, and attempting read-side cache invalidation once the commit lands. Everything inside
/// the transaction boundary lives in the [`CheckoutGatewayDatabase`] backend.
pub struct CheckoutApi<B, L> {
    db: B,
    locks: L,
    invalidators: Vec<Arc<dyn CacheInvalidator>>,
    cancel_delay: chrono::Duration,
}

impl<B, L> Debug for CheckoutApi<B, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, L> CheckoutApi<B, L> {
    pub fn new(db: B, locks: L) -> Self {
        Self { db, locks, invalidators: Vec::new(), cancel_delay: DEFAULT_CANCEL_DELAY }
    }

    pub fn with_cancel_delay(mut self, delay: chrono::Duration) -> Self {
        self.cancel_delay = delay;
        self
    }

    pub fn add_cache_invalidator(&mut self, invalidator: Arc<dyn CacheInvalidator>) -> &mut Self {
        self.invalidators.push(invalidator);
        self
    }
}

impl<B, L> CheckoutApi<B, L>
where
    B: CheckoutGatewayDatabase,
    L: LockManager,
{
    /// Settle a cart into orders.
    ///
    /// Fails fast with [`CheckoutGatewayError::LockUnavailable`] if any touched SKU is leased by a competing
    /// checkout — nothing is written in that case, and the caller may retry after re-reading stock. All other
    /// failures come out of the atomic commit and leave no partial state behind.
    pub async fn checkout(&self, buyer_id: i64, request: &CheckoutRequest) -> Result<CheckoutResult, CheckoutGatewayError> {
        let cart_item_ids = request.cart_item_ids();
        let distinct: HashSet<i64> = cart_item_ids.iter().copied().collect();
        if cart_item_ids.is_empty() || distinct.len() != cart_item_ids.len() {
            return Err(CheckoutGatewayError::CartItemNotFound);
        }
        let lines = self.db.fetch_cart_lines(buyer_id, &cart_item_ids).await?;
        if lines.len() != cart_item_ids.len() {
            return Err(CheckoutGatewayError::CartItemNotFound);
        }
        let mut keys: Vec<String> = lines.iter().map(|l| sku_lock_key(l.sku_id)).collect();
        keys.sort();
        keys.dedup();
        trace!("🛒️ Buyer #{buyer_id} leasing {} SKU locks", keys.len());
        let lease = self
            .locks
            .acquire(&keys, LOCK_TTL)
            .await
            .map_err(|e| CheckoutGatewayError::LockUnavailable(e.to_string()))?;
        let result = self.db.commit_checkout(buyer_id, &request.groups, self.cancel_delay).await;
        // The lease is released whatever the transaction did; on failure the TTL would reclaim it anyway.
        self.locks.release(lease).await;
        let commit = result?;
        debug!(
            "🛒️ Buyer #{buyer_id} checked out payment #{} covering {} orders",
            commit.payment.id,
            commit.orders.len()
        );
        self.invalidate_list_caches().await;
        Ok(CheckoutResult { payment_id: commit.payment.id, orders: commit.orders })
    }

    /// Invalidation is attempted once per registered collaborator; failures are logged and swallowed so a
    /// cache outage cannot fail a committed checkout.
    async fn invalidate_list_caches(&self) {
        for invalidator in &self.invalidators {
            if let Err(e) = invalidator.invalidate(CacheDomain::ProductList).await {
                warn!("🛒️ {e}");
            }
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
