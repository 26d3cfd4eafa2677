//! Per-SKU mutual exclusion leases.
//!
//! Every checkout leases all the SKUs it touches before opening its transaction, so two buyers racing for the
//! last unit serialize on the lease rather than on the database. Leases are time-bounded: a crashed holder
//! self-heals when its TTL lapses, and the optimistic stock version is the second safety net behind it.
//!
//! [`LockManager`] is the pluggable seam. The in-process [`InMemoryLockManager`] satisfies the contract for a
//! single-node deployment; a Redis- or etcd-backed implementation with TTL semantics slots in behind the same
//! trait.
mod in_memory;

use std::time::Duration;

use thiserror::Error;

pub use in_memory::InMemoryLockManager;

pub const SKU_LOCK_PREFIX: &str = "lock:sku:";

/// The lock key for a SKU.
pub fn sku_lock_key(sku_id: i64) -> String {
    format!("{SKU_LOCK_PREFIX}{sku_id}")
}

#[derive(Debug, Clone, Error)]
pub enum LockError {
    #[error("The lock on {0} is already held")]
    Unavailable(String),
    #[error("Lock store error: {0}")]
    Backend(String),
}

/// An exclusive lease over a set of resource keys.
///
/// The owner token distinguishes this holder from a later one: once the TTL lapses, another checkout may
/// re-acquire the same keys, and a stale release must not evict the new holder.
#[derive(Debug, Clone)]
pub struct LockLease {
    token: u64,
    keys: Vec<String>,
}

impl LockLease {
    pub fn new(token: u64, keys: Vec<String>) -> Self {
        Self { token, keys }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Factory for time-bounded, all-or-nothing lock leases.
#[allow(async_fn_in_trait)]
pub trait LockManager: Clone + Send + Sync {
    /// Acquire a lease over every key in the batch, or nothing at all.
    ///
    /// If any key is currently held (and unexpired), the call fails fast with [`LockError::Unavailable`] and no
    /// key is left held. The whole batch is taken in one step precisely so that two checkouts touching
    /// overlapping SKU sets in different orders cannot deadlock each other.
    async fn acquire(&self, keys: &[String], ttl: Duration) -> Result<LockLease, LockError>;

    /// Release a lease. Best-effort: a failure is swallowed, because the TTL is the real safety net.
    async fn release(&self, lease: LockLease);
}
