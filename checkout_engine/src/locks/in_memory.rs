use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use log::warn;

use super::{LockError, LockLease, LockManager};

#[derive(Debug, Clone, Copy)]
struct LeaseEntry {
    token: u64,
    expires_at: Instant,
}

impl LeaseEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Single-node lock store backed by a `Mutex<HashMap>` of lease entries.
///
/// Expired entries are treated as absent on acquisition, so a crashed holder never needs cleanup. Release only
/// removes entries that still carry the releasing lease's token.
#[derive(Clone, Default)]
pub struct InMemoryLockManager {
    leases: Arc<Mutex<HashMap<String, LeaseEntry>>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockManager for InMemoryLockManager {
    async fn acquire(&self, keys: &[String], ttl: Duration) -> Result<LockLease, LockError> {
        let token = rand::random::<u64>();
        let now = Instant::now();
        let mut leases = self.leases.lock().map_err(|e| LockError::Backend(e.to_string()))?;
        // All-or-nothing: check the whole batch before taking anything.
        if let Some(held) = keys.iter().find(|k| leases.get(*k).map(|e| e.is_live(now)).unwrap_or(false)) {
            return Err(LockError::Unavailable(held.to_string()));
        }
        let entry = LeaseEntry { token, expires_at: now + ttl };
        for key in keys {
            leases.insert(key.clone(), entry);
        }
        Ok(LockLease::new(token, keys.to_vec()))
    }

    async fn release(&self, lease: LockLease) {
        let mut leases = match self.leases.lock() {
            Ok(leases) => leases,
            Err(e) => {
                warn!("🔐️ Could not release lease {}: {e}. The TTL will reclaim it.", lease.token());
                return;
            },
        };
        for key in lease.keys() {
            if let Some(entry) = leases.get(key) {
                if entry.token == lease.token() {
                    leases.remove(key);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::locks::sku_lock_key;

    fn keys(ids: &[i64]) -> Vec<String> {
        ids.iter().map(|id| sku_lock_key(*id)).collect()
    }

    #[tokio::test]
    async fn acquire_and_release() {
        let mgr = InMemoryLockManager::new();
        let lease = mgr.acquire(&keys(&[1, 2]), Duration::from_secs(3)).await.unwrap();
        assert!(mgr.acquire(&keys(&[2]), Duration::from_secs(3)).await.is_err());
        mgr.release(lease).await;
        assert!(mgr.acquire(&keys(&[2]), Duration::from_secs(3)).await.is_ok());
    }

    #[tokio::test]
    async fn overlapping_batch_takes_nothing() {
        let mgr = InMemoryLockManager::new();
        let _held = mgr.acquire(&keys(&[2]), Duration::from_secs(3)).await.unwrap();
        // Key 2 is held, so the whole [1, 2, 3] batch must fail and leave 1 and 3 free.
        assert!(mgr.acquire(&keys(&[1, 2, 3]), Duration::from_secs(3)).await.is_err());
        assert!(mgr.acquire(&keys(&[1]), Duration::from_secs(3)).await.is_ok());
        assert!(mgr.acquire(&keys(&[3]), Duration::from_secs(3)).await.is_ok());
    }

    #[tokio::test]
    async fn expired_lease_is_reacquirable() {
        let mgr = InMemoryLockManager::new();
        let _stale = mgr.acquire(&keys(&[7]), Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(mgr.acquire(&keys(&[7]), Duration::from_secs(3)).await.is_ok());
    }

    #[tokio::test]
    async fn stale_release_does_not_evict_new_holder() {
        let mgr = InMemoryLockManager::new();
        let stale = mgr.acquire(&keys(&[9]), Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        let _current = mgr.acquire(&keys(&[9]), Duration::from_secs(3)).await.unwrap();
        mgr.release(stale).await;
        // The new holder's lease must survive the stale release.
        assert!(mgr.acquire(&keys(&[9]), Duration::from_secs(3)).await.is_err());
    }
}
