use std::{future::Future, pin::Pin};

use checkout_engine::{
    traits::{CacheDomain, CacheInvalidationError},
    CacheInvalidator,
};
use log::info;

/// Stand-in for the read-side cache collaborator.
///
/// The real list caches (and their version keys) live in a separate service; this deployment only records
/// that an invalidation was attempted. Swapping in an HTTP- or Redis-backed implementation is a matter of
/// registering a different [`CacheInvalidator`] on the checkout API.
#[derive(Debug, Default, Clone)]
pub struct LogCacheInvalidator;

impl CacheInvalidator for LogCacheInvalidator {
    fn invalidate(
        &self,
        domain: CacheDomain,
    ) -> Pin<Box<dyn Future<Output = Result<(), CacheInvalidationError>> + Send + '_>> {
        Box::pin(async move {
            info!("🧹️ Bumping the {domain} cache version");
            Ok(())
        })
    }
}
