use std::{fmt::Display, future::Future, pin::Pin};

use thiserror::Error;

/// The read-side list caches the gateway knows how to invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDomain {
    ProductList,
    BrandList,
    CategoryList,
}

impl Display for CacheDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheDomain::ProductList => write!(f, "product-list"),
            CacheDomain::BrandList => write!(f, "brand-list"),
            CacheDomain::CategoryList => write!(f, "category-list"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Cache invalidation failed: {0}")]
pub struct CacheInvalidationError(pub String);

/// External collaborator that owns the versioned list caches.
///
/// Invalidation is attempted after every stock-affecting commit, but it is fire-and-forget: the caller logs a
/// failure and never propagates it, so a cache outage cannot roll back a checkout.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, domain: CacheDomain) -> Pin<Box<dyn Future<Output = Result<(), CacheInvalidationError>> + Send + '_>>;
}
