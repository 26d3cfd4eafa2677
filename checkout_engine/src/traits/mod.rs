//! Behaviour contracts for checkout gateway backends.
//!
//! [`CheckoutGatewayDatabase`] is the storage seam: the atomic checkout commit, the settlement and expiry
//! transitions, and the read paths. [`CancellationQueue`] is the durable delayed-job seam used to reverse
//! checkouts whose payment never arrives. [`CacheInvalidator`] is the contract for the read-side list caches
//! the gateway invalidates after a stock-affecting commit; the cache itself lives outside this system.
mod cache_invalidator;
mod cancellation_queue;
mod checkout_gateway_database;

pub use cache_invalidator::{CacheDomain, CacheInvalidationError, CacheInvalidator};
pub use cancellation_queue::CancellationQueue;
pub use checkout_gateway_database::{CheckoutGatewayDatabase, CheckoutGatewayError};
