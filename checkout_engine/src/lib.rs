//! Storefront Checkout Engine
//!
//! The checkout engine settles multi-seller shopping-cart checkouts into durable orders under concurrent stock
//! contention, and reconciles payment completion or timeout asynchronously. It is transport-agnostic; the HTTP
//! surface lives in the `checkout_server` crate.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never need to
//!    access the database directly; use the public APIs instead. The exception is the data types used in the
//!    database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`CheckoutApi`] and [`SettlementApi`]). `CheckoutApi` runs the cart-to-order pipeline:
//!    per-SKU lock leases, the atomic checkout transaction, and post-commit cache invalidation. `SettlementApi`
//!    owns the payment state machine: webhook settlement, timeout expiry, and manual cancellation. Backends
//!    implement the traits in [`mod@traits`] to drive these APIs.
//! 3. Per-SKU mutual exclusion ([`mod@locks`]): short-lived lock leases behind a pluggable [`locks::LockManager`]
//!    trait, so a shared coordination store can replace the in-process implementation without touching the flow.
//!
//! The engine also emits events when payments settle. A simple actor framework lets you hook into these events
//! and perform custom actions, such as notifying the buyer.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod locks;
mod flow_api;
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use flow_api::{
    objects,
    objects::{CheckoutRequest, CheckoutResult, ExpiryOutcome, SellerGroup, SettledPayment},
    CheckoutApi,
    SettlementApi,
    DEFAULT_CANCEL_DELAY,
    LOCK_TTL,
};
pub use sqlite::SqliteDatabase;
pub use traits::{CacheDomain, CacheInvalidator, CancellationQueue, CheckoutGatewayDatabase, CheckoutGatewayError};
