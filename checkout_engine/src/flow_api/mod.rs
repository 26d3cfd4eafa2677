mod checkout_api;
pub mod objects;
mod settlement_api;

pub use checkout_api::{CheckoutApi, DEFAULT_CANCEL_DELAY, LOCK_TTL};
pub use settlement_api::SettlementApi;
