pub mod cancellation_worker;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod webhook_routes;

use checkout_engine::{locks::InMemoryLockManager, CheckoutApi, SettlementApi, SqliteDatabase};

/// The concrete orchestrator this deployment runs: the SQLite backend behind the in-process lock store.
pub type GatewayCheckoutApi = CheckoutApi<SqliteDatabase, InMemoryLockManager>;
pub type GatewaySettlementApi = SettlementApi<SqliteDatabase>;
