use std::env;

use chrono::Duration;
use log::*;
use scg_common::Secret;

const DEFAULT_SCG_HOST: &str = "127.0.0.1";
const DEFAULT_SCG_PORT: u16 = 8360;
const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::hours(24);
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The shared static key the payment gateway sends in the `x-webhook-key` header. Compared by exact match.
    pub webhook_key: Secret<String>,
    /// How long an unsettled payment lives before its compensating cancellation fires.
    pub payment_timeout: Duration,
    /// How often the cancellation worker polls the delayed-job queue for due jobs.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SCG_HOST.to_string(),
            port: DEFAULT_SCG_PORT,
            database_url: String::default(),
            webhook_key: Secret::default(),
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SCG_HOST").ok().unwrap_or_else(|| DEFAULT_SCG_HOST.into());
        let port = env::var("SCG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SCG_PORT. {e} Using the default, {DEFAULT_SCG_PORT}, instead."
                    );
                    DEFAULT_SCG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SCG_PORT);
        let database_url = env::var("SCG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SCG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let webhook_key = env::var("SCG_WEBHOOK_KEY").map(Secret::new).unwrap_or_else(|_| {
            warn!(
                "🚨️ SCG_WEBHOOK_KEY is not set. Incoming payment webhooks cannot authenticate, and every \
                 settlement call will be rejected. Set it to the key configured at the payment gateway."
            );
            Secret::default()
        });
        let payment_timeout = env::var("SCG_PAYMENT_TIMEOUT_HOURS")
            .map_err(|_| {
                info!(
                    "🪛️ SCG_PAYMENT_TIMEOUT_HOURS is not set. Using the default value of {} hrs.",
                    DEFAULT_PAYMENT_TIMEOUT.num_hours()
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(Duration::hours)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SCG_PAYMENT_TIMEOUT_HOURS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_PAYMENT_TIMEOUT);
        let sweep_interval_secs = env::var("SCG_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SCG_SWEEP_INTERVAL_SECS. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        Self { host, port, database_url, webhook_key, payment_timeout, sweep_interval_secs }
    }
}
