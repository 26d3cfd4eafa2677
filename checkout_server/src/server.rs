use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::{EventHandlers, EventHooks, EventProducers, PaymentSettledEvent},
    locks::InMemoryLockManager,
    CheckoutApi,
    SettlementApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    cancellation_worker::start_cancellation_worker,
    config::ServerConfig,
    errors::ServerError,
    integrations::cache::LogCacheInvalidator,
    routes::{cancel_order, checkout, health, my_orders},
    webhook_routes::{payment_webhook, WebhookKey},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;

    // The "payment settled" event is the hand-off point to the notification collaborator. Delivery mechanics
    // live on that side of the fence; emitting the event is this server's whole obligation.
    let mut hooks = EventHooks::default();
    hooks.on_payment_settled(|event: PaymentSettledEvent| {
        Box::pin(async move {
            info!(
                "🔔️ payment event for user #{}: payment #{} settled, {} orders awaiting pickup",
                event.buyer_id,
                event.payment.id,
                event.orders.len()
            );
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    start_cancellation_worker(db.clone(), producers.clone(), Duration::from_secs(config.sweep_interval_secs));

    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    // One lock store for the whole server: workers must contend on the same leases.
    let locks = InMemoryLockManager::new();
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let mut checkout_api =
            CheckoutApi::new(db.clone(), locks.clone()).with_cancel_delay(config.payment_timeout);
        checkout_api.add_cache_invalidator(Arc::new(LogCacheInvalidator));
        let settlement_api = SettlementApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("scg::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(WebhookKey(config.webhook_key.clone())))
            .service(health)
            .service(checkout)
            .service(my_orders)
            .service(cancel_order)
            .service(payment_webhook)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
