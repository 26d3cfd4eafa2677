use checkout_engine::{events::EventProducers, CancellationQueue, SettlementApi, SqliteDatabase};
use chrono::Utc;
use log::*;
use tokio::task::JoinHandle;

/// Starts the delayed-cancellation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The worker polls the durable queue for due jobs and drives the settlement API's timeout path. A job is only
/// removed after its handler returns, so delivery is at-least-once; the handler's status guards make the
/// redelivery harmless.
pub fn start_cancellation_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    poll_interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        let api = SettlementApi::new(db.clone(), producers);
        info!("🕰️ Delayed cancellation worker started");
        loop {
            timer.tick().await;
            let due = match db.due_cancellations(Utc::now()).await {
                Ok(due) => due,
                Err(e) => {
                    error!("🕰️ Could not poll the cancellation queue: {e}");
                    continue;
                },
            };
            if due.is_empty() {
                continue;
            }
            info!("🕰️ {} cancellation jobs are due", due.len());
            for job in due {
                match api.expire(job.payment_id).await {
                    Ok(_) => {
                        if let Err(e) = db.remove_job(&job.job_id).await {
                            // The job will be redelivered next sweep and no-op against the handled payment.
                            warn!("🕰️ Could not remove handled job [{}]: {e}", job.job_id);
                        }
                    },
                    Err(e) => {
                        error!("🕰️ Expiry for payment #{} failed; the job stays queued for retry: {e}", job.payment_id);
                    },
                }
            }
        }
    })
}
