//! The durable delayed-job table backing the cancellation scheduler.
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{db_types::DelayedJob, traits::CheckoutGatewayError};

/// Enqueues (or replaces) the cancellation job for the payment. The job id is derived from the payment id and
/// is the primary key, so re-scheduling can never produce a second pending job for the same payment.
pub async fn schedule_cancellation(
    payment_id: i64,
    fire_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<DelayedJob, CheckoutGatewayError> {
    let job = sqlx::query_as(
        r#"
            INSERT OR REPLACE INTO delayed_jobs (job_id, payment_id, fire_at) VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(DelayedJob::job_id_for_payment(payment_id))
    .bind(payment_id)
    .bind(fire_at)
    .fetch_one(conn)
    .await?;
    Ok(job)
}

/// Removes the scheduled job for the payment. Removing an absent job is a no-op, not an error.
pub async fn cancel_scheduled(payment_id: i64, conn: &mut SqliteConnection) -> Result<(), CheckoutGatewayError> {
    sqlx::query("DELETE FROM delayed_jobs WHERE job_id = $1")
        .bind(DelayedJob::job_id_for_payment(payment_id))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn due_jobs(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<DelayedJob>, sqlx::Error> {
    let jobs = sqlx::query_as("SELECT * FROM delayed_jobs WHERE fire_at <= $1 ORDER BY fire_at ASC")
        .bind(now)
        .fetch_all(conn)
        .await?;
    Ok(jobs)
}

pub async fn remove_job(job_id: &str, conn: &mut SqliteConnection) -> Result<(), CheckoutGatewayError> {
    sqlx::query("DELETE FROM delayed_jobs WHERE job_id = $1").bind(job_id).execute(conn).await?;
    Ok(())
}
