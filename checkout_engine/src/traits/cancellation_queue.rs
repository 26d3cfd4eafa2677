use chrono::{DateTime, Duration, Utc};

use crate::{db_types::DelayedJob, traits::CheckoutGatewayError};

/// Durable delayed-job queue holding at most one pending cancellation per payment.
///
/// The job key is derived deterministically from the payment id, so scheduling the same payment twice replaces
/// the existing job rather than duplicating it. Delivery is at-least-once: the worker removes a job only after
/// the expiry handler returns, and the handler itself is idempotent.
#[allow(async_fn_in_trait)]
pub trait CancellationQueue: Clone {
    /// Enqueues (or replaces) the cancellation job for `payment_id`, due `delay` from now.
    ///
    /// The checkout transaction schedules its job atomically with the commit; this standalone entry point
    /// exists for re-scheduling and for tests.
    async fn schedule_cancellation(&self, payment_id: i64, delay: Duration) -> Result<DelayedJob, CheckoutGatewayError>;

    /// Removes the scheduled job for `payment_id` if one exists. An absent job is not an error.
    async fn cancel_scheduled(&self, payment_id: i64) -> Result<(), CheckoutGatewayError>;

    /// Fetches every job whose fire time has passed, oldest first.
    async fn due_cancellations(&self, now: DateTime<Utc>) -> Result<Vec<DelayedJob>, CheckoutGatewayError>;

    /// Removes a job by its key, after its handler has run.
    async fn remove_job(&self, job_id: &str) -> Result<(), CheckoutGatewayError>;
}
