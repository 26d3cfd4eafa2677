//! The delayed-cancellation queue: deterministic keys, same-key-replaces semantics, and due-job ordering.
mod helpers;

use checkout_engine::{db_types::DelayedJob, CancellationQueue};
use chrono::{Duration, Utc};
use helpers::*;

#[tokio::test]
async fn rescheduling_replaces_rather_than_duplicates() {
    let db = new_test_db().await;
    let first = db.schedule_cancellation(42, Duration::hours(24)).await.unwrap();
    assert_eq!(first.job_id, DelayedJob::job_id_for_payment(42));

    let second = db.schedule_cancellation(42, Duration::hours(1)).await.unwrap();
    assert_eq!(second.job_id, first.job_id);

    // Only the most recent schedule survives, and it now fires within two hours.
    let due = db.due_cancellations(Utc::now() + Duration::hours(2)).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].payment_id, 42);
}

#[tokio::test]
async fn cancelling_an_absent_job_is_not_an_error() {
    let db = new_test_db().await;
    db.cancel_scheduled(12345).await.unwrap();
}

#[tokio::test]
async fn due_jobs_come_back_oldest_first() {
    let db = new_test_db().await;
    db.schedule_cancellation(1, Duration::hours(3)).await.unwrap();
    db.schedule_cancellation(2, Duration::hours(1)).await.unwrap();
    db.schedule_cancellation(3, Duration::hours(2)).await.unwrap();

    assert!(db.due_cancellations(Utc::now()).await.unwrap().is_empty());
    let due = db.due_cancellations(Utc::now() + Duration::hours(4)).await.unwrap();
    let order: Vec<i64> = due.iter().map(|j| j.payment_id).collect();
    assert_eq!(order, vec![2, 3, 1]);
}

#[tokio::test]
async fn removed_jobs_stop_being_due() {
    let db = new_test_db().await;
    let job = db.schedule_cancellation(7, Duration::milliseconds(0)).await.unwrap();
    assert_eq!(db.due_cancellations(Utc::now() + Duration::seconds(1)).await.unwrap().len(), 1);
    db.remove_job(&job.job_id).await.unwrap();
    assert!(db.due_cancellations(Utc::now() + Duration::seconds(1)).await.unwrap().is_empty());
}
