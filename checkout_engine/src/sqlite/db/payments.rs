use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentTransaction, Payment, PaymentStatusType, PaymentTransaction},
    traits::CheckoutGatewayError,
};

pub async fn insert_pending(conn: &mut SqliteConnection) -> Result<Payment, CheckoutGatewayError> {
    let payment = sqlx::query_as("INSERT INTO payments (status) VALUES ('Pending') RETURNING *;")
        .fetch_one(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

/// Moves the payment from `from` to `to`, returning `None` if the payment is not currently in `from`.
/// Terminal states are never left: there is no guard that admits `Success` or `Failed` as `from` targets in
/// the engine.
pub(crate) async fn update_status_guarded(
    payment_id: i64,
    from: PaymentStatusType,
    to: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, CheckoutGatewayError> {
    let result: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to.to_string())
    .bind(payment_id)
    .bind(from.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_transaction(
    tx_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let transaction = sqlx::query_as("SELECT * FROM payment_transactions WHERE tx_id = $1")
        .bind(tx_id)
        .fetch_optional(conn)
        .await?;
    Ok(transaction)
}

/// Records the gateway transfer. The gateway transaction id is the primary key, so a replayed webhook that
/// races past the existence check still lands here as a unique violation and is rejected, not overwritten.
pub async fn record_transaction(
    transaction: NewPaymentTransaction,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, CheckoutGatewayError> {
    let tx_id = transaction.tx_id.clone();
    let recorded = sqlx::query_as(
        r#"
            INSERT INTO payment_transactions (tx_id, gateway_code, amount, reference) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(transaction.tx_id)
    .bind(transaction.gateway_code)
    .bind(transaction.amount)
    .bind(transaction.reference)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => CheckoutGatewayError::DuplicateTransaction(tx_id),
        _ => CheckoutGatewayError::from(e),
    })?;
    Ok(recorded)
}
