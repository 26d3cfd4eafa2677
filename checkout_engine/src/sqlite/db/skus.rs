//! The stock ledger. Stock is only ever mutated through these guarded operations.
use sqlx::SqliteConnection;

use crate::{db_types::Sku, traits::CheckoutGatewayError};

/// Applies the optimistic, guarded stock decrement.
///
/// The version match and the sufficient-stock check live in the same conditional UPDATE, so a competing writer
/// (e.g. an admin stock edit) between the transaction's read and this write leaves zero rows affected and the
/// decrement fails with [`CheckoutGatewayError::VersionConflict`] instead of silently losing an update. The
/// version counter is bumped on every successful write.
pub async fn decrement_stock(
    sku_id: i64,
    quantity: i64,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CheckoutGatewayError> {
    let result = sqlx::query(
        r#"
            UPDATE skus SET stock = stock - $1, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND version = $3 AND stock >= $1
        "#,
    )
    .bind(quantity)
    .bind(sku_id)
    .bind(expected_version)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(CheckoutGatewayError::VersionConflict(sku_id));
    }
    Ok(())
}

/// Unconditionally restores stock. Used only by the timeout-compensation path, after the orders holding the
/// units are already cancelled, so it never competes with a checkout decrement on correctness.
///
/// Returns `false` if the SKU no longer exists (or was soft-deleted); the caller skips it.
pub async fn restore_stock(
    sku_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, CheckoutGatewayError> {
    let result = sqlx::query(
        r#"
            UPDATE skus SET stock = stock + $1, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND deleted_at IS NULL
        "#,
    )
    .bind(quantity)
    .bind(sku_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_sku(sku_id: i64, conn: &mut SqliteConnection) -> Result<Option<Sku>, sqlx::Error> {
    let sku = sqlx::query_as("SELECT * FROM skus WHERE id = $1").bind(sku_id).fetch_optional(conn).await?;
    Ok(sku)
}
