use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CartLine, Order, OrderItem, OrderStatusType, ReceiverInfo},
    traits::CheckoutGatewayError,
};

/// Inserts a new order for one seller group of a checkout. Not atomic on its own; the checkout embeds this in
/// its transaction by passing `&mut *tx` as the connection argument.
pub async fn insert_order(
    buyer_id: i64,
    seller_id: i64,
    payment_id: i64,
    receiver: &ReceiverInfo,
    conn: &mut SqliteConnection,
) -> Result<Order, CheckoutGatewayError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (buyer_id, seller_id, payment_id, status, receiver_name, receiver_phone, receiver_address)
            VALUES ($1, $2, $3, 'PendingPayment', $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(buyer_id)
    .bind(seller_id)
    .bind(payment_id)
    .bind(&receiver.name)
    .bind(&receiver.phone)
    .bind(&receiver.address)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order created for seller #{seller_id} under payment #{payment_id}");
    Ok(order)
}

/// Writes the order-item snapshot for one cart line. Every copied field is frozen here; nothing is ever
/// re-derived from the live SKU or product.
pub async fn insert_order_item(
    order_id: i64,
    line: &CartLine,
    translations_json: &str,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, CheckoutGatewayError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, sku_id, product_name, unit_price, image, variant, quantity, translations)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(line.sku_id)
    .bind(&line.product_name)
    .bind(line.unit_price)
    .bind(&line.product_image)
    .bind(&line.variant)
    .bind(line.quantity)
    .bind(translations_json)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_payment(
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE payment_id = $1 ORDER BY id ASC")
        .bind(payment_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_orders_for_buyer(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at ASC")
        .bind(buyer_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_items_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// All order items under every order of the payment; the settlement sums these snapshots to verify the
/// transferred amount.
pub async fn fetch_items_for_payment(
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
            SELECT oi.* FROM order_items oi
            JOIN orders o ON oi.order_id = o.id
            WHERE o.payment_id = $1
            ORDER BY oi.id ASC
        "#,
    )
    .bind(payment_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Moves a single order from `from` to `to`, returning `None` if the order is not currently in `from`.
/// The status guard is what keeps every transition monotonic under races and redelivery.
pub(crate) async fn update_status_guarded(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, CheckoutGatewayError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to.to_string())
    .bind(order_id)
    .bind(from.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

/// Moves every order under the payment from `from` to `to`, returning only the orders actually flipped.
/// Orders already out of `from` are untouched, which is what makes settlement and expiry idempotent.
pub(crate) async fn update_status_for_payment_guarded(
    payment_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, CheckoutGatewayError> {
    let orders: Vec<Order> = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE payment_id = $2 AND status = $3 RETURNING *",
    )
    .bind(to.to_string())
    .bind(payment_id)
    .bind(from.to_string())
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
