//! End-to-end exercises of the checkout pipeline against the SQLite backend: the happy path, every validation
//! failure, and the settlement/expiry/cancellation follow-ups.
mod helpers;

use checkout_engine::{
    db_types::{NewPaymentTransaction, OrderStatusType, PaymentStatusType, ReceiverInfo},
    events::EventProducers,
    helpers::payment_reference,
    locks::InMemoryLockManager,
    objects::{CheckoutRequest, SellerGroup},
    CancellationQueue,
    CheckoutApi,
    CheckoutGatewayDatabase,
    CheckoutGatewayError,
    SettlementApi,
    SqliteDatabase,
};
use chrono::{Duration, Utc};
use helpers::*;
use scg_common::Cents;

fn checkout_api(db: &SqliteDatabase) -> CheckoutApi<SqliteDatabase, InMemoryLockManager> {
    CheckoutApi::new(db.clone(), InMemoryLockManager::new())
}

fn settlement_api(db: &SqliteDatabase) -> SettlementApi<SqliteDatabase> {
    SettlementApi::new(db.clone(), EventProducers::default())
}

/// Scenario A: stock 5, buyer takes all 5. The checkout commits, the payment is pending, and a cancellation
/// job is waiting 24 hours out.
#[tokio::test]
async fn full_stock_checkout_commits() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let cart_item = add_to_cart(&db, 1, sku, 5).await;

    let result = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap();
    assert_eq!(result.orders.len(), 1);
    let order = &result.orders[0].order;
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert_eq!(order.seller_id, 77);
    assert_eq!(result.orders[0].items.len(), 1);
    let item = &result.orders[0].items[0];
    assert_eq!(item.quantity, 5);
    assert_eq!(item.unit_price, Cents::from(1000));
    assert_eq!(item.product_name, "Teapot");
    assert_eq!(item.translation_set().len(), 1);

    assert_eq!(stock_of(&db, sku).await, 0);
    let payment = db.fetch_payment(result.payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Pending);

    // The compensating cancellation is queued for +24h: not due now, due within 25h.
    assert!(db.due_cancellations(Utc::now()).await.unwrap().is_empty());
    let due_later = db.due_cancellations(Utc::now() + Duration::hours(25)).await.unwrap();
    assert_eq!(due_later.len(), 1);
    assert_eq!(due_later[0].payment_id, result.payment_id);

    // The cart item was consumed.
    let err = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::CartItemNotFound));
}

/// Scenario B: with the shelf empty after A, a second buyer's single unit is refused.
#[tokio::test]
async fn sold_out_sku_rejects_next_buyer() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let first = add_to_cart(&db, 1, sku, 5).await;
    checkout_api(&db).checkout(1, &single_seller_request(77, vec![first])).await.unwrap();

    let second = add_to_cart(&db, 2, sku, 1).await;
    let err = checkout_api(&db).checkout(2, &single_seller_request(77, vec![second])).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::OutOfStock { requested: 1, available: 0, .. }));
    assert_eq!(stock_of(&db, sku).await, 0);
}

/// Scenario C: a webhook with the exact total settles the payment and removes the scheduled job.
#[tokio::test]
async fn exact_amount_webhook_settles() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let cart_item = add_to_cart(&db, 1, sku, 5).await;
    let result = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap();

    let transaction =
        NewPaymentTransaction::new("gw-001".into(), payment_reference(result.payment_id), Cents::from(5000));
    let settled = settlement_api(&db).settle_webhook(transaction).await.unwrap();
    assert_eq!(settled.buyer_id, 1);
    assert_eq!(settled.payment.status, PaymentStatusType::Success);
    assert_eq!(settled.orders.len(), 1);
    assert_eq!(settled.orders[0].status, OrderStatusType::PendingPickup);
    assert!(db.due_cancellations(Utc::now() + Duration::hours(25)).await.unwrap().is_empty());
}

/// Scenario D: a mismatched amount is rejected and changes nothing.
#[tokio::test]
async fn mismatched_amount_webhook_is_rejected() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let cart_item = add_to_cart(&db, 1, sku, 5).await;
    let result = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap();

    let transaction =
        NewPaymentTransaction::new("gw-001".into(), payment_reference(result.payment_id), Cents::from(4999));
    let err = settlement_api(&db).settle_webhook(transaction).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::AmountMismatch { .. }));
    let payment = db.fetch_payment(result.payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Pending);
    assert_eq!(stock_of(&db, sku).await, 0);
}

/// Scenario E: no webhook ever arrives; the timeout path cancels the order, restores the stock and fails the
/// payment.
#[tokio::test]
async fn timeout_expiry_restores_stock() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let cart_item = add_to_cart(&db, 1, sku, 5).await;
    let result = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap();
    assert_eq!(stock_of(&db, sku).await, 0);

    let outcome = settlement_api(&db).expire(result.payment_id).await.unwrap().unwrap();
    assert_eq!(outcome.payment.status, PaymentStatusType::Failed);
    assert_eq!(outcome.cancelled_orders.len(), 1);
    assert_eq!(outcome.cancelled_orders[0].status, OrderStatusType::Cancelled);
    assert_eq!(outcome.restored, vec![(sku, 5)]);
    assert_eq!(stock_of(&db, sku).await, 5);
}

/// Scenario F: a manual cancellation flips the order but leaves the stock and the payment alone.
#[tokio::test]
async fn manual_cancel_does_not_restock() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let cart_item = add_to_cart(&db, 1, sku, 5).await;
    let result = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap();
    let order_id = result.orders[0].order.id;

    let cancelled = settlement_api(&db).cancel_order(1, order_id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(stock_of(&db, sku).await, 0);
    let payment = db.fetch_payment(result.payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Pending);

    // A second attempt finds the order out of its cancellable state.
    let err = settlement_api(&db).cancel_order(1, order_id).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::CannotCancel { .. }));
    // Another buyer cannot see (or cancel) the order at all.
    let err = settlement_api(&db).cancel_order(2, order_id).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::OrderNotFound(_)));
}

#[tokio::test]
async fn unpublished_product_is_unavailable() {
    let db = new_test_db().await;
    let product = seed_unpublished_product(&db, 77, "Vaporware").await;
    let sku = seed_sku(&db, product, 77, 2500, 10).await;
    let cart_item = add_to_cart(&db, 1, sku, 1).await;
    let err = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::ProductUnavailable(id) if id == product));
    assert_eq!(stock_of(&db, sku).await, 10);
}

#[tokio::test]
async fn mislabelled_seller_group_is_rejected() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let cart_item = add_to_cart(&db, 1, sku, 1).await;
    // The request claims seller 88 sold the item; the SKU says otherwise.
    let err = checkout_api(&db).checkout(1, &single_seller_request(88, vec![cart_item])).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::SellerMismatch { seller_id: 88, .. }));
    assert_eq!(stock_of(&db, sku).await, 5);
}

#[tokio::test]
async fn foreign_cart_item_is_not_found() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let someone_elses = add_to_cart(&db, 99, sku, 1).await;
    let err = checkout_api(&db).checkout(1, &single_seller_request(77, vec![someone_elses])).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::CartItemNotFound));
}

/// One checkout call spanning two sellers produces one payment and two orders, and the settlement flips both.
#[tokio::test]
async fn multi_seller_checkout_shares_one_payment() {
    let db = new_test_db().await;
    let p1 = seed_product(&db, 10, "Teapot").await;
    let sku1 = seed_sku(&db, p1, 10, 1000, 3).await;
    let p2 = seed_product(&db, 20, "Kettle").await;
    let sku2 = seed_sku(&db, p2, 20, 4000, 2).await;
    let ci1 = add_to_cart(&db, 5, sku1, 2).await;
    let ci2 = add_to_cart(&db, 5, sku2, 1).await;

    let request = CheckoutRequest {
        groups: vec![
            SellerGroup { seller_id: 10, receiver: receiver(), cart_item_ids: vec![ci1] },
            SellerGroup { seller_id: 20, receiver: receiver(), cart_item_ids: vec![ci2] },
        ],
    };
    let result = checkout_api(&db).checkout(5, &request).await.unwrap();
    assert_eq!(result.orders.len(), 2);
    assert_eq!(stock_of(&db, sku1).await, 1);
    assert_eq!(stock_of(&db, sku2).await, 1);

    // 2 × 1000 + 1 × 4000
    let transaction =
        NewPaymentTransaction::new("gw-multi".into(), payment_reference(result.payment_id), Cents::from(6000));
    let settled = settlement_api(&db).settle_webhook(transaction).await.unwrap();
    assert_eq!(settled.orders.len(), 2);
    assert!(settled.orders.iter().all(|o| o.status == OrderStatusType::PendingPickup));
}

/// The order-item snapshot is immune to catalog edits made after the checkout.
#[tokio::test]
async fn snapshot_survives_catalog_changes() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, 5).await;
    let cart_item = add_to_cart(&db, 1, sku, 2).await;
    let result = checkout_api(&db).checkout(1, &single_seller_request(77, vec![cart_item])).await.unwrap();

    let mut conn = db.pool().acquire().await.unwrap();
    sqlx::query("UPDATE products SET name = 'Renamed' WHERE id = $1").bind(product).execute(&mut *conn).await.unwrap();
    sqlx::query("UPDATE skus SET price = 9999, version = version + 1 WHERE id = $1")
        .bind(sku)
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query("UPDATE product_translations SET name = 'Renamed' WHERE product_id = $1")
        .bind(product)
        .execute(&mut *conn)
        .await
        .unwrap();

    let item = &result.orders[0].items[0];
    assert_eq!(item.product_name, "Teapot");
    assert_eq!(item.unit_price, Cents::from(1000));
    assert_eq!(item.translation_set()[0].name, "Teapot");

    // The settlement total is computed from the snapshot, not the live price.
    let transaction =
        NewPaymentTransaction::new("gw-snap".into(), payment_reference(result.payment_id), Cents::from(2000));
    settlement_api(&db).settle_webhook(transaction).await.unwrap();
}

#[tokio::test]
async fn empty_checkout_request_is_rejected() {
    let db = new_test_db().await;
    let request = CheckoutRequest {
        groups: vec![SellerGroup {
            seller_id: 1,
            receiver: ReceiverInfo { name: "A".into(), phone: "1".into(), address: "B".into() },
            cart_item_ids: vec![],
        }],
    };
    let err = checkout_api(&db).checkout(1, &request).await.unwrap_err();
    assert!(matches!(err, CheckoutGatewayError::CartItemNotFound));
}
