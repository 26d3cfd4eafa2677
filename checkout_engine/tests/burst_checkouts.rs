//! Contention test: more buyers than stock, all racing for the same SKU. Exactly `stock` checkouts may
//! succeed, every loser gets a clean contention or out-of-stock error, and the ledger never goes negative.
mod helpers;

use checkout_engine::{
    locks::InMemoryLockManager,
    CheckoutApi,
    CheckoutGatewayError,
    SqliteDatabase,
};
use helpers::*;

const STOCK: i64 = 5;
const BUYERS: i64 = 8;

async fn checkout_with_retry(db: SqliteDatabase, locks: InMemoryLockManager, buyer_id: i64, cart_item: i64) -> bool {
    let api = CheckoutApi::new(db, locks);
    // Contention errors are retryable by contract; the caller re-reads stock by simply trying again.
    loop {
        match api.checkout(buyer_id, &single_seller_request(77, vec![cart_item])).await {
            Ok(_) => return true,
            Err(CheckoutGatewayError::OutOfStock { .. }) => return false,
            Err(CheckoutGatewayError::LockUnavailable(_)) => {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            },
            Err(e) => panic!("Unexpected checkout failure for buyer {buyer_id}: {e}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn last_units_go_to_exactly_n_buyers() {
    let db = new_test_db().await;
    let product = seed_product(&db, 77, "Limited Teapot").await;
    let sku = seed_sku(&db, product, 77, 1000, STOCK).await;
    let locks = InMemoryLockManager::new();

    let mut carts = Vec::new();
    for buyer in 1..=BUYERS {
        carts.push((buyer, add_to_cart(&db, buyer, sku, 1).await));
    }

    let mut handles = Vec::new();
    for (buyer, cart_item) in carts {
        let db = db.clone();
        let locks = locks.clone();
        handles.push(tokio::spawn(checkout_with_retry(db, locks, buyer, cart_item)));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, STOCK);
    assert_eq!(stock_of(&db, sku).await, 0);
}
