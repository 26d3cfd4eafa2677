//! Shared scaffolding for the engine integration tests: a fresh migrated database per test, and seed data for
//! the catalog and cart tables the checkout reads.
#![allow(dead_code)]

use checkout_engine::{
    db_types::ReceiverInfo,
    objects::{CheckoutRequest, SellerGroup},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    SqliteDatabase,
};

pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database")
}

pub async fn seed_product(db: &SqliteDatabase, seller_id: i64, name: &str) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO products (seller_id, name, image, published_at)
            VALUES ($1, $2, 'item.png', datetime('now', '-1 day'))
            RETURNING id
        "#,
    )
    .bind(seller_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .unwrap();
    sqlx::query("INSERT INTO product_translations (product_id, lang, name, description) VALUES ($1, 'en', $2, 'desc')")
        .bind(id)
        .bind(name)
        .execute(&mut *conn)
        .await
        .unwrap();
    id
}

/// A product that exists but is not purchasable yet (publish timestamp in the future).
pub async fn seed_unpublished_product(db: &SqliteDatabase, seller_id: i64, name: &str) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    sqlx::query_scalar(
        r#"
            INSERT INTO products (seller_id, name, published_at)
            VALUES ($1, $2, datetime('now', '+1 day'))
            RETURNING id
        "#,
    )
    .bind(seller_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}

pub async fn seed_sku(db: &SqliteDatabase, product_id: i64, seller_id: i64, price: i64, stock: i64) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    sqlx::query_scalar(
        r#"
            INSERT INTO skus (product_id, seller_id, variant, price, stock)
            VALUES ($1, $2, 'Red-Large', $3, $4)
            RETURNING id
        "#,
    )
    .bind(product_id)
    .bind(seller_id)
    .bind(price)
    .bind(stock)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}

pub async fn add_to_cart(db: &SqliteDatabase, user_id: i64, sku_id: i64, quantity: i64) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    sqlx::query_scalar("INSERT INTO cart_items (user_id, sku_id, quantity) VALUES ($1, $2, $3) RETURNING id")
        .bind(user_id)
        .bind(sku_id)
        .bind(quantity)
        .fetch_one(&mut *conn)
        .await
        .unwrap()
}

pub async fn stock_of(db: &SqliteDatabase, sku_id: i64) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    sqlx::query_scalar("SELECT stock FROM skus WHERE id = $1").bind(sku_id).fetch_one(&mut *conn).await.unwrap()
}

pub fn receiver() -> ReceiverInfo {
    ReceiverInfo { name: "Ada Lovelace".into(), phone: "555-0101".into(), address: "12 Analytical Way".into() }
}

pub fn single_seller_request(seller_id: i64, cart_item_ids: Vec<i64>) -> CheckoutRequest {
    CheckoutRequest { groups: vec![SellerGroup { seller_id, receiver: receiver(), cart_item_ids }] }
}
