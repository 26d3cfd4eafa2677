use std::collections::HashMap;

use log::trace;
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{CartLine, TranslationSnapshot},
    traits::CheckoutGatewayError,
};

/// Fetches the cart lines for the given cart item ids belonging to `buyer_id`, with SKU and product joined.
///
/// Items belonging to another user or pointing at a soft-deleted SKU simply do not come back; the caller
/// compares the result count against the requested count to detect concurrent deletion.
pub async fn fetch_lines(
    buyer_id: i64,
    cart_item_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<CartLine>, CheckoutGatewayError> {
    if cart_item_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            ci.id as cart_item_id,
            ci.user_id as user_id,
            ci.quantity as quantity,
            s.id as sku_id,
            s.version as sku_version,
            s.stock as sku_stock,
            s.price as unit_price,
            s.variant as variant,
            p.id as product_id,
            s.seller_id as seller_id,
            p.name as product_name,
            p.image as product_image,
            p.published_at as published_at,
            p.deleted_at as product_deleted_at
        FROM cart_items ci
        JOIN skus s ON ci.sku_id = s.id AND s.deleted_at IS NULL
        JOIN products p ON s.product_id = p.id
        WHERE ci.user_id = "#,
    );
    builder.push_bind(buyer_id);
    builder.push(" AND ci.id IN (");
    let mut ids = builder.separated(", ");
    for id in cart_item_ids {
        ids.push_bind(*id);
    }
    builder.push(") ORDER BY ci.id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let lines = builder.build_query_as::<CartLine>().fetch_all(conn).await?;
    Ok(lines)
}

/// Deletes the consumed cart items. Returns the number of rows removed.
pub async fn delete_items(cart_item_ids: &[i64], conn: &mut SqliteConnection) -> Result<u64, CheckoutGatewayError> {
    if cart_item_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::new("DELETE FROM cart_items WHERE id IN (");
    let mut ids = builder.separated(", ");
    for id in cart_item_ids {
        ids.push_bind(*id);
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

#[derive(FromRow)]
struct TranslationRow {
    product_id: i64,
    lang: String,
    name: String,
    description: Option<String>,
}

/// Fetches the full translation sets for the given products, keyed by product id. The checkout snapshots these
/// verbatim into order items.
pub async fn fetch_translations(
    product_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<HashMap<i64, Vec<TranslationSnapshot>>, CheckoutGatewayError> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut builder = QueryBuilder::new(
        "SELECT product_id, lang, name, description FROM product_translations WHERE product_id IN (",
    );
    let mut ids = builder.separated(", ");
    for id in product_ids {
        ids.push_bind(*id);
    }
    builder.push(") ORDER BY product_id, lang ASC");
    let rows = builder.build_query_as::<TranslationRow>().fetch_all(conn).await?;
    let mut result: HashMap<i64, Vec<TranslationSnapshot>> = HashMap::new();
    for row in rows {
        result.entry(row.product_id).or_default().push(TranslationSnapshot {
            lang: row.lang,
            name: row.name,
            description: row.description,
        });
    }
    Ok(result)
}
