//! Database operations for `products`: storefront listing detail and the
//! farmer-facing inventory management path.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use farmgate_core::{ProductCandidate, ProductHit, SearchQuery};

use crate::{listings, DbError};

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub inventory_count: i32,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    #[must_use]
    pub fn into_hit(self) -> ProductHit {
        ProductHit {
            id: self.id,
            name: self.name,
            price: self.price,
            currency: self.currency,
            inventory_count: self.inventory_count,
            tags: self.tags,
        }
    }
}

/// Fields a `PATCH .../inventory` request may change. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryPatch {
    pub inventory_count: Option<i32>,
    pub price: Option<Decimal>,
}

impl InventoryPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inventory_count.is_none() && self.price.is_none()
    }
}

const PRODUCT_COLUMNS: &str = "id, listing_id, name, price, currency, inventory_count, tags, \
     is_active, created_at, updated_at";

/// Fetch one active product by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Option<ProductRow>, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND is_active");
    let row = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row)
}

/// List a listing's active products, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_for_listing(
    pool: &PgPool,
    listing_id: Uuid,
) -> Result<Vec<ProductRow>, DbError> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE listing_id = $1 AND is_active ORDER BY name"
    );
    let rows = sqlx::query_as(&sql).bind(listing_id).fetch_all(pool).await?;
    Ok(rows)
}

/// Apply an inventory patch (count and/or price) to a product.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no active product matches, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_inventory(
    pool: &PgPool,
    id: Uuid,
    patch: InventoryPatch,
) -> Result<ProductRow, DbError> {
    let sql = format!(
        "UPDATE products \
         SET inventory_count = COALESCE($2, inventory_count), \
             price = COALESCE($3, price), \
             updated_at = NOW() \
         WHERE id = $1 AND is_active \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row: Option<ProductRow> = sqlx::query_as(&sql)
        .bind(id)
        .bind(patch.inventory_count)
        .bind(patch.price)
        .fetch_optional(pool)
        .await?;

    row.ok_or(DbError::NotFound)
}

/// Fetch product-search candidates: every listing passing the store-native
/// filters, paired with all of its active products.
///
/// Product tag filtering (and group dropping) belongs to the ranker, so the
/// product lists here are unfiltered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn fetch_product_candidates(
    pool: &PgPool,
    query: &SearchQuery,
) -> Result<Vec<ProductCandidate>, DbError> {
    let candidates = listings::fetch_candidates(pool, query).await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = candidates.iter().map(|l| l.id).collect();
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE listing_id = ANY($1) AND is_active \
         ORDER BY listing_id, name"
    );
    let rows: Vec<ProductRow> = sqlx::query_as(&sql).bind(&ids).fetch_all(pool).await?;

    let mut products_by_listing: HashMap<Uuid, Vec<ProductHit>> = HashMap::new();
    for row in rows {
        products_by_listing
            .entry(row.listing_id)
            .or_default()
            .push(row.into_hit());
    }

    Ok(candidates
        .into_iter()
        .map(|listing| {
            let products = products_by_listing.remove(&listing.id).unwrap_or_default();
            ProductCandidate { listing, products }
        })
        .collect())
}
