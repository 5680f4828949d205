//! Seed the store from `config/listings.yaml`.

use farmgate_core::{Coordinates, ListingConfig};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Upsert listings from config, including stall sites and products.
///
/// Returns the number of listings processed. All upserts run inside a
/// single transaction; if any operation fails the entire batch is rolled
/// back. Sites and products are replaced wholesale per listing so the
/// stored `position` order always mirrors the config file order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_listings(pool: &PgPool, listings: &[ListingConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for listing in listings {
        let location = listing.location();

        let listing_id: Uuid = sqlx::query_scalar(
            "INSERT INTO listings \
                 (kind, name, contact_name, email, phone, address, bio, logo_url, \
                  latitude, longitude, product_tags, feature_tags, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, true) \
             ON CONFLICT (name) DO UPDATE SET \
                 kind = EXCLUDED.kind, \
                 contact_name = EXCLUDED.contact_name, \
                 email = EXCLUDED.email, \
                 phone = EXCLUDED.phone, \
                 address = EXCLUDED.address, \
                 bio = EXCLUDED.bio, \
                 logo_url = EXCLUDED.logo_url, \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 product_tags = EXCLUDED.product_tags, \
                 feature_tags = EXCLUDED.feature_tags, \
                 is_active = true, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(listing.kind.as_str())
        .bind(&listing.name)
        .bind(&listing.contact_name)
        .bind(&listing.email)
        .bind(&listing.phone)
        .bind(&listing.address)
        .bind(&listing.bio)
        .bind(&listing.logo_url)
        .bind(location.map(Coordinates::lat))
        .bind(location.map(Coordinates::lon))
        .bind(&listing.product_tags)
        .bind(&listing.feature_tags)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM stall_sites WHERE listing_id = $1")
            .bind(listing_id)
            .execute(&mut *tx)
            .await?;

        for (position, site) in listing.sites.iter().enumerate() {
            sqlx::query(
                "INSERT INTO stall_sites (listing_id, name, latitude, longitude, position) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(listing_id)
            .bind(&site.name)
            .bind(site.lat)
            .bind(site.lon)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        for product in &listing.products {
            sqlx::query(
                "INSERT INTO products \
                     (listing_id, name, price, currency, inventory_count, tags, is_active) \
                 VALUES ($1, $2, $3, $4, $5, $6, true) \
                 ON CONFLICT (listing_id, name) DO UPDATE SET \
                     price = EXCLUDED.price, \
                     currency = EXCLUDED.currency, \
                     inventory_count = EXCLUDED.inventory_count, \
                     tags = EXCLUDED.tags, \
                     is_active = true, \
                     updated_at = NOW()",
            )
            .bind(listing_id)
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.currency)
            .bind(product.inventory_count)
            .bind(&product.tags)
            .execute(&mut *tx)
            .await?;
        }

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
