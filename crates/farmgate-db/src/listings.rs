//! Database operations for `listings` and `stall_sites`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use farmgate_core::{Coordinates, Listing, ListingKind, SearchQuery, StallSite};

use crate::DbError;

/// A row from the `listings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub kind: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub logo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub product_tags: Vec<String>,
    pub feature_tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `stall_sites` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StallSiteRow {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub position: i32,
}

const LISTING_COLUMNS: &str = "id, owner_id, kind, name, contact_name, email, phone, address, \
     bio, logo_url, latitude, longitude, product_tags, feature_tags, \
     is_active, created_at, updated_at";

impl ListingRow {
    /// Maps the row (plus its ordered stall sites) to the domain type.
    ///
    /// Rows with an unknown kind discriminator are dropped with a warning —
    /// the CHECK constraint makes that unreachable short of a bad manual
    /// edit. A stored lat/lon pair that fails coordinate validation maps to
    /// `None` and the listing becomes coordinate-unresolvable downstream.
    #[must_use]
    pub fn into_listing(self, sites: Vec<StallSiteRow>) -> Option<Listing> {
        let Some(kind) = ListingKind::from_record_type(&self.kind) else {
            tracing::warn!(listing_id = %self.id, kind = %self.kind, "unknown listing kind; row skipped");
            return None;
        };

        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => None,
        };

        let stall_sites = sites
            .into_iter()
            .map(|site| StallSite {
                id: site.id,
                name: site.name,
                location: Coordinates::new(site.latitude, site.longitude),
            })
            .collect();

        Some(Listing {
            id: self.id,
            owner_id: self.owner_id,
            kind,
            name: self.name,
            contact_name: self.contact_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            bio: self.bio,
            logo_url: self.logo_url,
            location,
            stall_sites,
            product_tags: self.product_tags,
            feature_tags: self.feature_tags,
        })
    }
}

/// Fetch the candidate superset for a search query, applying every filter
/// the store can evaluate natively: kind-set membership, tag overlap on
/// both dimensions, and case-insensitive substring match on the name.
///
/// Distance is NOT enforced here; the resolver/ranker owns the radius.
/// Stall sites come back in stable `position` order per listing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn fetch_candidates(pool: &PgPool, query: &SearchQuery) -> Result<Vec<Listing>, DbError> {
    let kinds: Vec<String> = query.kinds.iter().map(|k| k.as_str().to_string()).collect();
    let product_tags: Vec<String> = query.product_tags.iter().cloned().collect();
    let feature_tags: Vec<String> = query.feature_tags.iter().cloned().collect();

    let sql = format!(
        "SELECT {LISTING_COLUMNS} FROM listings \
         WHERE is_active \
           AND (cardinality($1::text[]) = 0 OR kind = ANY($1)) \
           AND (cardinality($2::text[]) = 0 OR product_tags && $2) \
           AND (cardinality($3::text[]) = 0 OR feature_tags && $3) \
           AND ($4::text IS NULL OR name ILIKE '%' || $4 || '%') \
         ORDER BY created_at"
    );

    let rows: Vec<ListingRow> = sqlx::query_as(&sql)
        .bind(&kinds)
        .bind(&product_tags)
        .bind(&feature_tags)
        .bind(query.term.as_deref())
        .fetch_all(pool)
        .await?;

    attach_sites(pool, rows).await
}

/// List active listings for the storefront browse page, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_listings(pool: &PgPool, limit: i64) -> Result<Vec<Listing>, DbError> {
    let sql = format!(
        "SELECT {LISTING_COLUMNS} FROM listings WHERE is_active ORDER BY name LIMIT $1"
    );
    let rows: Vec<ListingRow> = sqlx::query_as(&sql).bind(limit).fetch_all(pool).await?;
    attach_sites(pool, rows).await
}

/// Fetch one listing by id, with its stall sites.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_listing(pool: &PgPool, id: Uuid) -> Result<Option<Listing>, DbError> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1 AND is_active");
    let row: Option<ListingRow> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let sites: Vec<StallSiteRow> = sqlx::query_as(
        "SELECT id, listing_id, name, latitude, longitude, position \
         FROM stall_sites WHERE listing_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(row.into_listing(sites))
}

/// Listings that carry an address but no stored coordinate pair — the
/// geocode backfill work queue.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unlocated_listings(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ListingRow>, DbError> {
    let sql = format!(
        "SELECT {LISTING_COLUMNS} FROM listings \
         WHERE is_active AND address IS NOT NULL \
           AND (latitude IS NULL OR longitude IS NULL) \
         ORDER BY created_at LIMIT $1"
    );
    let rows = sqlx::query_as(&sql).bind(limit).fetch_all(pool).await?;
    Ok(rows)
}

/// Store a resolved coordinate pair for a listing.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no active listing matches, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_listing_location(
    pool: &PgPool,
    id: Uuid,
    location: Coordinates,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE listings SET latitude = $2, longitude = $3, updated_at = NOW() \
         WHERE id = $1 AND is_active",
    )
    .bind(id)
    .bind(location.lat())
    .bind(location.lon())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Bulk-loads stall sites for the given listing rows and assembles domain
/// listings, preserving the rows' order.
async fn attach_sites(pool: &PgPool, rows: Vec<ListingRow>) -> Result<Vec<Listing>, DbError> {
    let stall_ids: Vec<Uuid> = rows
        .iter()
        .filter(|r| r.kind == ListingKind::Stall.as_str())
        .map(|r| r.id)
        .collect();

    let mut sites_by_listing: HashMap<Uuid, Vec<StallSiteRow>> = HashMap::new();
    if !stall_ids.is_empty() {
        let sites: Vec<StallSiteRow> = sqlx::query_as(
            "SELECT id, listing_id, name, latitude, longitude, position \
             FROM stall_sites WHERE listing_id = ANY($1) \
             ORDER BY listing_id, position",
        )
        .bind(&stall_ids)
        .fetch_all(pool)
        .await?;

        for site in sites {
            sites_by_listing.entry(site.listing_id).or_default().push(site);
        }
    }

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let sites = sites_by_listing.remove(&row.id).unwrap_or_default();
            row.into_listing(sites)
        })
        .collect())
}
