//! The combined server-side search path: one `search_listings(...)` call
//! that returns pre-filtered, distance-annotated rows.

use sqlx::PgPool;
use uuid::Uuid;

use farmgate_core::{Coordinates, Listing, ListingKind, SearchQuery, SearchResult};

use crate::DbError;

/// A flattened row from the `search_listings` SQL function: one listing
/// tagged with its `record_type` discriminator and, when an origin was
/// supplied, its pre-computed `distance_meters`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchRpcRow {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub record_type: String,
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
    pub distance_meters: Option<f64>,
}

impl SearchRpcRow {
    /// Accepts the row verbatim as an already-resolved result.
    ///
    /// The distance annotation is the function's, never recomputed; stall
    /// sites are not carried on the flattened shape (resolution already
    /// happened server-side).
    #[must_use]
    pub fn into_result(self) -> Option<SearchResult> {
        let Some(kind) = ListingKind::from_record_type(&self.record_type) else {
            tracing::warn!(listing_id = %self.id, record_type = %self.record_type, "unknown record_type from search function; row skipped");
            return None;
        };

        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => None,
        };

        Some(SearchResult {
            listing: Listing {
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
                stall_sites: Vec::new(),
                product_tags: self.product_tags,
                feature_tags: self.feature_tags,
            },
            distance_meters: self.distance_meters,
        })
    }
}

/// Run a listing search entirely inside the store via `search_listings`.
///
/// The function applies the same filters the client-side pipeline would,
/// plus the radius cutoff and ranking; rows come back in final order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the call fails.
pub async fn search_listings_rpc(
    pool: &PgPool,
    query: &SearchQuery,
) -> Result<Vec<SearchResult>, DbError> {
    let kinds: Vec<String> = query.kinds.iter().map(|k| k.as_str().to_string()).collect();
    let product_tags: Vec<String> = query.product_tags.iter().cloned().collect();
    let feature_tags: Vec<String> = query.feature_tags.iter().cloned().collect();

    let rows: Vec<SearchRpcRow> = sqlx::query_as(
        "SELECT id, owner_id, record_type, name, contact_name, email, phone, \
                address, bio, logo_url, latitude, longitude, product_tags, \
                feature_tags, distance_meters \
         FROM search_listings($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(query.origin.map(Coordinates::lat))
    .bind(query.origin.map(Coordinates::lon))
    .bind(query.radius_meters)
    .bind(&kinds)
    .bind(&product_tags)
    .bind(&feature_tags)
    .bind(query.term.as_deref())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(SearchRpcRow::into_result).collect())
}
