//! Traits at the engine's I/O seams.

use async_trait::async_trait;
use farmgate_core::{Coordinates, Listing, ProductCandidate, SearchQuery, SearchResult};

use crate::error::FetchError;

/// What a fetch produced.
///
/// A store that cannot evaluate distance returns `Candidates`: an unordered
/// superset (distance false-positives allowed) that still needs the
/// resolver/ranker. A store with a native combined geo+attribute query
/// returns `Resolved`: rows already distance-filtered and annotated, which
/// the engine accepts verbatim without re-running Haversine.
#[derive(Debug)]
pub enum Fetched {
    Candidates(Vec<Listing>),
    Resolved(Vec<SearchResult>),
}

/// Candidate retrieval from the external data store.
///
/// Implementations must apply every filter the store can evaluate natively:
/// kind-set membership, product/feature tag overlap, and case-insensitive
/// substring match of the term against the display name. Radius enforcement
/// is optional ([`Fetched::Candidates`] may include out-of-range rows).
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches listing candidates for `query`.
    async fn fetch(&self, query: &SearchQuery) -> Result<Fetched, FetchError>;

    /// Fetches listing candidates with their product rows, for
    /// product-scoped search. Product tag filtering happens in the ranker,
    /// so implementations may return all products per listing.
    async fn fetch_products(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<ProductCandidate>, FetchError>;
}

/// Forward geocoding: free-text address → coordinates.
///
/// `Ok(None)` means the address did not resolve — a per-listing, non-fatal
/// outcome. Errors are also treated as non-fatal by the engine.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(
        &self,
        address: &str,
    ) -> Result<Option<Coordinates>, Box<dyn std::error::Error + Send + Sync + 'static>>;
}

/// A geocoder that never resolves anything. Useful where the search pass
/// should not issue network calls at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn geocode(
        &self,
        _address: &str,
    ) -> Result<Option<Coordinates>, Box<dyn std::error::Error + Send + Sync + 'static>> {
        Ok(None)
    }
}
