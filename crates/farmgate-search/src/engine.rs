//! Pipeline orchestration: normalize the raw filters, fetch candidates,
//! resolve/rank, and report failures as values.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use farmgate_core::{
    rank_listings, rank_product_groups, Coordinates, ListingProducts, ProductCandidate,
    SearchFilters, SearchResult,
};

use crate::source::{Fetched, Geocoder, ListingSource};

const DEFAULT_GEOCODE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_GEOCODE_CONCURRENCY: usize = 4;

/// Listing search outcome. `error` is populated instead of being thrown so
/// the boundary stays uniform for UI consumption: a failed search is an
/// empty result list plus a human-readable message.
#[derive(Debug, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub error: Option<String>,
}

impl SearchOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Product-scoped search outcome: grouped results, same error-as-value rule.
#[derive(Debug, Serialize)]
pub struct ProductSearchOutcome {
    pub results: Vec<ListingProducts>,
    pub error: Option<String>,
}

impl ProductSearchOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// The proximity search engine.
///
/// Stateless between invocations; one logical request per call. The
/// resolve/rank tail is pure computation — the only suspension points are
/// the source fetch and the per-listing geocode lookups of product search.
pub struct SearchEngine<S, G> {
    source: S,
    geocoder: G,
    geocode_timeout: Duration,
    geocode_concurrency: usize,
}

impl<S, G> SearchEngine<S, G>
where
    S: ListingSource,
    G: Geocoder,
{
    pub fn new(source: S, geocoder: G) -> Self {
        Self {
            source,
            geocoder,
            geocode_timeout: Duration::from_secs(DEFAULT_GEOCODE_TIMEOUT_SECS),
            geocode_concurrency: DEFAULT_GEOCODE_CONCURRENCY,
        }
    }

    /// Overrides the per-lookup geocode timeout and fan-out width.
    #[must_use]
    pub fn with_geocode_limits(mut self, timeout: Duration, concurrency: usize) -> Self {
        self.geocode_timeout = timeout;
        self.geocode_concurrency = concurrency.max(1);
        self
    }

    /// Runs a listing search.
    ///
    /// Normalizes the raw filters, fetches candidates through the source,
    /// and ranks them by distance. A source that returns pre-resolved rows
    /// (combined SQL search function) bypasses the ranker entirely; its
    /// distance annotations are accepted verbatim.
    pub async fn search(
        &self,
        origin_lat: Option<f64>,
        origin_lon: Option<f64>,
        filters: &SearchFilters,
    ) -> SearchOutcome {
        let query = match filters.normalize(origin_lat, origin_lon) {
            Ok(query) => query,
            Err(e) => return SearchOutcome::failed(e.to_string()),
        };

        match self.source.fetch(&query).await {
            Ok(Fetched::Resolved(results)) => SearchOutcome {
                results,
                error: None,
            },
            Ok(Fetched::Candidates(candidates)) => SearchOutcome {
                results: rank_listings(candidates, &query),
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, "listing search fetch failed");
                SearchOutcome::failed(e.to_string())
            }
        }
    }

    /// Runs a product-scoped search: grouped results, one group per listing
    /// with at least one matching product.
    ///
    /// Candidates without stored coordinates get one bounded geocode attempt
    /// from their free-text address before ranking. Lookups run
    /// concurrently; a failure or timeout downgrades only that listing to
    /// coordinate-unresolvable and the rest of the pass proceeds.
    pub async fn search_products(
        &self,
        origin_lat: Option<f64>,
        origin_lon: Option<f64>,
        filters: &SearchFilters,
    ) -> ProductSearchOutcome {
        let query = match filters.normalize(origin_lat, origin_lon) {
            Ok(query) => query,
            Err(e) => return ProductSearchOutcome::failed(e.to_string()),
        };

        let mut candidates = match self.source.fetch_products(&query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "product search fetch failed");
                return ProductSearchOutcome::failed(e.to_string());
            }
        };

        if query.origin.is_some() {
            self.backfill_coordinates(&mut candidates).await;
        }

        ProductSearchOutcome {
            results: rank_product_groups(candidates, &query),
            error: None,
        }
    }

    /// Geocodes candidates that have an address but no resolvable
    /// coordinates, joining results back by listing id.
    ///
    /// The result set is assembled only after every outstanding lookup
    /// completes or fails — ranking requires full distance information.
    async fn backfill_coordinates(&self, candidates: &mut [ProductCandidate]) {
        let pending: Vec<(Uuid, String)> = candidates
            .iter()
            .filter(|c| c.listing.resolved_coordinates().is_none())
            .filter_map(|c| {
                c.listing
                    .address
                    .as_ref()
                    .map(|addr| (c.listing.id, addr.clone()))
            })
            .collect();

        if pending.is_empty() {
            return;
        }

        let resolved: HashMap<Uuid, Coordinates> = stream::iter(pending)
            .map(|(id, address)| async move {
                let lookup = self.geocoder.geocode(&address);
                match tokio::time::timeout(self.geocode_timeout, lookup).await {
                    Ok(Ok(coords)) => (id, coords),
                    Ok(Err(e)) => {
                        tracing::warn!(listing_id = %id, error = %e, "geocode failed; listing left unresolvable");
                        (id, None)
                    }
                    Err(_) => {
                        tracing::warn!(listing_id = %id, "geocode timed out; listing left unresolvable");
                        (id, None)
                    }
                }
            })
            .buffer_unordered(self.geocode_concurrency)
            .filter_map(|(id, coords)| async move { coords.map(|c| (id, c)) })
            .collect()
            .await;

        for candidate in candidates.iter_mut() {
            if let Some(coords) = resolved.get(&candidate.listing.id) {
                candidate.listing.location = Some(*coords);
            }
        }
    }
}
