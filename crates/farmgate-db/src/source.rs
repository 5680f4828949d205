//! [`ListingSource`] implementation backed by the Postgres pool.

use async_trait::async_trait;
use sqlx::PgPool;

use farmgate_core::{ProductCandidate, SearchQuery};
use farmgate_search::{FetchError, Fetched, ListingSource};

use crate::{listings, products, search};

/// The Postgres candidate fetcher.
///
/// Two interchangeable fetch strategies with identical externally
/// observable semantics: the client-side pipeline (fetch a superset, let
/// the engine resolve and rank) and the combined `search_listings` SQL
/// function (rows arrive pre-filtered and distance-annotated).
#[derive(Debug, Clone)]
pub struct PgListingSource {
    pool: PgPool,
    use_rpc: bool,
}

impl PgListingSource {
    /// Client-side strategy: the store applies only attribute filters.
    #[must_use]
    pub fn client_side(pool: PgPool) -> Self {
        Self {
            pool,
            use_rpc: false,
        }
    }

    /// Server-side strategy: delegate radius filtering and ranking to the
    /// `search_listings` function.
    #[must_use]
    pub fn with_rpc(pool: PgPool) -> Self {
        Self {
            pool,
            use_rpc: true,
        }
    }
}

#[async_trait]
impl ListingSource for PgListingSource {
    async fn fetch(&self, query: &SearchQuery) -> Result<Fetched, FetchError> {
        if self.use_rpc {
            let results = search::search_listings_rpc(&self.pool, query)
                .await
                .map_err(FetchError::new)?;
            Ok(Fetched::Resolved(results))
        } else {
            let candidates = listings::fetch_candidates(&self.pool, query)
                .await
                .map_err(FetchError::new)?;
            Ok(Fetched::Candidates(candidates))
        }
    }

    async fn fetch_products(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<ProductCandidate>, FetchError> {
        products::fetch_product_candidates(&self.pool, query)
            .await
            .map_err(FetchError::new)
    }
}
