//! Search routes: thin adapters over the engine. All search failures are
//! values inside the outcome, so these handlers always answer 200.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use farmgate_core::SearchFilters;
use farmgate_search::{ProductSearchOutcome, SearchOutcome};

use super::{ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

/// Raw query string of the search endpoints. List-valued filters arrive
/// comma-separated (`?variants=Family%20Farms,Farm%20Stalls`).
#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    lat: Option<f64>,
    lon: Option<f64>,
    radius_miles: Option<f64>,
    variants: Option<String>,
    products: Option<String>,
    features: Option<String>,
    q: Option<String>,
}

impl SearchParams {
    fn into_filters(self) -> (Option<f64>, Option<f64>, SearchFilters) {
        let filters = SearchFilters {
            radius_miles: self.radius_miles,
            variants: split_csv(self.variants.as_deref()),
            products: split_csv(self.products.as_deref()),
            features: split_csv(self.features.as_deref()),
            query: self.q,
        };
        (self.lat, self.lon, filters)
    }
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

pub(super) async fn search_listings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Json<ApiResponse<SearchOutcome>> {
    let (lat, lon, filters) = params.into_filters();
    let outcome = state.engine.search(lat, lon, &filters).await;

    Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn search_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Json<ApiResponse<ProductSearchOutcome>> {
    let (lat, lon, filters) = params.into_filters();
    let outcome = state.engine.search_products(lat, lon, &filters).await;

    Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_drops_empties() {
        assert_eq!(
            split_csv(Some("Family Farms, Farm Stalls ,,")),
            vec!["Family Farms".to_string(), "Farm Stalls".to_string()]
        );
        assert!(split_csv(None).is_empty());
        assert!(split_csv(Some("  ")).is_empty());
    }
}
