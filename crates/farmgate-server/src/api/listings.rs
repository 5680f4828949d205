//! Storefront browse and detail routes.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use farmgate_core::{Listing, ProductHit};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    limit: Option<i64>,
}

/// Listing detail: the listing with its stall sites plus its active
/// products.
#[derive(Debug, Serialize)]
pub(super) struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub products: Vec<ProductHit>,
}

pub(super) async fn list_listings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Listing>>>, ApiError> {
    let limit = normalize_limit(params.limit);
    let listings = farmgate_db::list_listings(&state.pool, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: listings,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_listing(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ListingDetail>>, ApiError> {
    let listing = farmgate_db::get_listing(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "no such listing"))?;

    let products = farmgate_db::list_products_for_listing(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(farmgate_db::ProductRow::into_hit)
        .collect();

    Ok(Json(ApiResponse {
        data: ListingDetail { listing, products },
        meta: ResponseMeta::new(req_id.0),
    }))
}
