//! Product routes: listing product lists and the farmer-facing inventory
//! patch.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use farmgate_core::ProductHit;
use farmgate_db::{DbError, InventoryPatch};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

pub(super) async fn list_listing_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ProductHit>>>, ApiError> {
    let products = farmgate_db::list_products_for_listing(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(farmgate_db::ProductRow::into_hit)
        .collect();

    Ok(Json(ApiResponse {
        data: products,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct InventoryBody {
    inventory_count: Option<i32>,
    price: Option<Decimal>,
}

pub(super) async fn update_inventory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<InventoryBody>,
) -> Result<Json<ApiResponse<ProductHit>>, ApiError> {
    let patch = InventoryPatch {
        inventory_count: body.inventory_count,
        price: body.price,
    };
    if patch.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "provide inventory_count and/or price",
        ));
    }
    if patch.inventory_count.is_some_and(|count| count < 0) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "inventory_count must be non-negative",
        ));
    }

    let updated = farmgate_db::update_inventory(&state.pool, id, patch)
        .await
        .map_err(|e| match e {
            DbError::NotFound => ApiError::new(req_id.0.clone(), "not_found", "no such product"),
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: updated.into_hit(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
