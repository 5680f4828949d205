mod applications;
mod listings;
mod products;
mod search;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use farmgate_db::PgListingSource;
use farmgate_geocode::GeocodeClient;
use farmgate_search::SearchEngine;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};
use crate::notify::NotifyState;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: Arc<SearchEngine<PgListingSource, GeocodeClient>>,
    pub geocoder: Arc<GeocodeClient>,
    pub notify: Option<NotifyState>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &farmgate_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Farmer-facing write routes sit behind bearer auth and the rate limiter;
/// the public storefront surface (health, search, browse, onboarding
/// intake) stays open.
fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/products/{id}/inventory",
            patch(products::update_inventory),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/search", get(search::search_listings))
        .route("/api/v1/search/products", get(search::search_products))
        .route("/api/v1/listings", get(listings::list_listings))
        .route("/api/v1/listings/{id}", get(listings::get_listing))
        .route(
            "/api/v1/listings/{id}/products",
            get(products::list_listing_products),
        )
        .route(
            "/api/v1/applications",
            post(applications::submit_application),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match farmgate_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    /// Builds an app whose geocoder points at an unroutable address with
    /// retries disabled: geocode attempts fail fast and the handlers take
    /// their degraded paths.
    fn test_app(pool: sqlx::PgPool) -> Router {
        let geocoder = Arc::new(
            GeocodeClient::with_base_url(1, "farmgate-test/0.1", "http://127.0.0.1:9")
                .expect("client")
                .with_retry_policy(0, 0),
        );
        let engine = Arc::new(SearchEngine::new(
            PgListingSource::client_side(pool.clone()),
            GeocodeClient::with_base_url(1, "farmgate-test/0.1", "http://127.0.0.1:9")
                .expect("client")
                .with_retry_policy(0, 0),
        ));
        let state = AppState {
            pool,
            engine,
            geocoder,
            notify: None,
        };
        // No keys: auth disabled, as in local development.
        let auth = AuthState::from_keys(std::iter::empty::<&str>(), "test-salt");
        build_app(state, auth, default_rate_limit_state())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    async fn seed_farm(pool: &sqlx::PgPool, name: &str, lat: f64, lon: f64) -> uuid::Uuid {
        sqlx::query_scalar::<_, uuid::Uuid>(
            "INSERT INTO listings (kind, name, latitude, longitude, product_tags) \
             VALUES ('farm', $1, $2, $3, '{eggs}') RETURNING id",
        )
        .bind(name)
        .bind(lat)
        .bind(lon)
        .fetch_one(pool)
        .await
        .expect("seed farm")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "no such product").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok_with_request_id(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-health-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").map(|v| v.to_str().unwrap()),
            Some("req-health-1")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert_eq!(json["meta"]["request_id"].as_str(), Some("req-health-1"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn search_filters_by_radius_and_ranks(pool: sqlx::PgPool) {
        seed_farm(&pool, "Near Farm", 40.7300, -74.0000).await;
        seed_farm(&pool, "LA Farm", 34.0522, -118.2437).await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/search?lat=40.7128&lon=-74.0060&radius_miles=30",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["error"].is_null());
        let results = json["data"]["results"].as_array().expect("results");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["name"].as_str(), Some("Near Farm"));
        assert!(results[0]["distance_meters"].as_f64().expect("distance") > 0.0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn search_reports_partial_origin_as_value(pool: sqlx::PgPool) {
        let (status, json) = get_json(test_app(pool), "/api/v1/search?lat=40.7128").await;

        // Errors-as-values: still a 200, message in the outcome.
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["results"].as_array().expect("results").is_empty());
        assert!(json["data"]["error"].as_str().expect("error").contains("together"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn search_accepts_comma_separated_variant_aliases(pool: sqlx::PgPool) {
        seed_farm(&pool, "Hazel Hollow", 40.7300, -74.0000).await;
        sqlx::query(
            "INSERT INTO listings (kind, name) VALUES ('stall-only', 'Indie Stand')",
        )
        .execute(&pool)
        .await
        .expect("seed stall");

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/search?variants=Family%20Farms,Unknown%20Label",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = json["data"]["results"].as_array().expect("results");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["kind"].as_str(), Some("farm"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn product_search_groups_by_listing(pool: sqlx::PgPool) {
        let farm = seed_farm(&pool, "Hazel Hollow", 40.7300, -74.0000).await;
        sqlx::query(
            "INSERT INTO products (listing_id, name, price, tags) \
             VALUES ($1, 'dozen eggs', 6.50, '{eggs}'), ($1, 'honey jar', 9.00, '{honey}')",
        )
        .bind(farm)
        .execute(&pool)
        .await
        .expect("seed products");

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/search/products?lat=40.7128&lon=-74.0060&products=eggs",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = json["data"]["results"].as_array().expect("results");
        assert_eq!(results.len(), 1);
        let products = results[0]["products"].as_array().expect("products");
        assert_eq!(products.len(), 1, "only tag-matching products survive");
        assert_eq!(products[0]["name"].as_str(), Some("dozen eggs"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn listing_detail_includes_sites_and_products(pool: sqlx::PgPool) {
        let farm = seed_farm(&pool, "Hazel Hollow", 40.7300, -74.0000).await;
        sqlx::query(
            "INSERT INTO products (listing_id, name, price) VALUES ($1, 'dozen eggs', 6.50)",
        )
        .bind(farm)
        .execute(&pool)
        .await
        .expect("seed product");

        let (status, json) =
            get_json(test_app(pool), &format!("/api/v1/listings/{farm}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"].as_str(), Some("Hazel Hollow"));
        assert_eq!(
            json["data"]["products"].as_array().map(Vec::len),
            Some(1)
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn listing_detail_404_for_unknown_id(pool: sqlx::PgPool) {
        let (status, _) = get_json(
            test_app(pool),
            &format!("/api/v1/listings/{}", uuid::Uuid::new_v4()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn submit_application_persists_without_coordinates_when_geocode_fails(
        pool: sqlx::PgPool,
    ) {
        let app = test_app(pool.clone());
        let body = serde_json::json!({
            "name": "Cedar Creek",
            "kind": "farm",
            "contact_name": "J. Price",
            "email": "j@cedarcreek.example",
            "address": "4 Creek Rd"
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/applications")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["data"]["status"].as_str(), Some("pending"));
        assert!(json["data"]["canonical_address"].is_null());

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(stored, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn submit_application_rejects_blank_name(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let body = serde_json::json!({
            "name": "  ",
            "kind": "farm",
            "contact_name": "J. Price",
            "email": "j@cedarcreek.example",
            "address": "4 Creek Rd"
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/applications")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn inventory_patch_requires_bearer_auth(pool: sqlx::PgPool) {
        // Force auth on even though the test env has no keys configured.
        let geocoder = Arc::new(
            GeocodeClient::with_base_url(1, "farmgate-test/0.1", "http://127.0.0.1:9")
                .expect("client"),
        );
        let engine = Arc::new(SearchEngine::new(
            PgListingSource::client_side(pool.clone()),
            GeocodeClient::with_base_url(1, "farmgate-test/0.1", "http://127.0.0.1:9")
                .expect("client"),
        ));
        let auth = AuthState::from_keys(["secret-key"], "test-salt");
        let app = build_app(
            AppState {
                pool,
                engine,
                geocoder,
                notify: None,
            },
            auth,
            default_rate_limit_state(),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(&format!(
                        "/api/v1/products/{}/inventory",
                        uuid::Uuid::new_v4()
                    ))
                    .header("content-type", "application/json")
                    .body(Body::from("{\"inventory_count\": 3}"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn inventory_patch_updates_the_product(pool: sqlx::PgPool) {
        let farm = seed_farm(&pool, "Hazel Hollow", 40.7300, -74.0000).await;
        let product: uuid::Uuid = sqlx::query_scalar(
            "INSERT INTO products (listing_id, name, price, inventory_count) \
             VALUES ($1, 'dozen eggs', 6.50, 10) RETURNING id",
        )
        .bind(farm)
        .fetch_one(&pool)
        .await
        .expect("seed product");

        // Dev auth (disabled) so the protected route is reachable.
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(&format!("/api/v1/products/{product}/inventory"))
                    .header("content-type", "application/json")
                    .body(Body::from("{\"inventory_count\": 2}"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["data"]["inventory_count"].as_i64(), Some(2));
    }
}
