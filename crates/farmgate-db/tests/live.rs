//! Live integration tests for farmgate-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/farmgate-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use rust_decimal::Decimal;
use uuid::Uuid;

use farmgate_core::{
    Coordinates, ListingConfig, ListingKind, SearchFilters, SiteConfig,
};
use farmgate_db::{
    fetch_candidates, fetch_product_candidates, get_listing, insert_application,
    list_unlocated_listings, search_listings_rpc, seed_listings, update_inventory,
    update_listing_location, DbError, InventoryPatch, NewApplication,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a minimal listing row and return its generated `id`.
async fn insert_test_listing(
    pool: &sqlx::PgPool,
    name: &str,
    kind: &str,
    coords: Option<(f64, f64)>,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO listings (kind, name, latitude, longitude, product_tags, feature_tags) \
         VALUES ($1, $2, $3, $4, '{}', '{}') RETURNING id",
    )
    .bind(kind)
    .bind(name)
    .bind(coords.map(|c| c.0))
    .bind(coords.map(|c| c.1))
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_listing failed for '{name}': {e}"))
}

async fn set_tags(pool: &sqlx::PgPool, id: Uuid, product_tags: &[&str], feature_tags: &[&str]) {
    let product_tags: Vec<String> = product_tags.iter().map(|t| (*t).to_string()).collect();
    let feature_tags: Vec<String> = feature_tags.iter().map(|t| (*t).to_string()).collect();
    sqlx::query("UPDATE listings SET product_tags = $2, feature_tags = $3 WHERE id = $1")
        .bind(id)
        .bind(&product_tags)
        .bind(&feature_tags)
        .execute(pool)
        .await
        .expect("set_tags");
}

async fn insert_site(pool: &sqlx::PgPool, listing_id: Uuid, lat: f64, lon: f64, position: i32) {
    sqlx::query(
        "INSERT INTO stall_sites (listing_id, latitude, longitude, position) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(listing_id)
    .bind(lat)
    .bind(lon)
    .bind(position)
    .execute(pool)
    .await
    .expect("insert_site");
}

async fn insert_product(pool: &sqlx::PgPool, listing_id: Uuid, name: &str, tags: &[&str]) -> Uuid {
    let tags: Vec<String> = tags.iter().map(|t| (*t).to_string()).collect();
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO products (listing_id, name, price, inventory_count, tags) \
         VALUES ($1, $2, 6.50, 10, $3) RETURNING id",
    )
    .bind(listing_id)
    .bind(name)
    .bind(&tags)
    .fetch_one(pool)
    .await
    .expect("insert_product")
}

fn nyc_query(radius_miles: Option<f64>) -> farmgate_core::SearchQuery {
    SearchFilters {
        radius_miles,
        ..SearchFilters::default()
    }
    .normalize(Some(40.7128), Some(-74.0060))
    .expect("normalize")
}

// ---------------------------------------------------------------------------
// Candidate fetcher
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_candidates_applies_kind_and_tag_filters(pool: sqlx::PgPool) {
    let farm = insert_test_listing(&pool, "Hazel Hollow", "farm", Some((40.73, -74.0))).await;
    set_tags(&pool, farm, &["eggs", "honey"], &[]).await;
    let stall = insert_test_listing(&pool, "Union Square Stall", "stall", None).await;
    set_tags(&pool, stall, &["bread"], &[]).await;

    let filters = SearchFilters {
        variants: vec!["Family Farms".to_string()],
        products: vec!["eggs".to_string(), "milk".to_string()],
        ..SearchFilters::default()
    };
    let query = filters.normalize(None, None).expect("normalize");

    let candidates = fetch_candidates(&pool, &query).await.expect("fetch");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "Hazel Hollow");
    assert_eq!(candidates[0].kind, ListingKind::Farm);
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_candidates_matches_term_case_insensitively(pool: sqlx::PgPool) {
    insert_test_listing(&pool, "Hazel Hollow", "farm", None).await;
    insert_test_listing(&pool, "Cedar Creek", "farm", None).await;

    let filters = SearchFilters {
        query: Some("hazel".to_string()),
        ..SearchFilters::default()
    };
    let query = filters.normalize(None, None).expect("normalize");

    let candidates = fetch_candidates(&pool, &query).await.expect("fetch");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "Hazel Hollow");
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_candidates_does_not_enforce_radius(pool: sqlx::PgPool) {
    // LA is far outside any NYC radius; the fetcher must still return it.
    insert_test_listing(&pool, "LA Farm", "farm", Some((34.0522, -118.2437))).await;

    let candidates = fetch_candidates(&pool, &nyc_query(Some(5.0)))
        .await
        .expect("fetch");
    assert_eq!(candidates.len(), 1, "distance is the ranker's job");
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_candidates_returns_stall_sites_in_position_order(pool: sqlx::PgPool) {
    let stall = insert_test_listing(&pool, "Two Site Stall", "stall", None).await;
    insert_site(&pool, stall, 41.0, -75.0, 1).await;
    insert_site(&pool, stall, 40.0, -74.0, 0).await;

    let candidates = fetch_candidates(&pool, &farmgate_core::SearchQuery::unconstrained())
        .await
        .expect("fetch");
    assert_eq!(candidates.len(), 1);
    let sites = &candidates[0].stall_sites;
    assert_eq!(sites.len(), 2);
    let first = sites[0].location.expect("location");
    assert_eq!(first.lat(), 40.0, "position 0 must come first");
}

// ---------------------------------------------------------------------------
// Combined search function
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn search_rpc_filters_and_ranks_by_distance(pool: sqlx::PgPool) {
    insert_test_listing(&pool, "Near Farm", "farm", Some((40.7300, -74.0000))).await;
    insert_test_listing(&pool, "LA Farm", "farm", Some((34.0522, -118.2437))).await;

    let results = search_listings_rpc(&pool, &nyc_query(Some(30.0)))
        .await
        .expect("rpc");

    assert_eq!(results.len(), 1, "LA must fall outside 30 miles");
    assert_eq!(results[0].listing.name, "Near Farm");
    let distance = results[0].distance_meters.expect("distance");
    // ~1.2 miles; sanity-check the SQL Haversine against the core one.
    let origin = Coordinates::new(40.7128, -74.0060).expect("origin");
    let farm = Coordinates::new(40.7300, -74.0000).expect("farm");
    let expected = origin.distance_meters(farm);
    assert!(
        (distance - expected).abs() < 1.0,
        "SQL distance {distance} differs from core distance {expected}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_rpc_resolves_stalls_from_their_first_site(pool: sqlx::PgPool) {
    let stall = insert_test_listing(&pool, "Two Site Stall", "stall", None).await;
    // First site far, second nearly at the origin: the far one must win.
    insert_site(&pool, stall, 42.0, -75.0, 0).await;
    insert_site(&pool, stall, 40.7130, -74.0060, 1).await;

    let results = search_listings_rpc(&pool, &nyc_query(None)).await.expect("rpc");
    assert_eq!(results.len(), 1);
    let distance = results[0].distance_meters.expect("distance");
    assert!(
        distance > 100_000.0,
        "stall must measure from its first site, got {distance} m"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_rpc_excludes_unresolvable_only_under_bounded_radius(pool: sqlx::PgPool) {
    insert_test_listing(&pool, "Ghost Stall", "stall", None).await;

    let bounded = search_listings_rpc(&pool, &nyc_query(Some(10.0)))
        .await
        .expect("rpc");
    assert!(bounded.is_empty());

    let unbounded = search_listings_rpc(&pool, &nyc_query(None)).await.expect("rpc");
    assert_eq!(unbounded.len(), 1);
    assert!(unbounded[0].distance_meters.is_none());
}

// ---------------------------------------------------------------------------
// Products and inventory
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn product_candidates_pair_listings_with_their_products(pool: sqlx::PgPool) {
    let farm = insert_test_listing(&pool, "Hazel Hollow", "farm", Some((40.73, -74.0))).await;
    insert_product(&pool, farm, "dozen eggs", &["eggs"]).await;
    insert_product(&pool, farm, "honey jar", &["honey"]).await;

    let candidates =
        fetch_product_candidates(&pool, &farmgate_core::SearchQuery::unconstrained())
            .await
            .expect("fetch");

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].products.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_inventory_patches_count_and_keeps_price(pool: sqlx::PgPool) {
    let farm = insert_test_listing(&pool, "Hazel Hollow", "farm", None).await;
    let product = insert_product(&pool, farm, "dozen eggs", &["eggs"]).await;

    let updated = update_inventory(
        &pool,
        product,
        InventoryPatch {
            inventory_count: Some(3),
            price: None,
        },
    )
    .await
    .expect("update");

    assert_eq!(updated.inventory_count, 3);
    assert_eq!(updated.price, Decimal::new(650, 2), "price untouched");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_inventory_unknown_product_is_not_found(pool: sqlx::PgPool) {
    let err = update_inventory(&pool, Uuid::new_v4(), InventoryPatch::default())
        .await
        .expect_err("should fail");
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_application_stores_pending_with_optional_coordinates(pool: sqlx::PgPool) {
    let row = insert_application(
        &pool,
        &NewApplication {
            name: "Cedar Creek".to_string(),
            kind: ListingKind::Farm,
            contact_name: "J. Price".to_string(),
            email: "j@cedarcreek.example".to_string(),
            phone: None,
            address: "4 Creek Rd".to_string(),
            bio: None,
            location: Coordinates::new(40.8, -74.1),
        },
    )
    .await
    .expect("insert");

    assert_eq!(row.status, "pending");
    assert_eq!(row.latitude, Some(40.8));

    let unlocated = insert_application(
        &pool,
        &NewApplication {
            name: "Foggy Bottom".to_string(),
            kind: ListingKind::StallOnly,
            contact_name: "M. Li".to_string(),
            email: "m@foggy.example".to_string(),
            phone: None,
            address: "unresolvable address".to_string(),
            bio: None,
            location: None,
        },
    )
    .await
    .expect("insert");
    assert!(unlocated.latitude.is_none());
}

// ---------------------------------------------------------------------------
// Seeding and backfill
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seed_listings_is_idempotent_and_replaces_sites(pool: sqlx::PgPool) {
    let config = ListingConfig {
        name: "Union Square Stall".to_string(),
        kind: ListingKind::Stall,
        contact_name: None,
        email: None,
        phone: None,
        address: None,
        bio: None,
        logo_url: None,
        lat: None,
        lon: None,
        sites: vec![
            SiteConfig {
                name: Some("Saturday".to_string()),
                lat: 40.7359,
                lon: -73.9911,
            },
            SiteConfig {
                name: Some("Wednesday".to_string()),
                lat: 40.7410,
                lon: -73.9897,
            },
        ],
        product_tags: vec!["bread".to_string()],
        feature_tags: vec![],
        products: vec![],
    };

    let count = seed_listings(&pool, std::slice::from_ref(&config))
        .await
        .expect("seed");
    assert_eq!(count, 1);
    let count = seed_listings(&pool, std::slice::from_ref(&config))
        .await
        .expect("re-seed");
    assert_eq!(count, 1);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(total, 1, "re-seeding must not duplicate listings");

    let sites: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stall_sites")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(sites, 2, "sites are replaced, not appended");
}

#[sqlx::test(migrations = "../../migrations")]
async fn backfill_queue_and_location_update(pool: sqlx::PgPool) {
    let id = insert_test_listing(&pool, "Address Only Farm", "farm", None).await;
    sqlx::query("UPDATE listings SET address = '12 Orchard Ln' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .expect("set address");

    let queue = list_unlocated_listings(&pool, 10).await.expect("queue");
    assert_eq!(queue.len(), 1);

    let coords = Coordinates::new(40.73, -74.0).expect("coords");
    update_listing_location(&pool, id, coords).await.expect("update");

    let queue = list_unlocated_listings(&pool, 10).await.expect("queue");
    assert!(queue.is_empty());

    let listing = get_listing(&pool, id).await.expect("get").expect("listing");
    assert!(listing.location.is_some());
}
