//! `farmgate-cli geocode`: concurrent coordinate backfill.

use futures::stream::{self, StreamExt};

use farmgate_core::AppConfig;
use farmgate_geocode::GeocodeClient;
use farmgate_search::Geocoder;

pub(crate) async fn run(
    config: &AppConfig,
    limit: i64,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let client = GeocodeClient::from_app_config(config)?;
    let concurrency = concurrency.unwrap_or(config.geocode_max_concurrent).max(1);

    let queue = farmgate_db::list_unlocated_listings(&pool, limit).await?;
    if queue.is_empty() {
        println!("no listings need geocoding");
        return Ok(());
    }
    let queued = queue.len();
    tracing::info!(queued, concurrency, "starting geocode backfill");

    let client = &client;
    let pool = &pool;
    let outcomes: Vec<bool> = stream::iter(queue)
        .map(|row| async move {
            let Some(address) = row.address.as_deref() else {
                return false;
            };
            let coords = match client.geocode(address).await {
                Ok(Some(coords)) => coords,
                Ok(None) => {
                    tracing::warn!(listing = %row.name, "address did not resolve");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(listing = %row.name, error = %e, "geocode failed");
                    return false;
                }
            };
            match farmgate_db::update_listing_location(pool, row.id, coords).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(listing = %row.name, error = %e, "location update failed");
                    false
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let resolved = outcomes.iter().filter(|ok| **ok).count();
    println!("geocoded {resolved}/{queued} listings");
    Ok(())
}
