//! `farmgate-cli search`: run a proximity search and print the ranking.

use farmgate_core::{AppConfig, SearchFilters, METERS_PER_MILE};
use farmgate_db::PgListingSource;
use farmgate_geocode::GeocodeClient;
use farmgate_search::SearchEngine;

pub(crate) async fn run(
    config: &AppConfig,
    lat: Option<f64>,
    lon: Option<f64>,
    filters: &SearchFilters,
) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let engine = SearchEngine::new(
        PgListingSource::client_side(pool),
        GeocodeClient::from_app_config(config)?,
    );

    let outcome = engine.search(lat, lon, filters).await;
    if let Some(message) = outcome.error {
        anyhow::bail!("search failed: {message}");
    }

    if outcome.results.is_empty() {
        println!("no listings matched");
        return Ok(());
    }

    for (rank, result) in outcome.results.iter().enumerate() {
        let distance = result.distance_meters.map_or_else(
            || "     —    ".to_string(),
            |meters| format!("{:>7.1} mi", meters / METERS_PER_MILE),
        );
        println!(
            "{:>3}. {} [{}] {}",
            rank + 1,
            distance,
            result.listing.kind,
            result.listing.name
        );
    }
    Ok(())
}
