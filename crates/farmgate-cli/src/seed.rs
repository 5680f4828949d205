//! `farmgate-cli seed`: load the listings config file into the store.

use farmgate_core::AppConfig;

pub(crate) async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let file = farmgate_core::load_listings(&config.listings_path)?;
    tracing::info!(
        path = %config.listings_path.display(),
        listings = file.listings.len(),
        "listings config loaded"
    );

    let pool = crate::connect(config).await?;
    let count = farmgate_db::seed_listings(&pool, &file.listings).await?;

    println!(
        "seeded {count} listings from {}",
        config.listings_path.display()
    );
    Ok(())
}
