mod geocode;
mod search;
mod seed;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "farmgate-cli")]
#[command(about = "Farmgate marketplace command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load config/listings.yaml into the store (idempotent upsert).
    Seed,
    /// Backfill coordinates for listings with an address but no location.
    Geocode {
        /// Maximum number of listings to process in this run.
        #[arg(long, default_value_t = 100)]
        limit: i64,
        /// Concurrent geocode lookups (defaults to the configured fan-out).
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Run a proximity search from the terminal.
    Search {
        #[arg(long)]
        lat: Option<f64>,
        #[arg(long)]
        lon: Option<f64>,
        #[arg(long)]
        radius_miles: Option<f64>,
        /// Listing type filters, comma-separated (labels or identifiers).
        #[arg(long, value_delimiter = ',')]
        variants: Vec<String>,
        /// Required product tags, comma-separated.
        #[arg(long, value_delimiter = ',')]
        products: Vec<String>,
        /// Required feature tags, comma-separated.
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,
        /// Free-text name filter.
        #[arg(long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = farmgate_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Seed => seed::run(&config).await,
        Commands::Geocode { limit, concurrency } => {
            geocode::run(&config, limit, concurrency).await
        }
        Commands::Search {
            lat,
            lon,
            radius_miles,
            variants,
            products,
            features,
            query,
        } => {
            let filters = farmgate_core::SearchFilters {
                radius_miles,
                variants,
                products,
                features,
                query,
            };
            search::run(&config, lat, lon, &filters).await
        }
    }
}

async fn connect(config: &farmgate_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = farmgate_db::PoolConfig::from_app_config(config);
    let pool = farmgate_db::connect_pool(&config.database_url, pool_config).await?;
    farmgate_db::run_migrations(&pool).await?;
    Ok(pool)
}
