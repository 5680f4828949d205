//! Domain core for the farmgate marketplace: listing types, filter
//! normalization, geo math, and the distance resolver/ranker. Every search
//! surface (HTTP API, SQL search function, CLI) is a thin adapter over this
//! crate.

use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod geo;
pub mod listing;
pub mod listing_config;
pub mod query;
pub mod rank;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{
    haversine_meters, miles_to_meters, Coordinates, EARTH_RADIUS_METERS, METERS_PER_MILE,
};
pub use listing::{Listing, ListingKind, ProductHit, StallSite};
pub use listing_config::{
    load_listings, ListingConfig, ListingsFile, ProductConfig, SiteConfig,
};
pub use query::{tags_overlap, SearchFilters, SearchQuery, ValidationError};
pub use rank::{
    rank_listings, rank_product_groups, ListingProducts, ProductCandidate, SearchResult,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read listings file {path}: {source}")]
    ListingsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse listings file: {0}")]
    ListingsFileParse(#[from] serde_yaml::Error),
    #[error("listings config validation failed: {0}")]
    Validation(String),
}
