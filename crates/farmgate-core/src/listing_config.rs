//! Seed/demo listing definitions loaded from `config/listings.yaml`.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::listing::ListingKind;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    pub price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub inventory_count: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub name: String,
    pub kind: ListingKind,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub logo_url: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub product_tags: Vec<String>,
    #[serde(default)]
    pub feature_tags: Vec<String>,
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

impl ListingConfig {
    /// The configured direct coordinates, if both components are present
    /// and in range.
    #[must_use]
    pub fn location(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListingsFile {
    pub listings: Vec<ListingConfig>,
}

/// Load and validate the listings configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_listings(path: &Path) -> Result<ListingsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ListingsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let listings_file: ListingsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::ListingsFileParse)?;

    validate_listings(&listings_file)?;

    Ok(listings_file)
}

fn validate_listings(listings_file: &ListingsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for listing in &listings_file.listings {
        if listing.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "listing name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(listing.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate listing name: '{}'",
                listing.name
            )));
        }

        // One-sided coordinates are never valid, even in seed data.
        if listing.lat.is_some() != listing.lon.is_some() {
            return Err(ConfigError::Validation(format!(
                "listing '{}' has a partial coordinate pair; supply both lat and lon or neither",
                listing.name
            )));
        }

        if listing.lat.is_some() && listing.location().is_none() {
            return Err(ConfigError::Validation(format!(
                "listing '{}' has out-of-range coordinates",
                listing.name
            )));
        }

        for site in &listing.sites {
            if Coordinates::new(site.lat, site.lon).is_none() {
                return Err(ConfigError::Validation(format!(
                    "listing '{}' has a stall site with out-of-range coordinates",
                    listing.name
                )));
            }
        }

        if !listing.sites.is_empty() && listing.kind != ListingKind::Stall {
            return Err(ConfigError::Validation(format!(
                "listing '{}' is a {} and cannot carry stall sites",
                listing.name, listing.kind
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(name: &str, kind: ListingKind) -> ListingConfig {
        ListingConfig {
            name: name.to_string(),
            kind,
            contact_name: None,
            email: None,
            phone: None,
            address: None,
            bio: None,
            logo_url: None,
            lat: None,
            lon: None,
            sites: vec![],
            product_tags: vec![],
            feature_tags: vec![],
            products: vec![],
        }
    }

    #[test]
    fn validate_rejects_empty_name() {
        let file = ListingsFile {
            listings: vec![base("  ", ListingKind::Farm)],
        };
        let err = validate_listings(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_name() {
        let file = ListingsFile {
            listings: vec![
                base("Hazel Hollow", ListingKind::Farm),
                base("hazel hollow", ListingKind::Stall),
            ],
        };
        let err = validate_listings(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate listing name"));
    }

    #[test]
    fn validate_rejects_partial_coordinates() {
        let mut listing = base("Half Pin Farm", ListingKind::Farm);
        listing.lat = Some(40.0);
        let file = ListingsFile {
            listings: vec![listing],
        };
        let err = validate_listings(&file).unwrap_err();
        assert!(err.to_string().contains("partial coordinate pair"));
    }

    #[test]
    fn validate_rejects_sites_on_a_farm() {
        let mut listing = base("Wandering Farm", ListingKind::Farm);
        listing.sites = vec![SiteConfig {
            name: None,
            lat: 40.0,
            lon: -74.0,
        }];
        let file = ListingsFile {
            listings: vec![listing],
        };
        let err = validate_listings(&file).unwrap_err();
        assert!(err.to_string().contains("cannot carry stall sites"));
    }

    #[test]
    fn validate_accepts_valid_listings() {
        let mut farm = base("Hazel Hollow", ListingKind::Farm);
        farm.lat = Some(40.73);
        farm.lon = Some(-74.0);

        let mut stall = base("Union Square Stall", ListingKind::Stall);
        stall.sites = vec![SiteConfig {
            name: Some("Saturday market".to_string()),
            lat: 40.7359,
            lon: -73.9911,
        }];

        let file = ListingsFile {
            listings: vec![farm, stall],
        };
        assert!(validate_listings(&file).is_ok());
    }

    #[test]
    fn load_listings_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("listings.yaml");
        assert!(
            path.exists(),
            "listings.yaml missing at {path:?} — required for this test"
        );
        let result = load_listings(&path);
        assert!(result.is_ok(), "failed to load listings.yaml: {result:?}");
        let listings_file = result.unwrap();
        assert!(!listings_file.listings.is_empty());
    }
}
