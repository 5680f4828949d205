//! Domain types for searchable listings: farms, farm stalls, and
//! independent stalls.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinates;

/// The farm/stall/stall-only discriminator carried by every listing.
///
/// Serialized as the wire strings `"farm"`, `"stall"`, `"stall-only"` —
/// the same values the `record_type` column of the search RPC uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingKind {
    Farm,
    Stall,
    StallOnly,
}

impl ListingKind {
    /// The storage/wire identifier for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ListingKind::Farm => "farm",
            ListingKind::Stall => "stall",
            ListingKind::StallOnly => "stall-only",
        }
    }

    /// Parses a storage/wire identifier (`"farm"` / `"stall"` /
    /// `"stall-only"`), returning `None` for anything else.
    #[must_use]
    pub fn from_record_type(s: &str) -> Option<Self> {
        match s {
            "farm" => Some(ListingKind::Farm),
            "stall" => Some(ListingKind::Stall),
            "stall-only" => Some(ListingKind::StallOnly),
            _ => None,
        }
    }

    /// Resolves a human-facing filter label to a kind.
    ///
    /// This is the fixed alias table for the storefront's type filter;
    /// matching is case-insensitive after trimming. Unrecognized labels
    /// return `None` and are silently ignored by the normalizer — they
    /// must not error and must not add constraints.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "family farms" | "farm" | "farms" => Some(ListingKind::Farm),
            "farm stalls" | "stall" | "stalls" => Some(ListingKind::Stall),
            "independent stalls" | "stall-only" | "stall only" => Some(ListingKind::StallOnly),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selling point attached to a stall listing.
///
/// Order is significant: sites are kept in the store's `position` order,
/// and distance resolution always uses the first site.
#[derive(Debug, Clone, Serialize)]
pub struct StallSite {
    pub id: Uuid,
    pub name: Option<String>,
    /// `None` when the stored row carries no usable coordinate pair.
    pub location: Option<Coordinates>,
}

/// The unit of search: one farm, farm stall, or independent stall.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub kind: ListingKind,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub logo_url: Option<String>,
    /// Direct coordinates; for stalls this is a fallback only.
    pub location: Option<Coordinates>,
    /// Stall selling points in stable store order. Empty for farms.
    pub stall_sites: Vec<StallSite>,
    pub product_tags: Vec<String>,
    pub feature_tags: Vec<String>,
}

impl Listing {
    /// Resolves the authoritative coordinate pair for this listing.
    ///
    /// Resolution order, first match wins:
    /// 1. farms and independent stalls use their direct location;
    /// 2. stalls use the **first** stall site's location — deliberately not
    ///    the nearest one, so ranking stays reproducible against the
    ///    deployed behavior;
    /// 3. any listing falls back to its direct location;
    /// 4. otherwise the listing has no resolvable coordinates.
    #[must_use]
    pub fn resolved_coordinates(&self) -> Option<Coordinates> {
        let primary = match self.kind {
            ListingKind::Farm | ListingKind::StallOnly => self.location,
            ListingKind::Stall => self.stall_sites.first().and_then(|site| site.location),
        };
        primary.or(self.location)
    }
}

/// A product row resolved for product-scoped search output, annotated with
/// its current inventory count and price.
#[derive(Debug, Clone, Serialize)]
pub struct ProductHit {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub inventory_count: i32,
    pub tags: Vec<String>,
}
