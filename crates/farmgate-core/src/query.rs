//! Filter normalization: raw storefront filter input → canonical
//! [`SearchQuery`].
//!
//! The raw/normalized split is load-bearing. Historically the filter shape
//! was a loose bag that several call sites converted (and occasionally
//! re-converted) independently; keeping miles in [`SearchFilters`] and
//! meters in [`SearchQuery`] as distinct types makes a double unit
//! conversion unrepresentable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{miles_to_meters, Coordinates};
use crate::listing::ListingKind;

/// Malformed search input, reported as a value at the API boundary.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("origin latitude and longitude must be supplied together")]
    PartialOrigin,
    #[error("origin coordinates out of range: lat {lat}, lon {lon}")]
    OriginOutOfRange { lat: f64, lon: f64 },
}

/// Raw filter input exactly as the storefront sends it.
///
/// Radius is in miles; lists may contain duplicates, empty strings, and
/// unknown labels. [`SearchFilters::normalize`] is the only path from here
/// to a [`SearchQuery`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub radius_miles: Option<f64>,
    /// Human-facing type labels, e.g. `"Family Farms"`.
    pub variants: Vec<String>,
    pub products: Vec<String>,
    pub features: Vec<String>,
    pub query: Option<String>,
}

/// The canonical, normalized search request.
///
/// Invariants upheld by [`SearchFilters::normalize`]:
/// - `radius_meters` is `Some` only when `origin` is `Some` — a radius
///   without an origin is ignored, never treated as zero;
/// - empty sets mean "unconstrained", never "match nothing";
/// - `term` is trimmed and non-empty when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub origin: Option<Coordinates>,
    pub radius_meters: Option<f64>,
    pub kinds: BTreeSet<ListingKind>,
    pub product_tags: BTreeSet<String>,
    pub feature_tags: BTreeSet<String>,
    pub term: Option<String>,
}

impl SearchQuery {
    /// A query with no origin and no constraints: matches everything.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self {
            origin: None,
            radius_meters: None,
            kinds: BTreeSet::new(),
            product_tags: BTreeSet::new(),
            feature_tags: BTreeSet::new(),
            term: None,
        }
    }

    /// Whether distance filtering applies at all.
    #[must_use]
    pub fn is_distance_bounded(&self) -> bool {
        self.radius_meters.is_some()
    }

    /// Whether `kind` passes the variant filter (empty set accepts all).
    #[must_use]
    pub fn accepts_kind(&self, kind: ListingKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

impl SearchFilters {
    /// Normalizes raw input into a canonical [`SearchQuery`].
    ///
    /// - radius: miles → meters via the exact `1609.34` factor; `0`,
    ///   negative, or absent means unbounded (zero must not filter out
    ///   every result); without an origin the radius is dropped entirely;
    /// - variant labels: resolved through the fixed alias table,
    ///   unrecognized labels silently skipped;
    /// - tag lists: trimmed, empties dropped, duplicates collapsed;
    /// - free text: trimmed, empty → absent.
    ///
    /// # Errors
    ///
    /// [`ValidationError::PartialOrigin`] when exactly one of
    /// `origin_lat`/`origin_lon` is supplied, and
    /// [`ValidationError::OriginOutOfRange`] when both are supplied but do
    /// not form a valid coordinate.
    pub fn normalize(
        &self,
        origin_lat: Option<f64>,
        origin_lon: Option<f64>,
    ) -> Result<SearchQuery, ValidationError> {
        let origin = match (origin_lat, origin_lon) {
            (Some(lat), Some(lon)) => Some(
                Coordinates::new(lat, lon)
                    .ok_or(ValidationError::OriginOutOfRange { lat, lon })?,
            ),
            (None, None) => None,
            _ => return Err(ValidationError::PartialOrigin),
        };

        let radius_meters = if origin.is_some() {
            self.radius_miles
                .filter(|miles| *miles > 0.0)
                .map(miles_to_meters)
        } else {
            None
        };

        let kinds = self
            .variants
            .iter()
            .filter_map(|label| ListingKind::from_label(label))
            .collect();

        let term = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned);

        Ok(SearchQuery {
            origin,
            radius_meters,
            kinds,
            product_tags: collect_tags(&self.products),
            feature_tags: collect_tags(&self.features),
            term,
        })
    }
}

fn collect_tags(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Tag overlap: any shared element between the listing's tags and the
/// required set counts as a match; an empty required set matches anything.
#[must_use]
pub fn tags_overlap(listing_tags: &[String], required: &BTreeSet<String>) -> bool {
    required.is_empty() || listing_tags.iter().any(|t| required.contains(t))
}
