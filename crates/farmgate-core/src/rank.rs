//! Distance resolution, radius filtering, and ranking of search candidates.
//!
//! This is the pure in-memory tail of the search pipeline: no I/O, no
//! suspension points, deterministic for identical inputs. Candidates arrive
//! as an unordered superset from the data store (distance false-positives
//! allowed); everything distance-related happens here.

use std::cmp::Ordering;

use serde::Serialize;

use crate::listing::{Listing, ProductHit};
use crate::query::{tags_overlap, SearchQuery};

/// One listing annotated with its distance from the search origin.
///
/// `distance_meters` is present iff the query carried an origin and the
/// listing's coordinates could be resolved.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub listing: Listing,
    pub distance_meters: Option<f64>,
}

/// A listing together with its product rows, before tag filtering.
#[derive(Debug, Clone)]
pub struct ProductCandidate {
    pub listing: Listing,
    pub products: Vec<ProductHit>,
}

/// A ranked product-search group: one listing header plus its matching
/// products. Groups with zero matching products are dropped before ranking.
#[derive(Debug, Clone, Serialize)]
pub struct ListingProducts {
    #[serde(flatten)]
    pub listing: Listing,
    pub distance_meters: Option<f64>,
    pub products: Vec<ProductHit>,
}

/// Resolves coordinates, applies the radius cutoff, and ranks candidates by
/// distance.
///
/// Retention rule: a candidate is kept iff the radius is unbounded, or its
/// resolved distance is `<=` the radius (inclusive boundary). A candidate
/// with no resolvable coordinates is dropped when the radius is bounded and
/// kept with an absent distance otherwise.
///
/// Ranking is ascending by distance; absent distances sort last, preserving
/// their relative input order (stable sort).
#[must_use]
pub fn rank_listings(candidates: Vec<Listing>, query: &SearchQuery) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter_map(|listing| {
            let distance_meters = annotate_distance(&listing, query)?;
            Some(SearchResult {
                listing,
                distance_meters,
            })
        })
        .collect();
    sort_by_distance(&mut results, |r| r.distance_meters);
    results
}

/// Product-scoped variant of [`rank_listings`].
///
/// Each candidate's products are filtered by overlap with the query's
/// product tags; groups left with no matching products are dropped entirely,
/// then the surviving groups go through the same distance cutoff and
/// ordering as plain listing results.
#[must_use]
pub fn rank_product_groups(
    candidates: Vec<ProductCandidate>,
    query: &SearchQuery,
) -> Vec<ListingProducts> {
    let mut groups: Vec<ListingProducts> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let products: Vec<ProductHit> = candidate
                .products
                .into_iter()
                .filter(|p| tags_overlap(&p.tags, &query.product_tags))
                .collect();
            if products.is_empty() {
                return None;
            }
            let distance_meters = annotate_distance(&candidate.listing, query)?;
            Some(ListingProducts {
                listing: candidate.listing,
                distance_meters,
                products,
            })
        })
        .collect();
    sort_by_distance(&mut groups, |g| g.distance_meters);
    groups
}

/// Computes the distance annotation for one listing, or `None` when the
/// listing must be excluded.
///
/// The outer `Option` is retention (drop the listing entirely); the inner
/// one is the annotation itself (kept, but distance unknown).
fn annotate_distance(listing: &Listing, query: &SearchQuery) -> Option<Option<f64>> {
    let Some(origin) = query.origin else {
        // No origin: distance never applies, every candidate is kept bare.
        return Some(None);
    };

    match listing.resolved_coordinates() {
        Some(coords) => {
            let distance = origin.distance_meters(coords);
            match query.radius_meters {
                Some(radius) if distance > radius => None,
                _ => Some(Some(distance)),
            }
        }
        // Unresolvable: excluded only under a bounded radius.
        None if query.is_distance_bounded() => None,
        None => Some(None),
    }
}

fn sort_by_distance<T, F>(items: &mut [T], distance: F)
where
    F: Fn(&T) -> Option<f64>,
{
    // Vec sort is stable, so absent-distance entries keep their input order.
    items.sort_by(|a, b| match (distance(a), distance(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
