//! The proximity search engine: normalizer → fetcher → resolver/ranker,
//! glued together behind an errors-as-values boundary.
//!
//! The engine itself owns no I/O. Candidate retrieval and geocoding enter
//! through the [`ListingSource`] and [`Geocoder`] traits so the Postgres
//! adapter, the combined SQL search function, and test doubles are all
//! interchangeable.

mod engine;
mod error;
mod source;

pub use engine::{ProductSearchOutcome, SearchEngine, SearchOutcome};
pub use error::FetchError;
pub use source::{Fetched, Geocoder, ListingSource, NoopGeocoder};
