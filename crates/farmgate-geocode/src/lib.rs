//! Geocoding client for the farmgate workspace.
//!
//! Talks to a Nominatim-compatible HTTP API to turn free-text addresses
//! into coordinates, with a retry policy tuned for a politely rate-limited
//! public endpoint. Implements the search engine's [`Geocoder`] seam.
//!
//! [`Geocoder`]: farmgate_search::Geocoder

mod client;
mod error;
mod retry;

pub use client::GeocodeClient;
pub use error::GeocodeError;
