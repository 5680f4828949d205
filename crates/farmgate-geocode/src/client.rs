//! HTTP client for a Nominatim-compatible geocoding service.
//!
//! Wraps `reqwest` with typed error handling, a configurable base URL for
//! tests, and the retry policy the public Nominatim usage terms allow. One
//! request resolves one free-text address to at most one coordinate pair.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use farmgate_core::{AppConfig, Coordinates};
use farmgate_search::Geocoder;

use crate::error::GeocodeError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/";

/// One entry of a Nominatim `/search` response. Coordinates arrive as
/// decimal strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// A Nominatim `/reverse` response.
#[derive(Debug, Deserialize)]
struct ReversePlace {
    display_name: Option<String>,
}

/// Client for a Nominatim-compatible geocoding API.
///
/// Use [`GeocodeClient::from_app_config`] for production or
/// [`GeocodeClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug)]
pub struct GeocodeClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl GeocodeClient {
    /// Creates a new client pointed at the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, GeocodeError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Normalise: the base URL must end with exactly one slash so that
        // Url::join appends the endpoint path instead of replacing the last
        // path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|_| GeocodeError::InvalidBaseUrl(base_url.to_owned()))?;

        Ok(Self {
            client,
            base_url,
            max_retries: 3,
            backoff_base_ms: 500,
        })
    }

    /// Creates a client from the application config: base URL, timeout,
    /// user agent, and retry policy all come from `FARMGATE_GEOCODE_*`.
    ///
    /// # Errors
    ///
    /// Same as [`GeocodeClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, GeocodeError> {
        let client = Self::with_base_url(
            config.geocode_timeout_secs,
            &config.geocode_user_agent,
            &config.geocode_base_url,
        )?;
        Ok(client.with_retry_policy(config.geocode_max_retries, config.geocode_retry_backoff_base_ms))
    }

    /// Overrides the retry policy. Pass `max_retries = 0` to disable retries.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Resolves a free-text address to coordinates via `/search`, single
    /// attempt. `Ok(None)` means the service answered but found nothing
    /// usable for the address.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GeocodeError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn search(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let url = self.build_url("search", &[("q", address), ("format", "jsonv2"), ("limit", "1")]);
        let body = self.request_json(&url).await?;

        let places: Vec<Place> =
            serde_json::from_value(body).map_err(|e| GeocodeError::Deserialize {
                context: format!("search(q={address})"),
                source: e,
            })?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        // Decimal-string coordinates that do not parse, or parse outside
        // valid range, resolve to None rather than an error: the address is
        // unresolvable, the service is not broken.
        let parsed = place
            .lat
            .parse::<f64>()
            .ok()
            .zip(place.lon.parse::<f64>().ok())
            .and_then(|(lat, lon)| Coordinates::new(lat, lon));
        if parsed.is_none() {
            tracing::warn!(
                address,
                lat = %place.lat,
                lon = %place.lon,
                "geocoder returned unusable coordinates"
            );
        }
        Ok(parsed)
    }

    /// Reverse geocoding via `/reverse`: coordinates → canonical display
    /// address. Used by the onboarding flow to echo back the address the
    /// geocoder actually matched. `Ok(None)` when the service has no name
    /// for the location.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GeocodeError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn reverse(&self, location: Coordinates) -> Result<Option<String>, GeocodeError> {
        let lat = location.lat().to_string();
        let lon = location.lon().to_string();
        let url = self.build_url(
            "reverse",
            &[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "jsonv2")],
        );
        let body = self.request_json(&url).await?;

        let place: ReversePlace =
            serde_json::from_value(body).map_err(|e| GeocodeError::Deserialize {
                context: format!("reverse(lat={lat}, lon={lon})"),
                source: e,
            })?;
        Ok(place.display_name)
    }

    /// Builds the full request URL with percent-encoded query parameters.
    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Url {
        // The base URL is pre-validated with a trailing slash, so join cannot fail
        // for a relative single-segment path.
        let mut url = self
            .base_url
            .join(endpoint)
            .unwrap_or_else(|_| self.base_url.clone());
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Sends a GET request, asserts a 2xx HTTP status, and parses the
    /// response body as JSON.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, GeocodeError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl Geocoder for GeocodeClient {
    /// Forward geocoding with the client's retry policy applied. Transient
    /// failures are retried with back-off; the final error is boxed for the
    /// engine, which treats it as a per-listing, non-fatal outcome.
    async fn geocode(
        &self,
        address: &str,
    ) -> Result<Option<Coordinates>, Box<dyn std::error::Error + Send + Sync + 'static>> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.search(address)
        })
        .await
        .map_err(Into::into)
    }
}
