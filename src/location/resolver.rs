use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use super::geolocation::Coordinates;

pub const UNKNOWN: &str = "Unknown";

pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Coarse, human-readable place. Every field holds a real value or [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceDescriptor {
    pub city: String,
    pub region: String,
    pub country: String,
}

/// Address block of a reverse-geocoding reply. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    address: Option<Address>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl PlaceDescriptor {
    pub fn unknown() -> Self {
        Self {
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
        }
    }

    /// Total constructor. Per field:
    /// - city: first non-blank of `city`, `town`, `village`
    /// - region: `state`
    /// - country: `country`
    ///
    /// Anything missing or blank becomes [`UNKNOWN`].
    pub fn from_address(address: Option<&Address>) -> Self {
        let Some(address) = address else {
            return Self::unknown();
        };
        let city = non_blank(&address.city)
            .or_else(|| non_blank(&address.town))
            .or_else(|| non_blank(&address.village))
            .unwrap_or(UNKNOWN);
        Self {
            city: city.to_string(),
            region: non_blank(&address.state).unwrap_or(UNKNOWN).to_string(),
            country: non_blank(&address.country).unwrap_or(UNKNOWN).to_string(),
        }
    }

    pub fn is_fully_unknown(&self) -> bool {
        self.city == UNKNOWN && self.region == UNKNOWN && self.country == UNKNOWN
    }
}

impl fmt::Display for PlaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.city, self.region, self.country)
    }
}

/// Turns coordinates into a place. Implementations never fail: anything
/// they cannot determine is reported as [`UNKNOWN`].
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, coordinates: Coordinates) -> PlaceDescriptor;
}

#[derive(Debug, Error)]
enum GeocodeError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("geocoder answered {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed geocoder reply: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimResolver {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl NominatimResolver {
    pub fn new(client: Client, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    async fn lookup(&self, coordinates: Coordinates) -> Result<Option<Address>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("format", "json".to_string()),
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("zoom", "18".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }
        let body = response.text().await?;
        let parsed: ReverseGeocodeResponse = serde_json::from_str(&body)?;
        Ok(parsed.address)
    }
}

#[async_trait]
impl PlaceResolver for NominatimResolver {
    async fn resolve(&self, coordinates: Coordinates) -> PlaceDescriptor {
        match self.lookup(coordinates).await {
            Ok(address) => {
                let place = PlaceDescriptor::from_address(address.as_ref());
                debug!(%place, "resolved location");
                place
            }
            Err(e) => {
                warn!(error = %e, lat = coordinates.latitude, lon = coordinates.longitude, "reverse geocoding failed");
                PlaceDescriptor::unknown()
            }
        }
    }
}
