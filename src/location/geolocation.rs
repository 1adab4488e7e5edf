use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Failures reported by a position source, numbered like the platform
/// geolocation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    PermissionDenied = 1,
    PositionUnavailable = 2,
    Timeout = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location is unavailable")]
    Unavailable,
    #[error("location permission was denied")]
    Denied,
    #[error("timed out waiting for a location")]
    Timeout,
}

impl From<PositionError> for LocationError {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::PermissionDenied => LocationError::Denied,
            PositionError::PositionUnavailable => LocationError::Unavailable,
            PositionError::Timeout => LocationError::Timeout,
        }
    }
}

/// A one-shot provider of the device's position.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, PositionError>;
}

/// Position supplied up front (command line or environment).
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Approximate position from an IP geolocation service answering
/// `{"latitude": .., "longitude": ..}`.
pub struct IpPositionSource {
    client: Client,
    url: String,
}

impl IpPositionSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl PositionSource for IpPositionSource {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            debug!(error = %e, "ip geolocation request failed");
            if e.is_timeout() {
                PositionError::Timeout
            } else {
                PositionError::PositionUnavailable
            }
        })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(PositionError::PermissionDenied),
            status if !status.is_success() => return Err(PositionError::PositionUnavailable),
            _ => {}
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|_| PositionError::PositionUnavailable)?;
        match (body.latitude, body.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates::new(latitude, longitude)),
            _ => Err(PositionError::PositionUnavailable),
        }
    }
}

/// Wraps an optional position source into a single awaitable attempt.
/// Never retries.
#[derive(Clone, Default)]
pub struct GeolocationAdapter {
    source: Option<Arc<dyn PositionSource>>,
    deadline: Option<Duration>,
}

impl GeolocationAdapter {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            source: Some(source),
            deadline: None,
        }
    }

    /// An adapter on a platform without geolocation.
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn acquire(&self) -> Result<Coordinates, LocationError> {
        let source = self.source.as_ref().ok_or(LocationError::Unavailable)?;
        let position = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, source.current_position())
                .await
                .map_err(|_| LocationError::Timeout)?,
            None => source.current_position().await,
        };
        Ok(position?)
    }
}
