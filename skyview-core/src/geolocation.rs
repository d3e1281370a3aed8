//! Device position sources.
//!
//! A failed fix is final: nothing here retries, callers decide on a fallback.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{
    fmt::Debug,
    sync::{Mutex, PoisonError},
    time::Duration,
};
use tokio::time::Instant;
use tracing::debug;

use crate::{
    error::{FetchError, GeolocationError},
    model::Coordinates,
};

const IP_API_URL: &str = "https://ipapi.co/json/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// A previous fix younger than this may be returned without a new lookup.
    pub max_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_age: Duration::from_secs(5 * 60),
        }
    }
}

#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Ok(self.0)
    }
}

/// Coarse position from the public IP address.
///
/// IP lookups are city-level at best, so `high_accuracy` has no effect.
#[derive(Debug)]
pub struct IpPositionSource {
    http: Client,
    url: String,
    last_fix: Mutex<Option<(Instant, Coordinates)>>,
}

impl Default for IpPositionSource {
    fn default() -> Self {
        Self::new(IP_API_URL)
    }
}

impl IpPositionSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            last_fix: Mutex::new(None),
        }
    }

    fn cached_fix(&self, max_age: Duration) -> Option<Coordinates> {
        let last_fix = *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner);
        last_fix.filter(|(at, _)| at.elapsed() <= max_age).map(|(_, position)| position)
    }

    async fn lookup(&self) -> Result<Coordinates, GeolocationError> {
        let what = "ip geolocation";
        let res = self
            .http
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, concat!("skyview/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|source| FetchError::Transport { what, source })?;

        let status = res.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(GeolocationError::Denied(format!("{what} returned {status}")));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Status { what, status, body }.into());
        }

        let body = res.text().await.map_err(|source| FetchError::Transport { what, source })?;
        let parsed: IpApiResult =
            serde_json::from_str(&body).map_err(|source| FetchError::Decode { what, source })?;

        match (parsed.latitude, parsed.longitude) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(GeolocationError::Unavailable(
                parsed.reason.unwrap_or_else(|| "no coordinates in response".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    reason: Option<String>,
}

#[async_trait]
impl PositionSource for IpPositionSource {
    async fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        if let Some(position) = self.cached_fix(options.max_age) {
            debug!(%position, "reusing recent position fix");
            return Ok(position);
        }

        let position = tokio::time::timeout(options.timeout, self.lookup())
            .await
            .map_err(|_| GeolocationError::Timeout(options.timeout))??;

        *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((Instant::now(), position));
        Ok(position)
    }
}
