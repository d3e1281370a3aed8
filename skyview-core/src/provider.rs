use crate::{
    Config,
    error::FetchError,
    model::{Coordinates, CurrentWeather, ForecastEntry, LocationCandidate},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Name-to-coordinates lookup against one geocoding endpoint.
#[async_trait]
pub trait GeocodeSource: Send + Sync + Debug {
    async fn direct(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, FetchError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, at: Coordinates) -> Result<CurrentWeather, FetchError>;

    /// 3-hour entries covering the next several days.
    async fn forecast(&self, at: Coordinates) -> Result<Vec<ForecastEntry>, FetchError>;
}

/// Construct the OpenWeather client from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenWeatherClient> {
    let api_key = config.api_key()?;
    Ok(OpenWeatherClient::new(api_key, config.units.clone(), config.lang.clone()))
}
