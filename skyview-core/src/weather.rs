use chrono::TimeZone;
use std::{fmt, sync::Arc};
use tracing::{info, warn};

use crate::{
    cache::{Clock, ResponseCache},
    controller::SearchController,
    error::FetchError,
    model::{Coordinates, CurrentWeather, ForecastEntry, WeatherReport},
    provider::WeatherProvider,
};

/// Number of days shown in the forecast strip.
pub const FORECAST_DAYS: usize = 5;

/// Current conditions and forecast by coordinates, each memoised on its own.
#[derive(Debug)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    current: ResponseCache<CurrentWeather>,
    forecast: ResponseCache<Vec<ForecastEntry>>,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        ttl: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            current: ResponseCache::new(ttl, Arc::clone(&clock)),
            forecast: ResponseCache::new(ttl, clock),
        }
    }

    pub async fn current(&self, at: Coordinates) -> Result<CurrentWeather, FetchError> {
        let key = format!("weather_{}_{}", at.lat, at.lon);
        if let Some(cached) = self.current.get(&key) {
            return Ok(cached);
        }

        let current = self.provider.current(at).await?;
        self.current.put(key, current.clone());
        Ok(current)
    }

    pub async fn forecast(&self, at: Coordinates) -> Result<Vec<ForecastEntry>, FetchError> {
        let key = format!("forecast_{}_{}", at.lat, at.lon);
        if let Some(cached) = self.forecast.get(&key) {
            return Ok(cached);
        }

        let forecast = self.provider.forecast(at).await?;
        self.forecast.put(key, forecast.clone());
        Ok(forecast)
    }

    /// Both lookups run concurrently; either failing fails the load.
    pub async fn load(&self, at: Coordinates) -> Result<WeatherReport, FetchError> {
        let (current, forecast) = tokio::try_join!(self.current(at), self.forecast(at))?;
        Ok(WeatherReport {
            coordinates: at,
            current,
            forecast,
        })
    }
}

/// The weather currently on screen.
#[derive(Debug)]
pub struct Dashboard {
    weather: WeatherService,
    default_location: Coordinates,
    report: Option<WeatherReport>,
}

impl Dashboard {
    pub fn new(weather: WeatherService, default_location: Coordinates) -> Self {
        Self {
            weather,
            default_location,
            report: None,
        }
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        self.report.as_ref()
    }

    /// Load weather for `at`. On failure the previous report stays as it was.
    pub async fn refresh(&mut self, at: Coordinates) -> Result<&WeatherReport, FetchError> {
        match self.weather.load(at).await {
            Ok(report) => {
                info!(location = %report.current.location_name, "weather loaded");
                Ok(&*self.report.insert(report))
            }
            Err(e) => {
                warn!(error = %e, "weather load failed, keeping previous report");
                Err(e)
            }
        }
    }

    /// Load weather for the device position, or the default location if the
    /// position is unavailable.
    pub async fn locate_and_refresh(
        &mut self,
        search: &SearchController,
    ) -> Result<&WeatherReport, FetchError> {
        let at = match search.get_current_position().await {
            Ok(at) => at,
            Err(_) => self.default_location,
        };
        self.refresh(at).await
    }
}

/// One entry per calendar day in `tz`: the first entry, then every entry whose
/// day differs from the one before it.
pub fn daily_forecast<Tz: TimeZone>(
    entries: &[ForecastEntry],
    tz: &Tz,
    days: usize,
) -> Vec<ForecastEntry> {
    let mut previous_day = None;
    entries
        .iter()
        .filter(|entry| {
            let day = entry.time.with_timezone(tz).date_naive();
            let new_day = previous_day != Some(day);
            previous_day = Some(day);
            new_day
        })
        .take(days)
        .cloned()
        .collect()
}

pub fn format_temperature(celsius: f64) -> String {
    format!("{}°", celsius.round() as i64)
}

pub fn icon_url(icon: &str) -> String {
    format!("https://openweathermap.org/img/wn/{icon}@2x.png")
}

/// Backdrop for the current-conditions card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Night,
    Sunny,
    Cloudy,
    Rainy,
    Clear,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Night => "night",
            Theme::Sunny => "sunny",
            Theme::Cloudy => "cloudy",
            Theme::Rainy => "rainy",
            Theme::Clear => "clear",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Night wins over any condition; unknown categories get the neutral theme.
pub fn theme(condition: &str, is_day: bool) -> Theme {
    if !is_day {
        return Theme::Night;
    }
    match condition.to_lowercase().as_str() {
        "clear" => Theme::Sunny,
        "clouds" => Theme::Cloudy,
        "rain" | "drizzle" | "thunderstorm" => Theme::Rainy,
        _ => Theme::Clear,
    }
}
