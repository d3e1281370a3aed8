use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    error::FetchError,
    model::{Coordinates, CurrentWeather, ForecastEntry, LocationCandidate},
};

use super::{GeocodeSource, WeatherProvider};

const DATA_URL: &str = "https://api.openweathermap.org/data/2.5";
const GEO_URL: &str = "https://api.openweathermap.org/geo/1.0";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    units: String,
    lang: String,
    data_url: String,
    geo_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, units: String, lang: String) -> Self {
        Self {
            api_key,
            units,
            lang,
            data_url: DATA_URL.to_string(),
            geo_url: GEO_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Point the client at another host, e.g. a local proxy.
    pub fn with_base_urls(
        mut self,
        data_url: impl Into<String>,
        geo_url: impl Into<String>,
    ) -> Self {
        self.data_url = data_url.into();
        self.geo_url = geo_url.into();
        self
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        debug!(what, url, "sending request");

        let res = self
            .http
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| FetchError::Transport { what, source })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| FetchError::Transport { what, source })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                what,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode { what, source })
    }

    fn weather_query(&self, at: Coordinates) -> [(&'static str, String); 4] {
        [
            ("lat", at.lat.to_string()),
            ("lon", at.lon.to_string()),
            ("units", self.units.clone()),
            ("lang", self.lang.clone()),
        ]
    }
}

#[async_trait]
impl GeocodeSource for OpenWeatherClient {
    async fn direct(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, FetchError> {
        let url = format!("{}/direct", self.geo_url);
        self.get_json(
            "geocoding",
            &url,
            &[("q", query.to_string()), ("limit", limit.to_string())],
        )
        .await
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, at: Coordinates) -> Result<CurrentWeather, FetchError> {
        let url = format!("{}/weather", self.data_url);
        let parsed: OwCurrentResponse =
            self.get_json("current weather", &url, &self.weather_query(at)).await?;
        Ok(parsed.into_model())
    }

    async fn forecast(&self, at: Coordinates) -> Result<Vec<ForecastEntry>, FetchError> {
        let url = format!("{}/forecast", self.data_url);
        let parsed: OwForecastResponse =
            self.get_json("forecast", &url, &self.weather_query(at)).await?;
        Ok(parsed.list.into_iter().map(OwForecastEntry::into_model).collect())
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    temp_min: f64,
    #[serde(default)]
    temp_max: f64,
    #[serde(default)]
    pressure: u32,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    sys: OwSys,
    visibility: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

impl OwCurrentResponse {
    fn into_model(self) -> CurrentWeather {
        let (condition, description, icon) = first_weather(self.weather);

        CurrentWeather {
            location_name: self.name,
            condition,
            description,
            icon,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed: self.wind.speed,
            visibility_m: self.visibility,
            sunrise: unix_to_utc(self.sys.sunrise).unwrap_or_default(),
            sunset: unix_to_utc(self.sys.sunset).unwrap_or_default(),
            observation_time: unix_to_utc(self.dt).unwrap_or_else(Utc::now),
        }
    }
}

impl OwForecastEntry {
    fn into_model(self) -> ForecastEntry {
        let (_, description, icon) = first_weather(self.weather);

        ForecastEntry {
            time: unix_to_utc(self.dt).unwrap_or_default(),
            temperature: self.main.temp,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            humidity_pct: self.main.humidity,
            description,
            icon,
        }
    }
}

fn first_weather(weather: Vec<OwWeather>) -> (String, String, String) {
    weather
        .into_iter()
        .next()
        .map(|w| (w.main, w.description, w.icon))
        .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string(), String::new()))
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
