use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two candidates closer than this on both axes are the same place.
pub const SAME_PLACE_EPSILON_DEG: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// A place returned by a geocoding lookup.
///
/// Deserializes straight from the OpenWeather `geo/1.0/direct` payload; extra
/// fields such as `local_names` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    /// ISO 3166-1 alpha-2 code.
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl LocationCandidate {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// Approximate coordinate equality, the identity used for deduplication.
    pub fn same_place(&self, other: &LocationCandidate) -> bool {
        (self.lat - other.lat).abs() < SAME_PLACE_EPSILON_DEG
            && (self.lon - other.lon).abs() < SAME_PLACE_EPSILON_DEG
    }

    /// Text put back into the search box once the place is picked.
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

impl fmt::Display for LocationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => write!(f, "{} ({}, {})", self.name, state, self.country),
            None => write!(f, "{} ({})", self.name, self.country),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLocation {
    #[serde(flatten)]
    pub location: LocationCandidate,
    pub relevance_score: u32,
}

impl fmt::Display for RankedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.location, f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location_name: String,
    /// Coarse category such as "Clear", "Clouds" or "Rain".
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed: f64,
    pub visibility_m: Option<u32>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub observation_time: DateTime<Utc>,
}

impl CurrentWeather {
    pub fn is_day(&self) -> bool {
        self.observation_time >= self.sunrise && self.observation_time < self.sunset
    }
}

/// One 3-hour slot of the multi-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity_pct: u8,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub coordinates: Coordinates,
    pub current: CurrentWeather,
    pub forecast: Vec<ForecastEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, lat: f64, lon: f64) -> LocationCandidate {
        LocationCandidate {
            name: name.to_string(),
            state: None,
            country: "TR".to_string(),
            lat,
            lon,
        }
    }

    #[test]
    fn same_place_uses_coordinate_tolerance_not_name() {
        let a = place("Kocaeli", 40.85, 29.88);
        let b = place("Izmit", 40.851, 29.881);
        let c = place("Kocaeli", 40.87, 29.88);

        assert!(a.same_place(&b));
        assert!(!a.same_place(&c));
    }

    #[test]
    fn candidate_parses_geocoding_payload() {
        let json = r#"{
            "name": "Ankara",
            "local_names": {"tr": "Ankara"},
            "lat": 39.9207,
            "lon": 32.8541,
            "country": "TR",
            "state": "Ankara"
        }"#;

        let parsed: LocationCandidate = serde_json::from_str(json).expect("valid payload");
        assert_eq!(parsed.name, "Ankara");
        assert_eq!(parsed.state.as_deref(), Some("Ankara"));
        assert_eq!(parsed.label(), "Ankara, TR");
    }

    #[test]
    fn candidate_without_state_displays_country_only() {
        let json = r#"{"name": "Essen", "lat": 51.45, "lon": 7.01, "country": "DE"}"#;
        let parsed: LocationCandidate = serde_json::from_str(json).expect("valid payload");

        assert_eq!(parsed.state, None);
        assert_eq!(parsed.to_string(), "Essen (DE)");
    }
}
