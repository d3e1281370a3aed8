//! Core library for the `skyview` weather dashboard.
//!
//! This crate defines:
//! - Configuration handling
//! - Location search: geocoding fan-out, ranking and a debounced controller
//! - Weather loading by coordinates with short-lived response caching
//! - Shared domain models
//!
//! It is used by `skyview-cli`, but the search controller is UI-agnostic and
//! can back any front end that renders its snapshots.

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod geocode;
pub mod geolocation;
pub mod model;
pub mod provider;
pub mod rank;
pub mod weather;

pub use cache::{Clock, ManualClock, ResponseCache, SystemClock};
pub use config::{Config, SearchConfig};
pub use controller::{ControllerOptions, SearchController, SearchSnapshot};
pub use error::{FetchError, GeolocationError, SearchError};
pub use geocode::GeocodeFetcher;
pub use geolocation::{FixedPosition, GeolocationOptions, IpPositionSource, PositionSource};
pub use model::{
    Coordinates, CurrentWeather, ForecastEntry, LocationCandidate, RankedLocation, WeatherReport,
};
pub use provider::{GeocodeSource, WeatherProvider, openweather::OpenWeatherClient};
pub use rank::LocationRanker;
pub use weather::{Dashboard, WeatherService};
