use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single outbound HTTP call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to send {what} request: {source}")]
    Transport {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{what} request failed with status {status}: {body}")]
    Status {
        what: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("failed to parse {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Location search could not produce any candidates at all.
///
/// A single failing source is not an error; this is only raised once every
/// lookup for the query has failed.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("all {attempted} geocoding lookups failed for '{query}'")]
    AllSourcesFailed { query: String, attempted: usize },
}

#[derive(Debug, Error)]
pub enum GeolocationError {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("location access denied: {0}")]
    Denied(String),
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("no position fix within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
