//! Search-as-you-type state for one search box.
//!
//! Keystrokes are debounced: each call to [`SearchController::on_query_changed`]
//! cancels the pending timer and arms a new one. Every armed timer gets a
//! sequence number, and a finished resolution is only published if its number
//! is still the latest, so a slow earlier lookup can never overwrite a newer one.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    cache::ResponseCache,
    config::Config,
    error::GeolocationError,
    geocode::GeocodeFetcher,
    geolocation::{GeolocationOptions, PositionSource},
    model::{Coordinates, LocationCandidate, RankedLocation},
    provider::GeocodeSource,
    rank::LocationRanker,
};

/// Query text shown after switching to the device position.
pub const CURRENT_LOCATION_LABEL: &str = "Current location";

/// What the search box should currently show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    pub raw_query: String,
    pub suggestions: Vec<RankedLocation>,
    pub is_loading: bool,
    pub suggestions_visible: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub geolocation: GeolocationOptions,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_len: 2,
            geolocation: GeolocationOptions::default(),
        }
    }
}

#[derive(Debug, Default)]
enum DebounceState {
    #[default]
    Idle,
    Pending {
        seq: u64,
        timer: JoinHandle<()>,
    },
    Resolving {
        seq: u64,
    },
}

#[derive(Debug, Default)]
struct Session {
    state: DebounceState,
    latest_seq: u64,
}

#[derive(Debug)]
struct Inner {
    fetcher: GeocodeFetcher,
    ranker: LocationRanker,
    positions: Arc<dyn PositionSource>,
    options: ControllerOptions,
    session: Mutex<Session>,
    snapshot: watch::Sender<SearchSnapshot>,
}

#[derive(Debug, Clone)]
pub struct SearchController {
    inner: Arc<Inner>,
}

impl SearchController {
    pub fn new(
        fetcher: GeocodeFetcher,
        ranker: LocationRanker,
        positions: Arc<dyn PositionSource>,
        options: ControllerOptions,
    ) -> Self {
        let (snapshot, _) = watch::channel(SearchSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                fetcher,
                ranker,
                positions,
                options,
                session: Mutex::new(Session::default()),
                snapshot,
            }),
        }
    }

    /// Wire a controller from config. `cache` may be shared between controllers.
    pub fn from_config(
        config: &Config,
        source: Arc<dyn GeocodeSource>,
        cache: Arc<ResponseCache<Vec<LocationCandidate>>>,
        positions: Arc<dyn PositionSource>,
    ) -> Self {
        let options = ControllerOptions {
            debounce: config.search.debounce(),
            min_query_len: config.search.min_query_len,
            geolocation: config.geolocation_options(),
        };
        Self::new(
            GeocodeFetcher::from_config(source, cache, &config.search),
            LocationRanker::from_config(&config.search),
            positions,
            options,
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// React to new text in the search box.
    ///
    /// Queries shorter than the minimum clear the suggestions right away and
    /// never reach the network. Must be called from within a Tokio runtime.
    pub fn on_query_changed(&self, text: &str) {
        let mut session = self.inner.session();
        session.latest_seq += 1;
        let seq = session.latest_seq;

        match std::mem::take(&mut session.state) {
            DebounceState::Pending { seq: cancelled, timer } => {
                timer.abort();
                debug!(seq = cancelled, "cancelled pending search");
            }
            DebounceState::Resolving { seq: in_flight } => {
                debug!(seq = in_flight, "in-flight search superseded");
            }
            DebounceState::Idle => {}
        }

        if text.chars().count() < self.inner.options.min_query_len {
            self.inner.snapshot.send_modify(|s| {
                s.raw_query = text.to_string();
                s.suggestions.clear();
                s.suggestions_visible = false;
                s.is_loading = false;
            });
            return;
        }

        self.inner.snapshot.send_modify(|s| s.raw_query = text.to_string());

        let inner = Arc::clone(&self.inner);
        let query = text.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.options.debounce).await;
            inner.fire(seq, query).await;
        });
        session.state = DebounceState::Pending { seq, timer };
    }

    /// Pick a suggestion. Hides the list but leaves any pending timer alone.
    pub fn select_location(&self, location: &LocationCandidate) -> Coordinates {
        self.inner.snapshot.send_modify(|s| {
            s.raw_query = location.label();
            s.suggestions.clear();
            s.suggestions_visible = false;
        });
        location.coordinates()
    }

    /// Device position. A failure is returned as is and never retried.
    pub async fn get_current_position(&self) -> Result<Coordinates, GeolocationError> {
        match self.inner.positions.current_position(&self.inner.options.geolocation).await {
            Ok(position) => {
                self.inner.snapshot.send_modify(|s| {
                    s.raw_query = CURRENT_LOCATION_LABEL.to_string();
                    s.suggestions_visible = false;
                });
                Ok(position)
            }
            Err(e) => {
                warn!(error = %e, "could not determine current position");
                Err(e)
            }
        }
    }
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fire(&self, seq: u64, query: String) {
        {
            let mut session = self.session();
            match session.state {
                DebounceState::Pending { seq: pending, .. } if pending == seq => {}
                _ => return,
            }
            session.state = DebounceState::Resolving { seq };
            // under the lock, so a superseding short query always writes last
            self.snapshot.send_modify(|s| s.is_loading = true);
        }

        let suggestions = match self.fetcher.resolve(&query).await {
            Ok(candidates) => self.ranker.rank(candidates, &query),
            Err(e) => {
                warn!(error = %e, "location search failed");
                Vec::new()
            }
        };

        let mut session = self.session();
        if session.latest_seq != seq {
            debug!(seq, latest = session.latest_seq, "discarding superseded search result");
            return;
        }
        session.state = DebounceState::Idle;

        info!(query = %query, count = suggestions.len(), "publishing suggestions");
        self.snapshot.send_modify(|s| {
            s.suggestions = suggestions;
            s.suggestions_visible = true;
            s.is_loading = false;
        });
    }
}
