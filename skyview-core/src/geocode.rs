//! Fan-out of one query to several geocoding lookups.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    cache::ResponseCache,
    config::SearchConfig,
    error::SearchError,
    model::LocationCandidate,
    provider::GeocodeSource,
};

/// Cache key for the raw candidates of `query`.
pub fn search_cache_key(query: &str) -> String {
    format!("search_{query}")
}

/// Second lookup that appends a country hint to widen recall for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBias {
    pub hint: String,
    pub limit: usize,
    /// Only queries longer than this many characters get the biased lookup.
    pub min_query_chars: usize,
}

#[derive(Debug)]
pub struct GeocodeFetcher {
    source: Arc<dyn GeocodeSource>,
    cache: Arc<ResponseCache<Vec<LocationCandidate>>>,
    direct_limit: usize,
    region: Option<RegionBias>,
}

impl GeocodeFetcher {
    pub fn new(
        source: Arc<dyn GeocodeSource>,
        cache: Arc<ResponseCache<Vec<LocationCandidate>>>,
        direct_limit: usize,
        region: Option<RegionBias>,
    ) -> Self {
        Self {
            source,
            cache,
            direct_limit,
            region,
        }
    }

    pub fn from_config(
        source: Arc<dyn GeocodeSource>,
        cache: Arc<ResponseCache<Vec<LocationCandidate>>>,
        config: &SearchConfig,
    ) -> Self {
        let region = (!config.region_hint.trim().is_empty()).then(|| RegionBias {
            hint: config.region_hint.clone(),
            limit: config.region_limit,
            min_query_chars: 2,
        });
        Self::new(source, cache, config.direct_limit, region)
    }

    /// Lookups issued for `query`, as `(text, limit)` pairs.
    fn lookups(&self, query: &str) -> Vec<(String, usize)> {
        let mut lookups = vec![(query.to_string(), self.direct_limit)];
        if let Some(region) = &self.region {
            if query.chars().count() > region.min_query_chars {
                lookups.push((format!("{query}, {}", region.hint), region.limit));
            }
        }
        lookups
    }

    /// Candidates from every lookup, concatenated in lookup order.
    ///
    /// A failing lookup contributes nothing; only when all of them fail is an
    /// error returned, and nothing is cached in that case.
    pub async fn resolve(&self, query: &str) -> Result<Vec<LocationCandidate>, SearchError> {
        let key = search_cache_key(query);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let lookups = self.lookups(query);
        let attempted = lookups.len();
        let results = join_all(
            lookups.iter().map(|(text, limit)| self.source.direct(text, *limit)),
        )
        .await;

        let mut failures = 0;
        let mut candidates = Vec::new();
        for ((text, _), result) in lookups.iter().zip(results) {
            match result {
                Ok(found) => {
                    debug!(lookup = %text, count = found.len(), "geocoding lookup succeeded");
                    candidates.extend(found);
                }
                Err(e) => {
                    warn!(lookup = %text, error = %e, "geocoding lookup failed");
                    failures += 1;
                }
            }
        }

        if failures == attempted {
            return Err(SearchError::AllSourcesFailed {
                query: query.to_string(),
                attempted,
            });
        }

        self.cache.put(key, candidates.clone());
        Ok(candidates)
    }
}
