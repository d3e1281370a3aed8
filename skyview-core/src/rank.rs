//! Deduplication, relevance scoring and ordering of geocoding candidates.

use std::cmp::Reverse;

use crate::{
    config::SearchConfig,
    model::{LocationCandidate, RankedLocation},
};

const EXACT_MATCH: u32 = 100;
const PREFIX_MATCH: u32 = 50;
const NAME_CONTAINS: u32 = 25;
const STATE_CONTAINS: u32 = 15;
const FOLDED_CONTAINS: u32 = 10;
const POPULAR_CITY: u32 = 5;

#[derive(Debug, Clone)]
pub struct LocationRanker {
    home_country: String,
    popular_cities: Vec<String>,
    max_results: usize,
}

impl LocationRanker {
    pub fn new(
        home_country: impl Into<String>,
        popular_cities: Vec<String>,
        max_results: usize,
    ) -> Self {
        Self {
            home_country: home_country.into(),
            popular_cities: popular_cities.iter().map(|c| c.to_lowercase()).collect(),
            max_results,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.home_country.clone(),
            config.popular_cities.clone(),
            config.max_suggestions,
        )
    }

    /// Dedup, score and order `candidates` for `query`.
    ///
    /// Home-country places come first whatever their score; within each group
    /// higher scores win and ties keep their input order.
    pub fn rank(&self, candidates: Vec<LocationCandidate>, query: &str) -> Vec<RankedLocation> {
        let query = normalize(query);

        let mut ranked: Vec<RankedLocation> = dedup_by_coordinates(candidates)
            .into_iter()
            .map(|location| {
                let relevance_score = self.score_normalized(&location, &query);
                RankedLocation {
                    location,
                    relevance_score,
                }
            })
            .collect();

        // sort_by_key is stable
        ranked.sort_by_key(|r| (!self.is_home(&r.location), Reverse(r.relevance_score)));
        ranked.truncate(self.max_results);
        ranked
    }

    /// Additive relevance heuristic; `query` is trimmed and lower-cased here.
    pub fn score(&self, candidate: &LocationCandidate, query: &str) -> u32 {
        self.score_normalized(candidate, &normalize(query))
    }

    fn score_normalized(&self, candidate: &LocationCandidate, query: &str) -> u32 {
        let name = candidate.name.to_lowercase();
        let state = candidate.state.as_deref().map(str::to_lowercase).unwrap_or_default();

        let mut score = 0;
        if name == query {
            score += EXACT_MATCH;
        }
        if name.starts_with(query) {
            score += PREFIX_MATCH;
        }
        if name.contains(query) {
            score += NAME_CONTAINS;
        }
        if state.contains(query) {
            score += STATE_CONTAINS;
        }
        if fold_diacritics(&name).contains(&fold_diacritics(query)) {
            score += FOLDED_CONTAINS;
        }
        if self.is_home(candidate) && self.popular_cities.iter().any(|city| *city == name) {
            score += POPULAR_CITY;
        }
        score
    }

    fn is_home(&self, candidate: &LocationCandidate) -> bool {
        candidate.country.eq_ignore_ascii_case(&self.home_country)
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Keep a candidate only if no earlier candidate is the same place.
fn dedup_by_coordinates(candidates: Vec<LocationCandidate>) -> Vec<LocationCandidate> {
    let duplicate: Vec<bool> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| candidates[..i].iter().any(|earlier| earlier.same_place(c)))
        .collect();

    candidates
        .into_iter()
        .zip(duplicate)
        .filter_map(|(c, dup)| (!dup).then_some(c))
        .collect()
}

/// Fold the lower-case Turkish letters with cedilla, breve, umlaut or missing
/// dot onto their base Latin letter.
///
/// Lower-casing `İ` leaves a combining dot above, which is dropped as well.
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            'ç' => Some('c'),
            'ğ' => Some('g'),
            'ı' => Some('i'),
            'ö' => Some('o'),
            'ş' => Some('s'),
            'ü' => Some('u'),
            '\u{307}' => None,
            other => Some(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(
        name: &str,
        state: Option<&str>,
        country: &str,
        lat: f64,
        lon: f64,
    ) -> LocationCandidate {
        LocationCandidate {
            name: name.to_string(),
            state: state.map(str::to_string),
            country: country.to_string(),
            lat,
            lon,
        }
    }

    fn ranker() -> LocationRanker {
        LocationRanker::from_config(&SearchConfig::default())
    }

    #[test]
    fn empty_input_ranks_to_empty_output() {
        assert!(ranker().rank(Vec::new(), "Ankara").is_empty());
    }

    #[test]
    fn kocaeli_scenario_dedups_and_puts_home_match_first() {
        let candidates = vec![
            place("Kocaeli", None, "TR", 40.85, 29.88),
            place("Kocaeli", None, "TR", 40.851, 29.881),
            place("Essen", None, "DE", 51.45, 7.01),
        ];

        let ranked = ranker().rank(candidates, "Kocaeli");

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].location.name, "Kocaeli");
        assert_eq!(ranked[0].location.lat, 40.85);
        // exact + prefix + contains + folded + popular
        assert_eq!(ranked[0].relevance_score, 190);
        assert_eq!(ranked[1].location.name, "Essen");
        assert_eq!(ranked[1].relevance_score, 0);
    }

    #[test]
    fn first_duplicate_survives_regardless_of_name() {
        let candidates = vec![
            place("Izmit", None, "TR", 40.7654, 29.9408),
            place("Kocaeli", None, "TR", 40.7701, 29.9401),
        ];

        let ranked = ranker().rank(candidates, "Kocaeli");

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].location.name, "Izmit");
    }

    #[test]
    fn home_country_sorts_before_higher_scores_abroad() {
        let candidates = vec![
            place("Paris", None, "FR", 48.85, 2.35),
            place("Parisçe", None, "TR", 39.0, 35.0),
        ];

        let ranked = ranker().rank(candidates, "paris");

        assert_eq!(ranked[0].location.country, "TR");
        assert!(ranked[0].relevance_score < ranked[1].relevance_score);
    }

    #[test]
    fn home_before_foreign_for_every_pair() {
        let candidates = vec![
            place("Batum", None, "GE", 41.6, 41.6),
            place("Batman", None, "TR", 37.88, 41.13),
            place("Bat Yam", None, "IL", 32.02, 34.75),
            place("Bartın", None, "TR", 41.63, 32.34),
        ];

        let ranked = ranker().rank(candidates, "bat");
        let first_foreign = ranked
            .iter()
            .position(|r| r.location.country != "TR")
            .expect("foreign results present");

        assert!(ranked[first_foreign..].iter().all(|r| r.location.country != "TR"));
        assert_eq!(first_foreign, 2);
    }

    #[test]
    fn popular_city_bonus_ignores_configured_case() {
        let ranker = LocationRanker::new("TR", vec!["Istanbul".to_string()], 8);
        let istanbul = place("Istanbul", None, "TR", 41.01, 28.98);

        // exact + prefix + contains + folded + popular
        assert_eq!(ranker.score(&istanbul, "istanbul"), 190);
    }

    #[test]
    fn exact_match_outranks_substring_match() {
        let candidates = vec![
            place("Yeni Van", None, "TR", 38.0, 43.0),
            place("Van", None, "TR", 38.5, 43.4),
        ];

        let ranked = ranker().rank(candidates, "van");

        assert_eq!(ranked[0].location.name, "Van");
        assert!(ranked[0].relevance_score > ranked[1].relevance_score);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let candidates = vec![
            place("Springfield", Some("Illinois"), "US", 39.8, -89.6),
            place("Springfield", Some("Missouri"), "US", 37.2, -93.3),
            place("Springfield", Some("Ohio"), "US", 39.9, -83.8),
        ];

        let ranked = ranker().rank(candidates, "springfield");
        let states: Vec<_> = ranked.iter().filter_map(|r| r.location.state.as_deref()).collect();

        assert_eq!(states, ["Illinois", "Missouri", "Ohio"]);
    }

    #[test]
    fn state_match_and_diacritics_add_up() {
        let r = ranker();
        let konak = place("Konak", Some("İzmir"), "TR", 38.41, 27.13);
        let izmir = place("İzmir", None, "TR", 38.42, 27.14);
        let sisli = place("Şişli", None, "TR", 41.06, 28.98);

        assert_eq!(r.score(&konak, "zmir"), STATE_CONTAINS);
        assert_eq!(r.score(&sisli, "sisli"), FOLDED_CONTAINS);
        assert_eq!(r.score(&sisli, " Şişli "), 100 + 50 + 25 + 10);
        // "İzmir" lower-cases with a combining dot, so only the folded form matches
        assert_eq!(r.score(&izmir, "izmir"), FOLDED_CONTAINS);
    }

    #[test]
    fn popular_bonus_applies_only_at_home() {
        let r = ranker();
        let home = place("Bursa", None, "TR", 40.19, 29.06);
        let abroad = place("Bursa", None, "XX", 10.0, 10.0);

        assert_eq!(r.score(&home, "bur") - r.score(&abroad, "bur"), POPULAR_CITY);
    }

    #[test]
    fn results_are_capped() {
        let candidates: Vec<_> = (0..20)
            .map(|i| place(&format!("Ankara {i}"), None, "TR", f64::from(i), 0.0))
            .collect();

        let ranked = ranker().rank(candidates, "ankara");
        assert_eq!(ranked.len(), 8);
    }

    #[test]
    fn fold_diacritics_maps_turkish_letters() {
        assert_eq!(fold_diacritics("çığöşü"), "cigosu");
        assert_eq!(fold_diacritics(&"İstanbul".to_lowercase()), "istanbul");
        assert_eq!(fold_diacritics("essen"), "essen");
    }
}
