use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{geolocation::GeolocationOptions, model::Coordinates};

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "SKYVIEW_API_KEY";

/// Tuning for location search and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results from this country always sort first.
    pub home_country: String,
    /// Appended as `"<query>, <hint>"` to widen recall for the home region.
    /// An empty hint disables the region-biased lookup.
    pub region_hint: String,
    /// Lower-case names that get a small bonus inside the home country.
    pub popular_cities: Vec<String>,
    pub max_suggestions: usize,
    pub direct_limit: usize,
    pub region_limit: usize,
    pub min_query_len: usize,
    pub debounce_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            home_country: "TR".to_string(),
            region_hint: "Turkey".to_string(),
            popular_cities: ["istanbul", "ankara", "izmir", "bursa", "antalya", "kocaeli"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            max_suggestions: 8,
            direct_limit: 15,
            region_limit: 10,
            min_query_len: 2,
            debounce_ms: 300,
            cache_ttl_secs: 600,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX))
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// lang = "tr"
///
/// [search]
/// home_country = "TR"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather API key.
    pub api_key: Option<String>,
    pub units: String,
    pub lang: String,
    /// Used when the device position cannot be determined.
    pub default_location: Coordinates,
    pub search: SearchConfig,
    pub geolocation_timeout_secs: u64,
    pub geolocation_max_age_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            units: "metric".to_string(),
            lang: "tr".to_string(),
            default_location: Coordinates::new(41.0082, 28.9784),
            search: SearchConfig::default(),
            geolocation_timeout_secs: 10,
            geolocation_max_age_secs: 300,
        }
    }
}

impl Config {
    /// API key from the environment, falling back to the stored one.
    pub fn api_key(&self) -> Result<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref()).ok_or_else(
            || {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `skyview configure` or set {API_KEY_ENV}."
                )
            },
        )
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn geolocation_options(&self) -> GeolocationOptions {
        GeolocationOptions {
            high_accuracy: true,
            timeout: Duration::from_secs(self.geolocation_timeout_secs),
            max_age: Duration::from_secs(self.geolocation_max_age_secs),
        }
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skyview", "skyview")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn resolve_api_key(from_env: Option<String>, stored: Option<&str>) -> Option<String> {
    from_env
        .filter(|key| !key.trim().is_empty())
        .or_else(|| stored.map(str::to_string))
        .filter(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_behaviour() {
        let cfg = Config::default();

        assert_eq!(cfg.units, "metric");
        assert_eq!(cfg.search.home_country, "TR");
        assert_eq!(cfg.search.max_suggestions, 8);
        assert_eq!(cfg.search.min_query_len, 2);
        assert_eq!(cfg.search.cache_ttl(), chrono::Duration::minutes(10));
        assert_eq!(cfg.geolocation_options().timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_key_takes_precedence_over_stored_key() {
        let key = resolve_api_key(Some("ENV".into()), Some("STORED"));
        assert_eq!(key.as_deref(), Some("ENV"));
    }

    #[test]
    fn blank_env_key_falls_back_to_stored_key() {
        let key = resolve_api_key(Some("  ".into()), Some("STORED"));
        assert_eq!(key.as_deref(), Some("STORED"));
        assert_eq!(resolve_api_key(None, None), None);
        assert_eq!(resolve_api_key(None, Some("")), None);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("defaults");

        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.search, SearchConfig::default());
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        cfg.search.home_country = "DE".into();
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.api_key.as_deref(), Some("OPEN_KEY"));
        assert_eq!(loaded.search.home_country, "DE");
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "lang = \"en\"\n[search]\nmax_suggestions = 5\n").expect("write");

        let cfg = Config::load_from(&path).expect("load");
        assert_eq!(cfg.lang, "en");
        assert_eq!(cfg.search.max_suggestions, 5);
        assert_eq!(cfg.search.region_hint, "Turkey");
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = [").expect("write");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
