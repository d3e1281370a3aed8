use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use std::sync::Arc;

use skyview_core::{
    Config, Dashboard, IpPositionSource, RankedLocation, ResponseCache, SearchController,
    SystemClock, WeatherReport, WeatherService,
    provider::provider_from_config,
    weather::{FORECAST_DAYS, daily_forecast, format_temperature, theme},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyview", version, about = "Weather dashboard with location search")]
pub struct Cli {
    /// Print debug logs to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and home country.
    Configure,

    /// List ranked location suggestions for a query.
    Search {
        /// Free-text place name, e.g. "Kocaeli".
        query: String,
    },

    /// Show current weather and forecast.
    Show {
        /// Place to search for; the current position is used when absent.
        query: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Search { query } => {
                let app = App::new(Config::load()?)?;
                let suggestions = app.suggest(&query).await?;
                print_suggestions(&query, &suggestions);
                Ok(())
            }
            Command::Show { query } => {
                let mut app = App::new(Config::load()?)?;
                let report = match query {
                    Some(query) => app.show_search_result(&query).await?,
                    None => app
                        .dashboard
                        .locate_and_refresh(&app.search)
                        .await
                        .context("Could not load weather data")?,
                };
                print_report(report);
                Ok(())
            }
        }
    }
}

struct App {
    config: Config,
    search: SearchController,
    dashboard: Dashboard,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let client = Arc::new(provider_from_config(&config)?);
        let ttl = config.search.cache_ttl();

        let search_cache = Arc::new(ResponseCache::new(ttl, Arc::new(SystemClock)));
        let search = SearchController::from_config(
            &config,
            client.clone(),
            search_cache,
            Arc::new(IpPositionSource::default()),
        );

        let weather = WeatherService::new(client, ttl, Arc::new(SystemClock));
        let dashboard = Dashboard::new(weather, config.default_location);

        Ok(Self {
            config,
            search,
            dashboard,
        })
    }

    /// Feed `query` to the controller and wait for its suggestions.
    async fn suggest(&self, query: &str) -> Result<Vec<RankedLocation>> {
        let min = self.config.search.min_query_len;
        if query.chars().count() < min {
            bail!("Type at least {min} characters to search.");
        }

        let mut updates = self.search.subscribe();
        self.search.on_query_changed(query);

        let snapshot = updates
            .wait_for(|s| s.suggestions_visible && !s.is_loading)
            .await
            .context("Search controller stopped unexpectedly")?;
        Ok(snapshot.suggestions.clone())
    }

    async fn show_search_result(&mut self, query: &str) -> Result<&WeatherReport> {
        let mut suggestions = self.suggest(query).await?;

        let choice = match suggestions.len() {
            0 => bail!("No locations found for '{query}'."),
            1 => suggestions.remove(0),
            _ => Select::new("Pick a location:", suggestions).prompt()?,
        };

        let at = self.search.select_location(&choice.location);
        self.dashboard.refresh(at).await.context("Could not load weather data")
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    let home_country = Text::new("Home country (ISO 3166 alpha-2):")
        .with_default(&config.search.home_country)
        .prompt()?;

    config.set_api_key(api_key.trim().to_string());
    config.search.home_country = home_country.trim().to_uppercase();

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn print_suggestions(query: &str, suggestions: &[RankedLocation]) {
    if suggestions.is_empty() {
        println!("No locations found for '{query}'.");
        return;
    }

    for (i, suggestion) in suggestions.iter().enumerate() {
        println!(
            "{:>2}. {:<40} {:>9.4}, {:>9.4}  score {}",
            i + 1,
            suggestion.to_string(),
            suggestion.location.lat,
            suggestion.location.lon,
            suggestion.relevance_score,
        );
    }
}

fn print_report(report: &WeatherReport) {
    let current = &report.current;
    let time = |t: chrono::DateTime<chrono::Utc>| t.with_timezone(&Local).format("%H:%M");

    let period = if current.is_day() { "day" } else { "night" };
    println!(
        "{} ({}), {} [{}]",
        current.location_name,
        report.coordinates,
        period,
        theme(&current.condition, current.is_day()),
    );
    println!(
        "  {} {}, feels like {}",
        format_temperature(current.temperature),
        current.description,
        format_temperature(current.feels_like),
    );
    println!(
        "  humidity {}%  wind {:.1} m/s  pressure {} hPa",
        current.humidity_pct, current.wind_speed, current.pressure_hpa,
    );
    if let Some(visibility) = current.visibility_m {
        println!("  visibility {:.1} km", f64::from(visibility) / 1000.0);
    }
    println!("  sunrise {}  sunset {}", time(current.sunrise), time(current.sunset));

    println!();
    for day in daily_forecast(&report.forecast, &Local, FORECAST_DAYS) {
        println!(
            "  {}  {:>4}  ({} / {})  {}",
            day.time.with_timezone(&Local).format("%a %d %b"),
            format_temperature(day.temperature),
            format_temperature(day.temp_min),
            format_temperature(day.temp_max),
            day.description,
        );
    }
}
