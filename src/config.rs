//! Configuration management for `SmartCommute`
//!
//! Handles loading configuration from a TOML file and `SMARTCOMMUTE_*`
//! environment variables, and validates every section before use.

use crate::CommuteError;
use crate::models::{ClockTime, Location};
use crate::optimizer::SearchWindow;
use crate::predictor::QuantileLevel;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommuteConfig {
    /// Persisted model artifacts
    pub model: ModelConfig,
    /// Reference route and fallback destination
    pub route: RouteConfig,
    /// Departure search defaults
    pub search: SearchConfig,
    /// External collaborators (geocoding, routing, weather)
    pub services: ServicesConfig,
    /// Response cache
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// HTTP server
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the quantile estimators, encoder and feature order
    #[serde(default = "default_model_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Distance of the route the model was fitted on, in miles
    #[serde(default = "default_baseline_distance")]
    pub baseline_distance_mi: f64,
    /// Typical duration of the reference route, in minutes
    #[serde(default = "default_baseline_duration")]
    pub baseline_duration_min: f64,
    #[serde(default = "default_destination_name")]
    pub default_destination_name: String,
    #[serde(default = "default_destination_latitude")]
    pub default_destination_latitude: f64,
    #[serde(default = "default_destination_longitude")]
    pub default_destination_longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_start")]
    pub start: ClockTime,
    #[serde(default = "default_search_end")]
    pub end: ClockTime,
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,
    /// Confidence used when a request does not name one
    #[serde(default = "default_confidence")]
    pub confidence: QuantileLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    #[serde(default = "default_osrm_url")]
    pub osrm_url: String,
    #[serde(default = "default_open_meteo_url")]
    pub open_meteo_url: String,
    /// Sent with every request; Nominatim rejects anonymous clients
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocode_timeout")]
    pub geocode_timeout_seconds: u32,
    #[serde(default = "default_address_search_timeout")]
    pub address_search_timeout_seconds: u32,
    #[serde(default = "default_route_timeout")]
    pub route_timeout_seconds: u32,
    #[serde(default = "default_weather_timeout")]
    pub weather_timeout_seconds: u32,
    /// Timezone forecasts are requested in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    #[serde(default = "default_route_ttl")]
    pub route_ttl_seconds: u64,
    #[serde(default = "default_weather_ttl")]
    pub weather_ttl_seconds: u64,
    #[serde(default = "default_address_search_ttl")]
    pub address_search_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions
fn default_model_dir() -> String {
    "models".to_string()
}

fn default_baseline_distance() -> f64 {
    54.0
}

fn default_baseline_duration() -> f64 {
    64.0
}

fn default_destination_name() -> String {
    "Gainesville, GA".to_string()
}

fn default_destination_latitude() -> f64 {
    34.2979
}

fn default_destination_longitude() -> f64 {
    -83.8241
}

fn default_search_start() -> ClockTime {
    SearchWindow::default().start()
}

fn default_search_end() -> ClockTime {
    SearchWindow::default().end()
}

fn default_step_minutes() -> u32 {
    SearchWindow::default().step_minutes()
}

fn default_confidence() -> QuantileLevel {
    QuantileLevel::P95
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_osrm_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_open_meteo_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_user_agent() -> String {
    concat!("SmartCommute/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_geocode_timeout() -> u32 {
    10
}

fn default_address_search_timeout() -> u32 {
    8
}

fn default_route_timeout() -> u32 {
    15
}

fn default_weather_timeout() -> u32 {
    10
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_forecast_days() -> u8 {
    3
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("smartcommute").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".smartcommute-cache".to_string())
}

fn default_route_ttl() -> u64 {
    3_600
}

fn default_weather_ttl() -> u64 {
    1_800
}

fn default_address_search_ttl() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: default_model_dir(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            baseline_distance_mi: default_baseline_distance(),
            baseline_duration_min: default_baseline_duration(),
            default_destination_name: default_destination_name(),
            default_destination_latitude: default_destination_latitude(),
            default_destination_longitude: default_destination_longitude(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start: default_search_start(),
            end: default_search_end(),
            step_minutes: default_step_minutes(),
            confidence: default_confidence(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            nominatim_url: default_nominatim_url(),
            osrm_url: default_osrm_url(),
            open_meteo_url: default_open_meteo_url(),
            user_agent: default_user_agent(),
            geocode_timeout_seconds: default_geocode_timeout(),
            address_search_timeout_seconds: default_address_search_timeout(),
            route_timeout_seconds: default_route_timeout(),
            weather_timeout_seconds: default_weather_timeout(),
            timezone: default_timezone(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            location: default_cache_location(),
            route_ttl_seconds: default_route_ttl(),
            weather_ttl_seconds: default_weather_ttl(),
            address_search_ttl_seconds: default_address_search_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl RouteConfig {
    /// Destination used when the requested one cannot be geocoded
    #[must_use]
    pub fn default_destination(&self) -> Location {
        Location::new(
            self.default_destination_latitude,
            self.default_destination_longitude,
            self.default_destination_name.clone(),
        )
    }
}

impl SearchConfig {
    pub fn window(&self) -> crate::Result<SearchWindow> {
        SearchWindow::new(self.start, self.end, self.step_minutes)
    }
}

impl ServicesConfig {
    #[must_use]
    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_seconds.into())
    }

    #[must_use]
    pub fn address_search_timeout(&self) -> Duration {
        Duration::from_secs(self.address_search_timeout_seconds.into())
    }

    #[must_use]
    pub fn route_timeout(&self) -> Duration {
        Duration::from_secs(self.route_timeout_seconds.into())
    }

    #[must_use]
    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_seconds.into())
    }
}

impl CacheConfig {
    #[must_use]
    pub fn route_ttl(&self) -> Duration {
        Duration::from_secs(self.route_ttl_seconds)
    }

    #[must_use]
    pub fn weather_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_ttl_seconds)
    }

    #[must_use]
    pub fn address_search_ttl(&self) -> Duration {
        Duration::from_secs(self.address_search_ttl_seconds)
    }
}

impl CommuteConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("smartcommute.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. SMARTCOMMUTE_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("SMARTCOMMUTE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: CommuteConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smartcommute").join("config.toml"))
    }

    /// Replace empty strings and zero values with defaults
    pub fn apply_defaults(&mut self) {
        if self.model.dir.is_empty() {
            self.model.dir = default_model_dir();
        }
        if self.route.default_destination_name.is_empty() {
            self.route.default_destination_name = default_destination_name();
        }
        if self.services.user_agent.is_empty() {
            self.services.user_agent = default_user_agent();
        }
        if self.services.geocode_timeout_seconds == 0 {
            self.services.geocode_timeout_seconds = default_geocode_timeout();
        }
        if self.services.address_search_timeout_seconds == 0 {
            self.services.address_search_timeout_seconds = default_address_search_timeout();
        }
        if self.services.route_timeout_seconds == 0 {
            self.services.route_timeout_seconds = default_route_timeout();
        }
        if self.services.weather_timeout_seconds == 0 {
            self.services.weather_timeout_seconds = default_weather_timeout();
        }
        if self.services.timezone.is_empty() {
            self.services.timezone = default_timezone();
        }
        if self.services.forecast_days == 0 {
            self.services.forecast_days = default_forecast_days();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.port == 0 {
            self.server.port = default_port();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_route()?;
        self.validate_search()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_route(&self) -> Result<()> {
        let route = &self.route;
        if !(route.baseline_distance_mi.is_finite() && route.baseline_distance_mi > 0.0) {
            return Err(CommuteError::config("Baseline route distance must be positive").into());
        }
        if !(route.baseline_duration_min.is_finite() && route.baseline_duration_min > 0.0) {
            return Err(CommuteError::config("Baseline route duration must be positive").into());
        }
        if !(-90.0..=90.0).contains(&route.default_destination_latitude)
            || !(-180.0..=180.0).contains(&route.default_destination_longitude)
        {
            return Err(CommuteError::config(
                "Default destination coordinates are out of range",
            )
            .into());
        }
        Ok(())
    }

    fn validate_search(&self) -> Result<()> {
        if self.search.step_minutes > 60 {
            return Err(CommuteError::config("Search step cannot exceed 60 minutes").into());
        }
        self.search
            .window()
            .map_err(|e| CommuteError::config(format!("Invalid search window: {e}")))?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            self.services.geocode_timeout_seconds,
            self.services.address_search_timeout_seconds,
            self.services.route_timeout_seconds,
            self.services.weather_timeout_seconds,
        ];
        if timeouts.iter().any(|t| *t > 60) {
            return Err(CommuteError::config("Service timeouts cannot exceed 60 seconds").into());
        }

        if self.services.forecast_days > 16 {
            return Err(CommuteError::config("Forecast days cannot exceed 16").into());
        }

        const ONE_WEEK: u64 = 7 * 24 * 3_600;
        let ttls = [
            self.cache.route_ttl_seconds,
            self.cache.weather_ttl_seconds,
            self.cache.address_search_ttl_seconds,
        ];
        if ttls.iter().any(|t| *t > ONE_WEEK) {
            return Err(CommuteError::config("Cache TTL cannot exceed one week").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(CommuteError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(CommuteError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Nominatim", &self.services.nominatim_url),
            ("OSRM", &self.services.osrm_url),
            ("Open-Meteo", &self.services.open_meteo_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CommuteError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CommuteConfig::default();
        assert_eq!(config.route.baseline_distance_mi, 54.0);
        assert_eq!(config.route.baseline_duration_min, 64.0);
        assert_eq!(config.search.step_minutes, 5);
        assert_eq!(config.search.confidence, QuantileLevel::P95);
        assert_eq!(config.services.route_timeout_seconds, 15);
        assert_eq!(config.cache.weather_ttl_seconds, 1_800);
        assert_eq!(config.server.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_search_window() {
        let window = CommuteConfig::default().search.window().unwrap();
        assert_eq!(window, SearchWindow::default());
        assert_eq!(window.start().to_string(), "05:00");
    }

    #[test]
    fn test_default_destination() {
        let destination = CommuteConfig::default().route.default_destination();
        assert_eq!(destination.latitude, 34.2979);
        assert_eq!(destination.longitude, -83.8241);
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = CommuteConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_timeout_range() {
        let mut config = CommuteConfig::default();
        config.services.route_timeout_seconds = 500;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("timeouts cannot exceed"));
    }

    #[test]
    fn test_config_validation_inverted_window() {
        let mut config = CommuteConfig::default();
        config.search.start = "21:00".parse().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_non_positive_baseline() {
        let mut config = CommuteConfig::default();
        config.route.baseline_distance_mi = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_zero_values() {
        let mut config = CommuteConfig::default();
        config.server.port = 0;
        config.model.dir.clear();
        config.apply_defaults();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.model.dir, "models");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[model]
dir = "/srv/models"

[search]
start = "06:00"
end = "09:30"
step_minutes = 10
confidence = 0.9

[server]
port = 9090
"#
        )
        .unwrap();

        let config = CommuteConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.model.dir, "/srv/models");
        assert_eq!(config.search.start.to_string(), "06:00");
        assert_eq!(config.search.step_minutes, 10);
        assert_eq!(config.search.confidence, QuantileLevel::P90);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.route.baseline_distance_mi, 54.0);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = CommuteConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("smartcommute"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
