//! Daily weather forecasts from Open-Meteo

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::cache;
use crate::config::{CacheConfig, ServicesConfig};
use crate::models::forecast;
use crate::models::{DailyForecast, Location};

/// Weather collaborator
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Daily forecasts starting today; empty when the service is unavailable
    async fn daily_forecast(&self, location: &Location, days: u8) -> Vec<DailyForecast>;

    /// Tomorrow's forecast, if the provider returned one
    async fn tomorrow(&self, location: &Location) -> Option<DailyForecast> {
        let forecasts = self.daily_forecast(location, 2).await;
        forecast::tomorrow(&forecasts).cloned()
    }
}

/// [`WeatherProvider`] backed by the Open-Meteo forecast API
pub struct OpenMeteoWeather {
    client: reqwest::Client,
    base_url: String,
    timezone: String,
    timeout: Duration,
    ttl: Duration,
}

impl OpenMeteoWeather {
    pub fn new(services: &ServicesConfig, cache: &CacheConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(services.user_agent.clone())
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: services.open_meteo_url.clone(),
            timezone: services.timezone.clone(),
            timeout: services.weather_timeout(),
            ttl: cache.weather_ttl(),
        })
    }

    fn forecast_url(&self, location: &Location, days: u8) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}\
             &daily=weather_code,precipitation_probability_max,temperature_2m_max,temperature_2m_min\
             &temperature_unit=fahrenheit&timezone={}&forecast_days={days}",
            self.base_url,
            location.latitude,
            location.longitude,
            urlencoding::encode(&self.timezone)
        )
    }

    async fn fetch(&self, location: &Location, days: u8) -> Result<Vec<DailyForecast>> {
        debug!("Calling Open-Meteo");
        let response: openmeteo::ForecastResponse = self
            .client
            .get(self.forecast_url(location, days))
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| "Failed to parse Open-Meteo forecast response")?;
        Ok(response.into_forecasts())
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    #[instrument(skip(self), fields(location = %location.format_coordinates()))]
    async fn daily_forecast(&self, location: &Location, days: u8) -> Vec<DailyForecast> {
        let key = location.cache_key(days);
        if let Some(cached) = cache::lookup::<Vec<DailyForecast>>(&key).await {
            return cached;
        }

        match self.fetch(location, days).await {
            Ok(forecasts) => {
                if !forecasts.is_empty() {
                    cache::store(&key, forecasts.clone(), self.ttl).await;
                }
                forecasts
            }
            Err(e) => {
                warn!("Weather API error: {e:#}");
                Vec::new()
            }
        }
    }
}

/// Open-Meteo response structures and conversion
mod openmeteo {
    use chrono::NaiveDate;
    use serde::Deserialize;
    use tracing::debug;

    use crate::models::{DailyForecast, WeatherCode};

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub daily: Option<DailyData>,
    }

    /// Column-oriented daily data; any value may be null
    #[derive(Debug, Default, Deserialize)]
    pub struct DailyData {
        #[serde(default)]
        pub time: Vec<String>,
        #[serde(default)]
        pub weather_code: Vec<Option<u8>>,
        #[serde(default)]
        pub precipitation_probability_max: Vec<Option<f64>>,
        #[serde(default, rename = "temperature_2m_max")]
        pub temperature_max: Vec<Option<f64>>,
        #[serde(default, rename = "temperature_2m_min")]
        pub temperature_min: Vec<Option<f64>>,
    }

    fn at<T: Copy>(column: &[Option<T>], i: usize) -> Option<T> {
        column.get(i).copied().flatten()
    }

    impl DailyData {
        fn row(&self, i: usize) -> Option<DailyForecast> {
            let date = NaiveDate::parse_from_str(self.time.get(i)?, "%Y-%m-%d").ok()?;
            let code = at(&self.weather_code, i)?;
            let precipitation = at(&self.precipitation_probability_max, i)?;
            let max = at(&self.temperature_max, i)?;
            let min = at(&self.temperature_min, i)?;
            Some(DailyForecast::new(
                date,
                WeatherCode(code),
                precipitation.round().clamp(0.0, 100.0) as u8,
                max,
                min,
            ))
        }
    }

    impl ForecastResponse {
        /// One record per complete row; incomplete rows are skipped
        pub fn into_forecasts(self) -> Vec<DailyForecast> {
            let daily = self.daily.unwrap_or_default();
            (0..daily.time.len())
                .filter_map(|i| {
                    let row = daily.row(i);
                    if row.is_none() {
                        debug!(row = i, "skipping incomplete forecast row");
                    }
                    row
                })
                .collect()
        }
    }
}
