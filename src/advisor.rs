//! Commute advisor: ties the predictor to live route and weather data
//!
//! Collaborator failures never fail a query here. An unresolvable route falls
//! back to the reference route, a missing forecast simply yields no briefing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::{RouteConfig, SearchConfig};
use crate::models::{ClockTime, CommuteDay, DailyForecast, Location, WeatherCategory, forecast};
use crate::optimizer::{DepartureQuery, DistanceScale, Recommendation, find_optimal_departure};
use crate::predictor::{QuantileLevel, QuantilePredictor};
use crate::routing::{RouteInfo, RouteProvider};
use crate::weather::WeatherProvider;

/// Days requested when looking up the destination's forecast
pub const ROUTE_FORECAST_DAYS: u8 = 3;
const BRIEFING_CONFIDENCE: QuantileLevel = QuantileLevel::P95;

/// Route the predictions are made for, live or reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResolution {
    pub origin: String,
    pub destination: Location,
    pub distance_mi: f64,
    pub duration_min: f64,
    pub distance_scale: DistanceScale,
    /// False when the reference route was substituted
    pub live: bool,
    pub error: Option<String>,
}

impl RouteResolution {
    /// The reference route with the configured default destination
    #[must_use]
    pub fn fallback(origin: &str, route: &RouteConfig, error: Option<String>) -> Self {
        Self {
            origin: origin.to_string(),
            destination: route.default_destination(),
            distance_mi: route.baseline_distance_mi,
            duration_min: route.baseline_duration_min,
            distance_scale: DistanceScale::BASELINE,
            live: false,
            error,
        }
    }

    /// Scale a live route against the reference distance, or fall back to the
    /// reference route when the lookup failed
    #[must_use]
    pub fn from_route_info(origin: &str, info: RouteInfo, route: &RouteConfig) -> Self {
        match (info.success, info.distance_mi, info.duration_min, info.destination) {
            (true, Some(distance_mi), Some(duration_min), Some(resolved)) => {
                match DistanceScale::from_distances(distance_mi, route.baseline_distance_mi) {
                    Ok(distance_scale) => {
                        info!(distance_mi, %distance_scale, "route resolved");
                        Self {
                            origin: origin.to_string(),
                            destination: resolved,
                            distance_mi,
                            duration_min,
                            distance_scale,
                            live: true,
                            error: None,
                        }
                    }
                    Err(e) => {
                        warn!("unusable route distance: {e}");
                        Self::fallback(origin, route, Some(e.to_string()))
                    }
                }
            }
            _ => {
                let error = info.error.unwrap_or_else(|| "Route lookup failed".to_string());
                warn!(%error, "falling back to the reference route");
                Self::fallback(origin, route, Some(error))
            }
        }
    }

    /// "Atlanta → Gainesville"
    #[must_use]
    pub fn label(&self) -> String {
        let origin = self.origin.split(',').next().unwrap_or(&self.origin).trim();
        format!("{origin} → {}", self.destination.short_name())
    }
}

/// Tomorrow's commute at 95 % confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomorrowBriefing {
    pub forecast: DailyForecast,
    pub day: CommuteDay,
    pub arrive_by_eight: Recommendation,
    pub arrive_by_nine: Recommendation,
    /// How much earlier than on a clear day one must leave to arrive by 08:00
    pub weather_impact_minutes: Option<f64>,
}

/// Build tomorrow's briefing from its forecast. Weekends yield `None`.
pub fn tomorrow_briefing(
    predictor: &QuantilePredictor,
    tomorrow: &DailyForecast,
    distance_scale: DistanceScale,
) -> crate::Result<Option<TomorrowBriefing>> {
    let Some(day) = tomorrow.commute_day() else {
        return Ok(None);
    };
    let weather = tomorrow.weather_category;

    let recommend = |target: ClockTime, weather: WeatherCategory| {
        let query = DepartureQuery::new(target, day, weather, BRIEFING_CONFIDENCE)
            .with_distance_scale(distance_scale);
        find_optimal_departure(predictor, &query)
    };

    let eight = ClockTime::from_hm(8, 0)?;
    let nine = ClockTime::from_hm(9, 0)?;
    let arrive_by_eight = recommend(eight, weather)?;
    let arrive_by_nine = recommend(nine, weather)?;

    let weather_impact_minutes = if weather.is_wet() {
        let clear = recommend(eight, WeatherCategory::Clear)?;
        match (clear.recommended_departure, arrive_by_eight.recommended_departure) {
            (Some(clear_departure), Some(departure)) => {
                Some(clear_departure.minutes_since(departure)).filter(|delta| *delta > 0.0)
            }
            _ => None,
        }
    } else {
        None
    };

    Ok(Some(TomorrowBriefing {
        forecast: tomorrow.clone(),
        day,
        arrive_by_eight,
        arrive_by_nine,
        weather_impact_minutes,
    }))
}

/// Predictor plus collaborators, shared by the CLI and the HTTP layer
#[derive(Clone)]
pub struct CommuteAdvisor {
    predictor: Arc<QuantilePredictor>,
    routes: Arc<dyn RouteProvider>,
    weather: Arc<dyn WeatherProvider>,
    route: RouteConfig,
    search: SearchConfig,
}

impl CommuteAdvisor {
    pub fn new(
        predictor: Arc<QuantilePredictor>,
        routes: Arc<dyn RouteProvider>,
        weather: Arc<dyn WeatherProvider>,
        route: RouteConfig,
        search: SearchConfig,
    ) -> Self {
        Self {
            predictor,
            routes,
            weather,
            route,
            search,
        }
    }

    #[must_use]
    pub fn predictor(&self) -> &QuantilePredictor {
        &self.predictor
    }

    #[must_use]
    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    #[must_use]
    pub fn route_config(&self) -> &RouteConfig {
        &self.route
    }

    /// Resolve the route between two addresses, substituting the reference route on failure
    #[instrument(skip(self))]
    pub async fn resolve_route(&self, origin: &str, destination: &str) -> RouteResolution {
        let info = self.routes.driving_info(origin, destination).await;
        RouteResolution::from_route_info(origin, info, &self.route)
    }

    /// Daily forecast for `location`; empty when unavailable
    pub async fn forecast(&self, location: &Location, days: u8) -> Vec<DailyForecast> {
        self.weather.daily_forecast(location, days).await
    }

    /// Address autocomplete
    pub async fn suggest_addresses(&self, query: &str, limit: usize) -> Vec<String> {
        self.routes.search_addresses(query, limit).await
    }

    /// Resolve the route, look up the destination's forecast and brief tomorrow's commute
    #[instrument(skip(self))]
    pub async fn tomorrow(
        &self,
        origin: &str,
        destination: &str,
    ) -> crate::Result<(RouteResolution, Option<TomorrowBriefing>)> {
        let route = self.resolve_route(origin, destination).await;
        let forecasts = self.forecast(&route.destination, ROUTE_FORECAST_DAYS).await;

        let briefing = match forecast::tomorrow(&forecasts) {
            Some(tomorrow) => tomorrow_briefing(&self.predictor, tomorrow, route.distance_scale)?,
            None => None,
        };
        Ok((route, briefing))
    }
}
