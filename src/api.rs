//! JSON API over the commute advisor
//!
//! Request values arrive as strings and numbers and are validated here, so a
//! bad weather name or confidence level comes back as a 400 with a stable
//! error code rather than a generic deserialization failure.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::CommuteError;
use crate::advisor::{CommuteAdvisor, RouteResolution, TomorrowBriefing};
use crate::config::SearchConfig;
use crate::models::{ClockTime, CommuteDay, DailyForecast, Location, WeatherCategory};
use crate::optimizer::{
    DepartureQuery, DistanceScale, Recommendation, RiskGrid, SearchWindow, build_risk_grid,
    find_optimal_departure,
};
use crate::predictor::QuantileLevel;

const DEFAULT_SUGGESTIONS: usize = 5;
const MAX_FORECAST_DAYS: u8 = 16;

/// API error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// Error returned by handlers
#[derive(Debug)]
pub struct AppError(CommuteError);

impl From<CommuteError> for AppError {
    fn from(err: CommuteError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_rejected_request() {
            StatusCode::BAD_REQUEST
        } else {
            error!("request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ApiError {
            code: self.0.code().to_string(),
            message: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of `POST /api/departure`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepartureRequest {
    pub target_arrival: String,
    pub day: String,
    pub weather: String,
    pub confidence: Option<f64>,
    pub search_start: Option<String>,
    pub search_end: Option<String>,
    pub step_minutes: Option<u32>,
    pub distance_scale: Option<f64>,
}

impl DepartureRequest {
    /// Validate into a query, filling gaps from the configured search defaults
    pub fn into_query(self, defaults: &SearchConfig) -> crate::Result<DepartureQuery> {
        let target: ClockTime = self.target_arrival.parse()?;
        let day: CommuteDay = self.day.parse()?;
        let weather: WeatherCategory = self.weather.parse()?;
        let confidence = match self.confidence {
            Some(value) => QuantileLevel::try_from(value)?,
            None => defaults.confidence,
        };
        let start = match self.search_start {
            Some(s) => s.parse()?,
            None => defaults.start,
        };
        let end = match self.search_end {
            Some(s) => s.parse()?,
            None => defaults.end,
        };
        let step = self.step_minutes.unwrap_or(defaults.step_minutes);
        let window = SearchWindow::new(start, end, step)?;
        let distance_scale = match self.distance_scale {
            Some(ratio) => DistanceScale::new(ratio)?,
            None => DistanceScale::BASELINE,
        };

        Ok(DepartureQuery::new(target, day, weather, confidence)
            .with_window(window)
            .with_distance_scale(distance_scale))
    }
}

#[derive(Debug, Deserialize)]
pub struct RiskGridParams {
    pub target: String,
    pub distance_scale: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RouteParams {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub lat: f64,
    pub lon: f64,
    pub days: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct AddressParams {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomorrowResponse {
    pub route: RouteResolution,
    pub briefing: Option<TomorrowBriefing>,
}

pub fn router(advisor: CommuteAdvisor) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/departure", post(departure))
        .route("/risk-grid", get(risk_grid))
        .route("/route", get(route))
        .route("/tomorrow", get(tomorrow))
        .route("/forecast", get(forecast))
        .route("/addresses", get(addresses))
        .with_state(advisor)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

async fn departure(
    State(advisor): State<CommuteAdvisor>,
    Json(request): Json<DepartureRequest>,
) -> ApiResult<Recommendation> {
    let query = request.into_query(advisor.search_config())?;
    Ok(Json(find_optimal_departure(advisor.predictor(), &query)?))
}

async fn risk_grid(
    State(advisor): State<CommuteAdvisor>,
    Query(params): Query<RiskGridParams>,
) -> ApiResult<RiskGrid> {
    let target: ClockTime = params.target.parse()?;
    let scale = match params.distance_scale {
        Some(ratio) => DistanceScale::new(ratio)?,
        None => DistanceScale::BASELINE,
    };
    Ok(Json(build_risk_grid(advisor.predictor(), target, scale)?))
}

async fn route(
    State(advisor): State<CommuteAdvisor>,
    Query(params): Query<RouteParams>,
) -> Json<RouteResolution> {
    Json(advisor.resolve_route(&params.origin, &params.destination).await)
}

async fn tomorrow(
    State(advisor): State<CommuteAdvisor>,
    Query(params): Query<RouteParams>,
) -> ApiResult<TomorrowResponse> {
    let (route, briefing) = advisor.tomorrow(&params.origin, &params.destination).await?;
    Ok(Json(TomorrowResponse { route, briefing }))
}

async fn forecast(
    State(advisor): State<CommuteAdvisor>,
    Query(params): Query<ForecastParams>,
) -> ApiResult<Vec<DailyForecast>> {
    let days = params.days.unwrap_or(3);
    if days == 0 || days > MAX_FORECAST_DAYS {
        return Err(CommuteError::validation(format!(
            "days must be between 1 and {MAX_FORECAST_DAYS}"
        ))
        .into());
    }
    let location = Location::at(params.lat, params.lon);
    Ok(Json(advisor.forecast(&location, days).await))
}

async fn addresses(
    State(advisor): State<CommuteAdvisor>,
    Query(params): Query<AddressParams>,
) -> Json<Vec<String>> {
    let limit = params.limit.unwrap_or(DEFAULT_SUGGESTIONS);
    Json(advisor.suggest_addresses(&params.q, limit).await)
}
