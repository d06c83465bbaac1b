mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use smartcommute::config::{RouteConfig, SearchConfig};
use smartcommute::models::WeatherCode;
use smartcommute::routing::{RouteLeg, RouteProvider};
use smartcommute::weather::WeatherProvider;
use smartcommute::{CommuteAdvisor, DailyForecast, Location, web};
use tower::ServiceExt;

struct OfflineRoutes;

#[async_trait]
impl RouteProvider for OfflineRoutes {
    async fn geocode(&self, _address: &str) -> Option<Location> {
        None
    }

    async fn search_addresses(&self, query: &str, _limit: usize) -> Vec<String> {
        if query.trim().len() < 3 {
            Vec::new()
        } else {
            vec![format!("{query}, Georgia, United States")]
        }
    }

    async fn route(&self, _origin: &Location, _destination: &Location) -> anyhow::Result<RouteLeg> {
        anyhow::bail!("offline")
    }
}

struct FixedWeather;

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn daily_forecast(&self, _location: &Location, days: u8) -> Vec<DailyForecast> {
        // Thursday 2026-10-15 then Friday 2026-10-16 with heavy rain
        let start = chrono::NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        [WeatherCode(1), WeatherCode(65), WeatherCode(45)]
            .into_iter()
            .enumerate()
            .take(days.into())
            .map(|(i, code)| {
                DailyForecast::new(start + chrono::Days::new(i as u64), code, 30, 68.0, 51.0)
            })
            .collect()
    }
}

fn app() -> axum::Router {
    let advisor = CommuteAdvisor::new(
        Arc::new(common::predictor()),
        Arc::new(OfflineRoutes),
        Arc::new(FixedWeather),
        RouteConfig::default(),
        SearchConfig::default(),
    );
    web::app(advisor)
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    send(Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_departure_recommendation() {
    let (status, body) = post_json(
        "/api/departure",
        json!({"target_arrival": "08:30", "day": "Wednesday", "weather": "Clear", "confidence": 0.95}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommended_departure"], "07:00");
    assert_eq!(body["predicted_arrival"], "08:10");
    assert_eq!(body["confidence_level"], 0.95);
    assert_eq!(body["all_candidates"].as_array().unwrap().len(), 181);
}

#[tokio::test]
async fn test_infeasible_departure_is_not_an_error() {
    let (status, body) = post_json(
        "/api/departure",
        json!({"target_arrival": "05:10", "day": "Monday", "weather": "Fog"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["recommended_departure"].is_null());
    assert!(body["buffer_minutes"].is_null());
}

#[tokio::test]
async fn test_unsupported_confidence_is_bad_request() {
    let (status, body) = post_json(
        "/api/departure",
        json!({"target_arrival": "08:30", "day": "Wednesday", "weather": "Clear", "confidence": 0.99}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUANTILE");
}

#[tokio::test]
async fn test_unknown_weather_is_bad_request() {
    let (status, body) = post_json(
        "/api/departure",
        json!({"target_arrival": "08:30", "day": "Wednesday", "weather": "Snow"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_CATEGORY");
}

#[tokio::test]
async fn test_out_of_range_search_step_is_bad_request() {
    for step in [0, 1_441, 80_000_000] {
        let (status, body) = post_json(
            "/api/departure",
            json!({"target_arrival": "08:30", "day": "Wednesday", "weather": "Clear", "step_minutes": step}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "step {step}");
        assert_eq!(body["code"], "VALIDATION");
    }
}

#[tokio::test]
async fn test_inverted_search_window_is_bad_request() {
    let (status, body) = post_json(
        "/api/departure",
        json!({
            "target_arrival": "08:30", "day": "Wednesday", "weather": "Clear",
            "search_start": "20:00", "search_end": "05:00"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_day_long_step_scans_one_candidate() {
    let (status, body) = post_json(
        "/api/departure",
        json!({"target_arrival": "08:30", "day": "Wednesday", "weather": "Clear", "step_minutes": 1_440}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["all_candidates"].as_array().unwrap().len(), 1);
    assert_eq!(body["recommended_departure"], "05:00");
}

#[tokio::test]
async fn test_risk_grid() {
    let (status, body) = get("/api/risk-grid?target=08:30&distance_scale=1.0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target_arrival"], "08:30");
    let cells = body["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 256);
    assert_eq!(cells[0]["departure"], "05:00");
    assert_eq!(cells[0]["weather"], "Clear");
    assert_eq!(cells[255]["weather"], "Heavy Rain");
}

#[tokio::test]
async fn test_risk_grid_rejects_bad_target() {
    let (status, body) = get("/api/risk-grid?target=25:99").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_route_falls_back_when_offline() {
    let (status, body) = get("/api/route?origin=Atlanta&destination=Gainesville").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["live"], false);
    assert_eq!(body["distance_mi"], 54.0);
    assert_eq!(body["distance_scale"], 1.0);
}

#[tokio::test]
async fn test_tomorrow_briefing() {
    let (status, body) = get("/api/tomorrow?origin=Atlanta&destination=Gainesville").await;
    assert_eq!(status, StatusCode::OK);

    let briefing = &body["briefing"];
    assert_eq!(briefing["day"], "Friday");
    assert_eq!(briefing["forecast"]["weather_category"], "Heavy Rain");
    // Friday heavy rain: 70 - 3 + 20 = 87 minutes before the morning peak
    assert_eq!(briefing["arrive_by_eight"]["recommended_departure"], "06:30");
    // clear Friday leaves at 06:50
    assert_eq!(briefing["weather_impact_minutes"], 20.0);
}

#[tokio::test]
async fn test_forecast_and_addresses() {
    let (status, body) = get("/api/forecast?lat=34.2979&lon=-83.8241&days=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get("/api/forecast?lat=34.2979&lon=-83.8241&days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, body) = get("/api/addresses?q=Ga").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}
