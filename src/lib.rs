//! `SmartCommute` - commute travel-time prediction and departure planning
//!
//! This library predicts travel-time quantiles for a departure condition,
//! searches for the latest departure that still arrives on time at a chosen
//! confidence, and estimates late-arrival risk across departure times and
//! weather. Live route and forecast lookups adapt predictions to a route.

pub mod advisor;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod optimizer;
pub mod predictor;
pub mod routing;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use advisor::{CommuteAdvisor, RouteResolution, TomorrowBriefing};
pub use config::CommuteConfig;
pub use error::CommuteError;
pub use models::{ClockTime, CommuteDay, Condition, DailyForecast, Location, WeatherCategory};
pub use optimizer::{
    DepartureQuery, DistanceScale, Recommendation, RiskGrid, SearchWindow, build_risk_grid,
    find_optimal_departure,
};
pub use predictor::{QuantileLevel, QuantilePredictor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, CommuteError>;
