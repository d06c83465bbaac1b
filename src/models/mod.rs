//! Data models for the SmartCommute application
//!
//! This module contains the core value types organized by concern:
//! - Time: wall-clock times with "HH:MM" rendering
//! - Condition: commute day, weather category and the query condition
//! - Location: geographic coordinates and names
//! - Weather / Forecast: WMO codes and daily forecast records

pub mod condition;
pub mod forecast;
pub mod location;
pub mod time;
pub mod weather;

// Re-export all public types for convenient access
pub use condition::{CommuteDay, Condition, WeatherCategory};
pub use forecast::DailyForecast;
pub use location::Location;
pub use time::ClockTime;
pub use weather::WeatherCode;
