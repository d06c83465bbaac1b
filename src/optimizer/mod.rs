//! Departure optimization on top of the quantile predictor

pub mod risk;
pub mod scaler;
pub mod search;

pub use risk::{RiskCell, RiskGrid, build_risk_grid, estimate_late_probability};
pub use scaler::{DistanceScale, TravelTimeScaler};
pub use search::{
    Candidate, DepartureQuery, Recommendation, SearchWindow, find_optimal_departure,
    find_optimal_departure_with,
};
