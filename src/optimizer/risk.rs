//! Late-arrival risk grid over departure slots and weather categories

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::scaler::DistanceScale;
use super::search::evaluate_candidate;
use crate::models::{ClockTime, CommuteDay, WeatherCategory};
use crate::predictor::{QuantileLevel, QuantilePredictor};

/// First slot of the grid, 05:00
pub const GRID_FIRST_HOUR: u32 = 5;
/// Last hour with slots, up to 20:45
pub const GRID_LAST_HOUR: u32 = 20;
pub const GRID_SLOT_MINUTES: u32 = 15;
/// The grid is computed for a representative mid-week day
pub const GRID_DAY: CommuteDay = CommuteDay::Wednesday;

/// Fixed lateness probabilities keyed by the lowest quantile level that is
/// predicted late. Arrivals are non-decreasing in the level, so the lowest
/// late level bounds the chance of being late from below.
const LATE_PROBABILITY_TABLE: [(QuantileLevel, f64); 4] = [
    (QuantileLevel::P50, 0.70),
    (QuantileLevel::P75, 0.35),
    (QuantileLevel::P90, 0.15),
    (QuantileLevel::P95, 0.07),
];
const ALL_ON_TIME_PROBABILITY: f64 = 0.02;

/// Departure slots of the grid: every 15 minutes from 05:00 to 20:45
pub fn grid_departures() -> impl Iterator<Item = ClockTime> {
    (GRID_FIRST_HOUR..=GRID_LAST_HOUR).flat_map(|hour| {
        (0..60)
            .step_by(GRID_SLOT_MINUTES as usize)
            .map(move |minute| ClockTime::from_seconds(hour * 3_600 + minute * 60))
    })
}

/// Map per-level lateness flags, ordered as [`QuantileLevel::ALL`], to a
/// probability of arriving late.
#[must_use]
pub fn estimate_late_probability(late: &[bool; 4]) -> f64 {
    LATE_PROBABILITY_TABLE
        .iter()
        .zip(late)
        .find(|(_, is_late)| **is_late)
        .map_or(ALL_ON_TIME_PROBABILITY, |((_, probability), _)| *probability)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskCell {
    pub departure: ClockTime,
    pub weather: WeatherCategory,
    pub late_probability: f64,
}

/// Risk for every weather category and departure slot.
///
/// Cells are weather-major: all slots for Clear, then Fog, Rain, Heavy Rain,
/// each in ascending departure order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskGrid {
    pub target_arrival: ClockTime,
    pub cells: Vec<RiskCell>,
}

impl RiskGrid {
    /// Cells for one weather category in departure order
    pub fn for_weather(&self, weather: WeatherCategory) -> impl Iterator<Item = &RiskCell> {
        self.cells.iter().filter(move |cell| cell.weather == weather)
    }

    /// Latest departure under `weather` whose late probability is at most `max_risk`
    #[must_use]
    pub fn latest_departure_within(
        &self,
        weather: WeatherCategory,
        max_risk: f64,
    ) -> Option<ClockTime> {
        self.for_weather(weather)
            .filter(|cell| cell.late_probability <= max_risk)
            .map(|cell| cell.departure)
            .max()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Build the risk grid for `target_arrival` on the representative day
#[instrument(level = "debug", skip(predictor))]
pub fn build_risk_grid(
    predictor: &QuantilePredictor,
    target_arrival: ClockTime,
    distance_scale: DistanceScale,
) -> crate::Result<RiskGrid> {
    let departures: Vec<ClockTime> = grid_departures().collect();
    let mut cells = Vec::with_capacity(WeatherCategory::ALL.len() * departures.len());

    for weather in WeatherCategory::ALL {
        for &departure in &departures {
            let mut late = [false; 4];
            for (flag, level) in late.iter_mut().zip(QuantileLevel::ALL) {
                let candidate = evaluate_candidate(
                    predictor,
                    &distance_scale,
                    departure,
                    GRID_DAY,
                    weather,
                    level,
                    target_arrival,
                )?;
                *flag = !candidate.on_time;
            }
            cells.push(RiskCell {
                departure,
                weather,
                late_probability: estimate_late_probability(&late),
            });
        }
    }

    debug!(cells = cells.len(), "risk grid built");
    Ok(RiskGrid {
        target_arrival,
        cells,
    })
}
