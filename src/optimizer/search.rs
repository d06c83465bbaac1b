//! Departure search: the latest departure that still arrives on time
//!
//! Candidates are scanned over the whole window in ascending departure order
//! and the best pointer is overwritten by every on-time candidate. Predicted
//! travel time is not monotonic in departure time (morning and evening peaks),
//! so the on-time region can be non-contiguous; a binary search or an early
//! exit could miss the latest on-time departure.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::scaler::{DistanceScale, TravelTimeScaler};
use crate::error::CommuteError;
use crate::models::{ClockTime, CommuteDay, Condition, WeatherCategory};
use crate::predictor::{QuantileLevel, QuantilePredictor};

/// Longest accepted search step
pub const MAX_STEP_MINUTES: u32 = 24 * 60;

/// Inclusive range of candidate departures at a fixed step.
/// Deserialization goes through [`SearchWindow::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct SearchWindow {
    start: ClockTime,
    end: ClockTime,
    step_minutes: u32,
}

#[derive(Deserialize)]
struct WindowBounds {
    start: ClockTime,
    end: ClockTime,
    step_minutes: u32,
}

impl TryFrom<WindowBounds> for SearchWindow {
    type Error = CommuteError;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end, bounds.step_minutes)
    }
}

impl Default for SearchWindow {
    /// 05:00 to 20:00 every 5 minutes
    fn default() -> Self {
        Self {
            start: ClockTime::from_seconds(5 * 3_600),
            end: ClockTime::from_seconds(20 * 3_600),
            step_minutes: 5,
        }
    }
}

impl SearchWindow {
    pub fn new(start: ClockTime, end: ClockTime, step_minutes: u32) -> crate::Result<Self> {
        if step_minutes == 0 || step_minutes > MAX_STEP_MINUTES {
            return Err(CommuteError::validation(format!(
                "search step must be between 1 and {MAX_STEP_MINUTES} minutes, got {step_minutes}"
            )));
        }
        if start > end {
            return Err(CommuteError::validation(format!(
                "search window start {start} is after its end {end}"
            )));
        }
        Ok(Self {
            start,
            end,
            step_minutes,
        })
    }

    #[must_use]
    pub fn start(&self) -> ClockTime {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> ClockTime {
        self.end
    }

    #[must_use]
    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    /// Candidate departures in ascending order. The last one is the final
    /// step at or before `end`, which equals `end` only when the step divides
    /// the window.
    pub fn departures(&self) -> impl Iterator<Item = ClockTime> + use<> {
        let end = self.end;
        let step = self.step_minutes;
        std::iter::successors(Some(self.start), move |current| Some(current.plus_minutes(step)))
            .take_while(move |departure| *departure <= end)
    }

    /// Number of candidate departures
    #[must_use]
    pub fn len(&self) -> usize {
        let Some(span) = self.end.seconds().checked_sub(self.start.seconds()) else {
            return 0;
        };
        let step = self.step_minutes.saturating_mul(60);
        span.checked_div(step).map_or(0, |steps| steps as usize + 1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inputs of one departure search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepartureQuery {
    pub target_arrival: ClockTime,
    pub day: CommuteDay,
    pub weather: WeatherCategory,
    pub confidence: QuantileLevel,
    #[serde(default)]
    pub window: SearchWindow,
    #[serde(default)]
    pub distance_scale: DistanceScale,
}

impl DepartureQuery {
    /// Query over the default window on the reference route
    #[must_use]
    pub fn new(
        target_arrival: ClockTime,
        day: CommuteDay,
        weather: WeatherCategory,
        confidence: QuantileLevel,
    ) -> Self {
        Self {
            target_arrival,
            day,
            weather,
            confidence,
            window: SearchWindow::default(),
            distance_scale: DistanceScale::BASELINE,
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: SearchWindow) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_distance_scale(mut self, distance_scale: DistanceScale) -> Self {
        self.distance_scale = distance_scale;
        self
    }
}

/// One evaluated departure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub departure: ClockTime,
    pub departure_hour_fraction: f64,
    /// Scaled travel minutes at the query's confidence level
    pub predicted_travel_min: f64,
    pub predicted_arrival: ClockTime,
    pub on_time: bool,
    /// Target minus predicted arrival; negative when late
    pub buffer_min: f64,
}

/// Evaluate a single departure against `target_arrival`
pub fn evaluate_candidate<S: TravelTimeScaler + ?Sized>(
    predictor: &QuantilePredictor,
    scaler: &S,
    departure: ClockTime,
    day: CommuteDay,
    weather: WeatherCategory,
    quantile: QuantileLevel,
    target_arrival: ClockTime,
) -> crate::Result<Candidate> {
    let condition = Condition::at(departure, day, weather);
    let raw_minutes = predictor.predict(&condition, quantile)?;
    let predicted_travel_min = scaler.scale(raw_minutes);
    let predicted_arrival = departure.plus_fractional_minutes(predicted_travel_min);

    Ok(Candidate {
        departure,
        departure_hour_fraction: condition.departure_hour_fraction,
        predicted_travel_min,
        predicted_arrival,
        on_time: predicted_arrival <= target_arrival,
        buffer_min: target_arrival.minutes_since(departure) - predicted_travel_min,
    })
}

/// Result of a departure search. The `recommended_*` fields are all `None`
/// when no candidate in the window is on time; that is a valid outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_departure: Option<ClockTime>,
    pub predicted_travel_min: Option<f64>,
    pub predicted_arrival: Option<ClockTime>,
    pub buffer_minutes: Option<f64>,
    pub confidence_level: QuantileLevel,
    pub target_arrival: ClockTime,
    pub day: CommuteDay,
    pub weather: WeatherCategory,
    /// Every scanned candidate in ascending departure order
    pub all_candidates: Vec<Candidate>,
}

impl Recommendation {
    fn from_scan(query: &DepartureQuery, candidates: Vec<Candidate>, best: Option<usize>) -> Self {
        let best = best.map(|index| candidates[index]);
        Self {
            recommended_departure: best.map(|c| c.departure),
            predicted_travel_min: best.map(|c| c.predicted_travel_min),
            predicted_arrival: best.map(|c| c.predicted_arrival),
            buffer_minutes: best.map(|c| c.buffer_min),
            confidence_level: query.confidence,
            target_arrival: query.target_arrival,
            day: query.day,
            weather: query.weather,
            all_candidates: candidates,
        }
    }

    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.recommended_departure.is_some()
    }

    /// The candidate the recommendation was taken from
    #[must_use]
    pub fn best_candidate(&self) -> Option<&Candidate> {
        let departure = self.recommended_departure?;
        self.all_candidates
            .iter()
            .find(|candidate| candidate.departure == departure)
    }

    #[must_use]
    pub fn on_time_count(&self) -> usize {
        self.all_candidates.iter().filter(|c| c.on_time).count()
    }
}

/// Find the latest on-time departure using the query's distance scale
pub fn find_optimal_departure(
    predictor: &QuantilePredictor,
    query: &DepartureQuery,
) -> crate::Result<Recommendation> {
    find_optimal_departure_with(predictor, query, &query.distance_scale)
}

/// Find the latest on-time departure with a custom travel-time correction
#[instrument(
    level = "debug",
    skip(predictor, query, scaler),
    fields(target = %query.target_arrival, day = %query.day, weather = %query.weather, confidence = %query.confidence)
)]
pub fn find_optimal_departure_with<S: TravelTimeScaler + ?Sized>(
    predictor: &QuantilePredictor,
    query: &DepartureQuery,
    scaler: &S,
) -> crate::Result<Recommendation> {
    let mut candidates = Vec::with_capacity(query.window.len());
    let mut best = None;

    for departure in query.window.departures() {
        let candidate = evaluate_candidate(
            predictor,
            scaler,
            departure,
            query.day,
            query.weather,
            query.confidence,
            query.target_arrival,
        )?;
        if candidate.on_time {
            best = Some(candidates.len());
        }
        candidates.push(candidate);
    }

    let recommendation = Recommendation::from_scan(query, candidates, best);
    debug!(
        candidates = recommendation.all_candidates.len(),
        on_time = recommendation.on_time_count(),
        recommended = ?recommendation.recommended_departure.map(|t| t.to_string()),
        "departure search complete"
    );
    Ok(recommendation)
}
