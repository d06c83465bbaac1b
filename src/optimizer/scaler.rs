//! Route-distance correction of predicted travel time
//!
//! The model is fitted on one reference route. Scaling by the ratio of the
//! queried route's distance to the reference distance assumes travel time is
//! linear in distance, which does not hold for routes whose congestion or road
//! mix differs from the reference route. It is a coarse generalization only.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CommuteError;

/// Turns a raw model prediction into minutes for the queried route
pub trait TravelTimeScaler {
    fn scale(&self, raw_minutes: f64) -> f64;
}

/// Ratio of the queried route distance to the model's reference distance
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DistanceScale(f64);

impl DistanceScale {
    /// Reference route itself
    pub const BASELINE: DistanceScale = DistanceScale(1.0);

    pub fn new(ratio: f64) -> crate::Result<Self> {
        if ratio.is_finite() && ratio > 0.0 {
            Ok(Self(ratio))
        } else {
            Err(CommuteError::validation(format!(
                "distance scale must be a positive number, got {ratio}"
            )))
        }
    }

    /// `actual_distance / baseline_distance`, both in the same unit
    pub fn from_distances(actual_distance: f64, baseline_distance: f64) -> crate::Result<Self> {
        if !(baseline_distance.is_finite() && baseline_distance > 0.0) {
            return Err(CommuteError::validation(format!(
                "baseline distance must be positive, got {baseline_distance}"
            )));
        }
        Self::new(actual_distance / baseline_distance)
    }

    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.0
    }
}

impl Default for DistanceScale {
    fn default() -> Self {
        Self::BASELINE
    }
}

impl TravelTimeScaler for DistanceScale {
    fn scale(&self, raw_minutes: f64) -> f64 {
        raw_minutes * self.0
    }
}

impl fmt::Display for DistanceScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}

impl<'de> Deserialize<'de> for DistanceScale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        DistanceScale::new(raw).map_err(serde::de::Error::custom)
    }
}
