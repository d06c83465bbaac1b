//! Quantile travel-time predictor
//!
//! Wraps one fitted estimator per supported quantile level and evaluates the
//! estimator matching the requested level. Estimators are independent, so
//! predictions are not guaranteed to be monotonic across levels for a given
//! condition; callers compare levels at their own risk.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use super::encoder::{Feature, FeatureOrder, WeatherEncoder};
use crate::error::CommuteError;
use crate::models::{CommuteDay, Condition, WeatherCategory};

/// Quantile levels the model family is fitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuantileLevel {
    P50,
    P75,
    P90,
    P95,
}

impl QuantileLevel {
    /// All levels in ascending order
    pub const ALL: [QuantileLevel; 4] = [
        QuantileLevel::P50,
        QuantileLevel::P75,
        QuantileLevel::P90,
        QuantileLevel::P95,
    ];

    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            QuantileLevel::P50 => 0.50,
            QuantileLevel::P75 => 0.75,
            QuantileLevel::P90 => 0.90,
            QuantileLevel::P95 => 0.95,
        }
    }

    /// Whole percent, e.g. 95
    #[must_use]
    pub fn percent(&self) -> u8 {
        match self {
            QuantileLevel::P50 => 50,
            QuantileLevel::P75 => 75,
            QuantileLevel::P90 => 90,
            QuantileLevel::P95 => 95,
        }
    }
}

impl TryFrom<f64> for QuantileLevel {
    type Error = CommuteError;

    /// Exact match only; 0.99 is rejected rather than rounded to 0.95.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| (level.value() - value).abs() < 1e-9)
            .ok_or_else(|| CommuteError::invalid_quantile(value))
    }
}

impl fmt::Display for QuantileLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.value())
    }
}

impl Serialize for QuantileLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

impl<'de> Deserialize<'de> for QuantileLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        QuantileLevel::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Inference capability of one fitted estimator.
///
/// `features` is laid out in the model's feature order. Implementations must
/// be pure: the same input always yields the same output.
pub trait QuantileEstimator: Send + Sync {
    fn predict(&self, features: &[f64]) -> f64;
}

impl<F> QuantileEstimator for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn predict(&self, features: &[f64]) -> f64 {
        self(features)
    }
}

/// Fitted model family: one estimator per quantile level plus the feature encoding.
///
/// Immutable after construction; share it by reference (or `Arc`) across queries.
#[derive(Clone)]
pub struct QuantilePredictor {
    estimators: BTreeMap<QuantileLevel, Arc<dyn QuantileEstimator>>,
    encoder: WeatherEncoder,
    feature_order: FeatureOrder,
}

impl fmt::Debug for QuantilePredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantilePredictor")
            .field("levels", &self.estimators.keys().collect::<Vec<_>>())
            .field("encoder", &self.encoder)
            .field("feature_order", &self.feature_order)
            .finish()
    }
}

impl QuantilePredictor {
    /// Assemble a predictor. All four quantile levels must be present.
    pub fn new(
        estimators: BTreeMap<QuantileLevel, Arc<dyn QuantileEstimator>>,
        encoder: WeatherEncoder,
        feature_order: FeatureOrder,
    ) -> crate::Result<Self> {
        let missing: Vec<String> = QuantileLevel::ALL
            .iter()
            .filter(|level| !estimators.contains_key(level))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(CommuteError::model_unavailable(format!(
                "no estimator for quantile level(s) {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            estimators,
            encoder,
            feature_order,
        })
    }

    #[must_use]
    pub fn encoder(&self) -> &WeatherEncoder {
        &self.encoder
    }

    #[must_use]
    pub fn feature_order(&self) -> &FeatureOrder {
        &self.feature_order
    }

    /// Predicted travel minutes at `quantile` for `condition`. Never negative.
    pub fn predict(&self, condition: &Condition, quantile: QuantileLevel) -> crate::Result<f64> {
        let weather_code = self.encoder.encode(condition.weather)?;
        let features: Vec<f64> = self
            .feature_order
            .features()
            .iter()
            .map(|feature| match feature {
                Feature::DepartureHourFraction => condition.departure_hour_fraction,
                Feature::DayOfWeek => f64::from(condition.day.index()),
                Feature::Weather => f64::from(weather_code),
            })
            .collect();

        let estimator = self
            .estimators
            .get(&quantile)
            .ok_or_else(|| CommuteError::invalid_quantile(quantile.value()))?;

        let minutes = estimator.predict(&features).max(0.0);
        trace!(
            ?condition,
            quantile = quantile.value(),
            minutes,
            "predicted travel time"
        );
        Ok(minutes)
    }

    /// Loosely-typed entry point: validates the quantile and weather name first.
    pub fn predict_raw(
        &self,
        departure_hour_fraction: f64,
        day: CommuteDay,
        weather: &str,
        quantile: f64,
    ) -> crate::Result<f64> {
        let quantile = QuantileLevel::try_from(quantile)?;
        let weather: WeatherCategory = weather.parse()?;
        self.predict(
            &Condition::new(departure_hour_fraction, day, weather),
            quantile,
        )
    }
}
