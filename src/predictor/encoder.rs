//! Feature encoding persisted alongside the fitted estimators

use serde::{Deserialize, Serialize};

use crate::error::CommuteError;
use crate::models::WeatherCategory;

/// Label encoder for the weather feature: the label is the class's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherEncoder {
    classes: Vec<String>,
}

impl Default for WeatherEncoder {
    /// Classes sorted lexicographically, as the fitting pipeline stores them
    fn default() -> Self {
        Self::new(["Clear", "Fog", "Heavy Rain", "Rain"].map(String::from).to_vec())
    }
}

impl WeatherEncoder {
    #[must_use]
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Label for `category`, or `UnknownCategory` if the model never saw it
    pub fn encode(&self, category: WeatherCategory) -> crate::Result<u8> {
        self.classes
            .iter()
            .position(|class| class == category.name())
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| CommuteError::unknown_category(category.name()))
    }
}

/// Model input features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "departure_hour_frac")]
    DepartureHourFraction,
    #[serde(rename = "day_of_week_num")]
    DayOfWeek,
    #[serde(rename = "weather_enc")]
    Weather,
}

impl Feature {
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        match self {
            Feature::DepartureHourFraction => "departure_hour_frac",
            Feature::DayOfWeek => "day_of_week_num",
            Feature::Weather => "weather_enc",
        }
    }

    fn from_column_name(name: &str) -> Option<Self> {
        [Feature::DepartureHourFraction, Feature::DayOfWeek, Feature::Weather]
            .into_iter()
            .find(|feature| feature.column_name() == name)
    }
}

/// Column order the estimators expect their input vector in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureOrder {
    features: Vec<Feature>,
}

impl Default for FeatureOrder {
    fn default() -> Self {
        Self {
            features: vec![
                Feature::DepartureHourFraction,
                Feature::DayOfWeek,
                Feature::Weather,
            ],
        }
    }
}

impl FeatureOrder {
    /// Build from persisted column names. Unknown or duplicate columns mean
    /// the artifacts were produced for a different model and cannot be used.
    pub fn from_column_names<S: AsRef<str>>(names: &[S]) -> crate::Result<Self> {
        let mut features = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let feature = Feature::from_column_name(name).ok_or_else(|| {
                CommuteError::model_unavailable(format!("unsupported feature column '{name}'"))
            })?;
            if features.contains(&feature) {
                return Err(CommuteError::model_unavailable(format!(
                    "feature column '{name}' listed twice"
                )));
            }
            features.push(feature);
        }
        if features.is_empty() {
            return Err(CommuteError::model_unavailable("feature column list is empty"));
        }
        Ok(Self { features })
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels_are_sorted_class_indices() {
        let encoder = WeatherEncoder::default();
        assert_eq!(encoder.encode(WeatherCategory::Clear).unwrap(), 0);
        assert_eq!(encoder.encode(WeatherCategory::Fog).unwrap(), 1);
        assert_eq!(encoder.encode(WeatherCategory::HeavyRain).unwrap(), 2);
        assert_eq!(encoder.encode(WeatherCategory::Rain).unwrap(), 3);
    }

    #[test]
    fn test_encoder_rejects_category_it_was_not_fitted_on() {
        let encoder = WeatherEncoder::new(vec!["Clear".into(), "Rain".into()]);
        let err = encoder.encode(WeatherCategory::Fog).unwrap_err();
        assert!(matches!(err, CommuteError::UnknownCategory { .. }));
    }

    #[test]
    fn test_encoder_deserializes_from_plain_list() {
        let encoder: WeatherEncoder =
            serde_json::from_str(r#"["Clear", "Fog", "Heavy Rain", "Rain"]"#).unwrap();
        assert_eq!(encoder, WeatherEncoder::default());
    }

    #[test]
    fn test_feature_order_from_names() {
        let order = FeatureOrder::from_column_names(&[
            "weather_enc",
            "departure_hour_frac",
            "day_of_week_num",
        ])
        .unwrap();
        assert_eq!(order.features()[0], Feature::Weather);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_feature_order_rejects_unknown_and_duplicate_columns() {
        assert!(FeatureOrder::from_column_names(&["temperature"]).is_err());
        assert!(
            FeatureOrder::from_column_names(&["weather_enc", "weather_enc"]).is_err()
        );
        assert!(FeatureOrder::from_column_names::<&str>(&[]).is_err());
    }
}
