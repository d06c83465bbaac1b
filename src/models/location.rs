//! Geocoded points used as route endpoints and forecast targets

use serde::{Deserialize, Serialize};

/// Geographic point with a human-readable name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Display name as returned by the geocoder (or the query itself)
    pub name: String,
}

impl Location {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: String) -> Self {
        Self {
            latitude,
            longitude,
            name,
        }
    }

    /// Unnamed point labelled by its own coordinates
    #[must_use]
    pub fn at(latitude: f64, longitude: f64) -> Self {
        let mut location = Self::new(latitude, longitude, String::new());
        location.name = location.format_coordinates();
        location
    }

    /// `lat, lon` with four decimals
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Short label: the part of the name before the first comma
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.split(',').next().unwrap_or(&self.name).trim()
    }

    /// Forecast cache key; points within ~1 km share an entry
    #[must_use]
    pub fn cache_key(&self, days: u8) -> String {
        format!(
            "forecast:{:.2}:{:.2}:{days}",
            snap(self.latitude),
            snap(self.longitude)
        )
    }
}

fn snap(degrees: f64) -> f64 {
    (degrees * 100.0).round() / 100.0
}
