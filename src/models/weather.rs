//! WMO weather codes and their mapping onto model weather categories

use serde::{Deserialize, Serialize};

use super::WeatherCategory;

/// WMO weather interpretation code as reported by forecast services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherCode(pub u8);

impl WeatherCode {
    /// Convert weather code to human-readable description
    #[must_use]
    pub fn description(&self) -> String {
        let text = match self.0 {
            0 => "Clear sky",
            1 => "Mainly clear",
            2 => "Partly cloudy",
            3 => "Overcast",
            45 => "Fog",
            48 => "Rime fog",
            51 => "Light drizzle",
            53 => "Moderate drizzle",
            55 => "Dense drizzle",
            56 => "Freezing drizzle (light)",
            57 => "Freezing drizzle (dense)",
            61 => "Slight rain",
            63 => "Moderate rain",
            65 => "Heavy rain",
            66 => "Freezing rain (light)",
            67 => "Freezing rain (heavy)",
            71 => "Light snowfall",
            73 => "Moderate snowfall",
            75 => "Heavy snowfall",
            80 => "Slight rain showers",
            81 => "Moderate rain showers",
            82 => "Violent rain showers",
            95 => "Thunderstorm",
            96 => "Thunderstorm + hail",
            99 => "Severe thunderstorm + hail",
            code => return format!("Code {code}"),
        };
        text.to_string()
    }

    /// Driving-impact category. Snow is folded into the rain classes by
    /// intensity; unknown codes count as clear.
    #[must_use]
    pub fn category(&self) -> WeatherCategory {
        match self.0 {
            0..=3 | 71 => WeatherCategory::Clear,
            45 | 48 | 77 => WeatherCategory::Fog,
            51 | 53 | 55 | 56 | 57 | 61 | 63 | 66 | 73 | 80 | 81 | 85 => WeatherCategory::Rain,
            65 | 67 | 75 | 82 | 86 | 95 | 96 | 99 => WeatherCategory::HeavyRain,
            _ => WeatherCategory::Clear,
        }
    }
}
