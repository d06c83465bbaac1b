//! Query conditions: commute day and weather category

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommuteError;
use crate::models::ClockTime;

/// Weekday the model was fitted on. Weekends are outside the model's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommuteDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl CommuteDay {
    pub const ALL: [CommuteDay; 5] = [
        CommuteDay::Monday,
        CommuteDay::Tuesday,
        CommuteDay::Wednesday,
        CommuteDay::Thursday,
        CommuteDay::Friday,
    ];

    /// Model feature value, 0 = Monday
    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            CommuteDay::Monday => 0,
            CommuteDay::Tuesday => 1,
            CommuteDay::Wednesday => 2,
            CommuteDay::Thursday => 3,
            CommuteDay::Friday => 4,
        }
    }

    pub fn from_index(index: u8) -> crate::Result<Self> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| {
                CommuteError::validation(format!(
                    "day index {index} is outside Monday (0) to Friday (4)"
                ))
            })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CommuteDay::Monday => "Monday",
            CommuteDay::Tuesday => "Tuesday",
            CommuteDay::Wednesday => "Wednesday",
            CommuteDay::Thursday => "Thursday",
            CommuteDay::Friday => "Friday",
        }
    }
}

impl TryFrom<chrono::Weekday> for CommuteDay {
    type Error = CommuteError;

    fn try_from(value: chrono::Weekday) -> Result<Self, Self::Error> {
        match value {
            chrono::Weekday::Mon => Ok(CommuteDay::Monday),
            chrono::Weekday::Tue => Ok(CommuteDay::Tuesday),
            chrono::Weekday::Wed => Ok(CommuteDay::Wednesday),
            chrono::Weekday::Thu => Ok(CommuteDay::Thursday),
            chrono::Weekday::Fri => Ok(CommuteDay::Friday),
            chrono::Weekday::Sat | chrono::Weekday::Sun => Err(CommuteError::validation(
                format!("{value} is a weekend day; only weekdays are supported"),
            )),
        }
    }
}

impl fmt::Display for CommuteDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommuteDay {
    type Err = CommuteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|day| {
                let name = day.name().to_ascii_lowercase();
                name == wanted || name[..3] == wanted
            })
            .ok_or_else(|| {
                CommuteError::validation(format!("'{s}' is not a weekday (Monday to Friday)"))
            })
    }
}

/// Weather categories the travel-time model distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeatherCategory {
    Clear,
    Rain,
    #[serde(rename = "Heavy Rain")]
    HeavyRain,
    Fog,
}

impl WeatherCategory {
    /// Display order used by the risk grid
    pub const ALL: [WeatherCategory; 4] = [
        WeatherCategory::Clear,
        WeatherCategory::Fog,
        WeatherCategory::Rain,
        WeatherCategory::HeavyRain,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            WeatherCategory::Clear => "Clear",
            WeatherCategory::Rain => "Rain",
            WeatherCategory::HeavyRain => "Heavy Rain",
            WeatherCategory::Fog => "Fog",
        }
    }

    #[must_use]
    pub fn is_wet(&self) -> bool {
        matches!(self, WeatherCategory::Rain | WeatherCategory::HeavyRain)
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeatherCategory {
    type Err = CommuteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CommuteError::unknown_category(s))
    }
}

/// One travel-time query: when, which weekday, what weather
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Fractional hour of departure, expected in [0, 24)
    pub departure_hour_fraction: f64,
    pub day: CommuteDay,
    pub weather: WeatherCategory,
}

impl Condition {
    #[must_use]
    pub fn new(departure_hour_fraction: f64, day: CommuteDay, weather: WeatherCategory) -> Self {
        Self {
            departure_hour_fraction,
            day,
            weather,
        }
    }

    #[must_use]
    pub fn at(departure: ClockTime, day: CommuteDay, weather: WeatherCategory) -> Self {
        Self::new(departure.hour_fraction(), day, weather)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Wednesday", CommuteDay::Wednesday)]
    #[case("wed", CommuteDay::Wednesday)]
    #[case("FRIDAY", CommuteDay::Friday)]
    #[case("Mon", CommuteDay::Monday)]
    fn test_parse_day(#[case] input: &str, #[case] expected: CommuteDay) {
        assert_eq!(input.parse::<CommuteDay>().unwrap(), expected);
    }

    #[test]
    fn test_weekend_is_out_of_domain() {
        assert!("Saturday".parse::<CommuteDay>().is_err());
        assert!(CommuteDay::try_from(chrono::Weekday::Sun).is_err());
        assert_eq!(
            CommuteDay::try_from(chrono::Weekday::Thu).unwrap(),
            CommuteDay::Thursday
        );
    }

    #[test]
    fn test_day_index_round_trip() {
        for day in CommuteDay::ALL {
            assert_eq!(CommuteDay::from_index(day.index()).unwrap(), day);
        }
        assert!(CommuteDay::from_index(5).is_err());
    }

    #[rstest]
    #[case("Clear", WeatherCategory::Clear)]
    #[case("heavy rain", WeatherCategory::HeavyRain)]
    #[case("Fog", WeatherCategory::Fog)]
    #[case(" Rain ", WeatherCategory::Rain)]
    fn test_parse_weather(#[case] input: &str, #[case] expected: WeatherCategory) {
        assert_eq!(input.parse::<WeatherCategory>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_weather_is_rejected() {
        let err = "Snow".parse::<WeatherCategory>().unwrap_err();
        assert!(matches!(err, CommuteError::UnknownCategory { ref name } if name == "Snow"));
    }

    #[test]
    fn test_weather_serializes_with_display_name() {
        let json = serde_json::to_string(&WeatherCategory::HeavyRain).unwrap();
        assert_eq!(json, "\"Heavy Rain\"");
    }

    #[test]
    fn test_condition_from_clock_time() {
        let condition = Condition::at(
            "07:45".parse().unwrap(),
            CommuteDay::Tuesday,
            WeatherCategory::Fog,
        );
        assert_eq!(condition.departure_hour_fraction, 7.75);
    }
}
