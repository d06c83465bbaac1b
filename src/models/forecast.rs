//! Daily weather forecast records

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{CommuteDay, WeatherCategory, WeatherCode};

/// One day of a weather forecast
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// Full weekday name, e.g. "Friday"
    pub day_name: String,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,
    pub weather_code: WeatherCode,
    pub weather_description: String,
    pub weather_category: WeatherCategory,
    /// Maximum precipitation probability for the day (0-100%)
    pub precipitation_probability: u8,
    /// Temperature maximum in Fahrenheit
    pub temperature_max_f: f64,
    /// Temperature minimum in Fahrenheit
    pub temperature_min_f: f64,
}

impl DailyForecast {
    /// Create a forecast record, deriving weekday and category fields
    #[must_use]
    pub fn new(
        date: NaiveDate,
        weather_code: WeatherCode,
        precipitation_probability: u8,
        temperature_max_f: f64,
        temperature_min_f: f64,
    ) -> Self {
        let weekday = date.weekday();
        Self {
            date,
            day_name: weekday_name(weekday).to_string(),
            day_of_week: u8::try_from(weekday.num_days_from_monday()).unwrap_or(0),
            weather_code,
            weather_description: weather_code.description(),
            weather_category: weather_code.category(),
            precipitation_probability,
            temperature_max_f,
            temperature_min_f,
        }
    }

    /// The commute day, or `None` on weekends
    #[must_use]
    pub fn commute_day(&self) -> Option<CommuteDay> {
        CommuteDay::try_from(self.date.weekday()).ok()
    }

    /// Format temperature range with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!(
            "{:.0}–{:.0}°F",
            self.temperature_min_f, self.temperature_max_f
        )
    }
}

/// Tomorrow's record. Forecast providers return today first, so this is
/// index 1; no date matching is performed.
#[must_use]
pub fn tomorrow(forecasts: &[DailyForecast]) -> Option<&DailyForecast> {
    forecasts.get(1)
}

fn weekday_name(weekday: chrono::Weekday) -> &'static str {
    match weekday {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(date: &str, code: u8) -> DailyForecast {
        DailyForecast::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            WeatherCode(code),
            40,
            71.2,
            55.8,
        )
    }

    #[test]
    fn test_derived_fields() {
        let day = forecast("2024-03-15", 63);
        assert_eq!(day.day_name, "Friday");
        assert_eq!(day.day_of_week, 4);
        assert_eq!(day.weather_category, WeatherCategory::Rain);
        assert_eq!(day.weather_description, "Moderate rain");
        assert_eq!(day.commute_day(), Some(CommuteDay::Friday));
        assert_eq!(day.format_temperature(), "56–71°F");
    }

    #[test]
    fn test_weekend_has_no_commute_day() {
        assert_eq!(forecast("2024-03-16", 0).commute_day(), None);
    }

    #[test]
    fn test_tomorrow_is_second_entry() {
        let days = vec![forecast("2024-03-14", 0), forecast("2024-03-15", 45)];
        assert_eq!(tomorrow(&days).unwrap().weather_category, WeatherCategory::Fog);
        assert!(tomorrow(&days[..1]).is_none());
        assert!(tomorrow(&[]).is_none());
    }
}
