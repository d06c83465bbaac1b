//! Wall-clock time of day used for departures, arrivals and targets

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CommuteError;

const SECONDS_PER_MINUTE: u32 = 60;
const SECONDS_PER_HOUR: u32 = 3_600;
const MICROS_PER_SECOND: u64 = 1_000_000;

/// Time of day with second resolution, rendered as "HH:MM".
///
/// Values may run past midnight (an arrival after a late departure); such a
/// value still orders after every same-day time and renders wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    seconds: u32,
}

impl ClockTime {
    /// Build from hour and minute of the same day
    pub fn from_hm(hour: u32, minute: u32) -> crate::Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(CommuteError::validation(format!(
                "{hour:02}:{minute:02} is not a valid time of day"
            )));
        }
        Ok(Self {
            seconds: hour * SECONDS_PER_HOUR + minute * SECONDS_PER_MINUTE,
        })
    }

    #[must_use]
    pub fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    #[must_use]
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        (self.seconds / SECONDS_PER_HOUR) % 24
    }

    #[must_use]
    pub fn minute(&self) -> u32 {
        (self.seconds / SECONDS_PER_MINUTE) % 60
    }

    /// Fractional hour of day, e.g. 7.5 for 07:30. This is the model's time feature.
    #[must_use]
    pub fn hour_fraction(&self) -> f64 {
        f64::from(self.seconds) / f64::from(SECONDS_PER_HOUR)
    }

    /// Whole minutes since midnight
    #[must_use]
    pub fn minutes_of_day(&self) -> u32 {
        self.seconds / SECONDS_PER_MINUTE
    }

    /// Advance by whole minutes, saturating at the largest representable time
    #[must_use]
    pub fn plus_minutes(&self, minutes: u32) -> Self {
        Self {
            seconds: self
                .seconds
                .saturating_add(minutes.saturating_mul(SECONDS_PER_MINUTE)),
        }
    }

    /// Advance by fractional minutes. The duration is taken to the microsecond
    /// and then rounded up to a whole second, so the result is never earlier
    /// than the exact arrival. Negative or non-finite durations are treated as zero.
    #[must_use]
    pub fn plus_fractional_minutes(&self, minutes: f64) -> Self {
        let micros = if minutes.is_finite() && minutes > 0.0 {
            (minutes * f64::from(SECONDS_PER_MINUTE) * MICROS_PER_SECOND as f64).round() as u64
        } else {
            0
        };
        let extra = u32::try_from(micros.div_ceil(MICROS_PER_SECOND)).unwrap_or(u32::MAX);
        Self {
            seconds: self.seconds.saturating_add(extra),
        }
    }

    /// Signed minutes from `other` to `self` (positive when `self` is later)
    #[must_use]
    pub fn minutes_since(&self, other: ClockTime) -> f64 {
        (f64::from(self.seconds) - f64::from(other.seconds)) / f64::from(SECONDS_PER_MINUTE)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = CommuteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| {
            CommuteError::validation(format!("'{s}' is not a time in HH:MM format"))
        })?;
        Self::from_hm(time.hour(), time.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("05:00", 5, 0)]
    #[case("08:30", 8, 30)]
    #[case("23:59", 23, 59)]
    #[case(" 07:05 ", 7, 5)]
    fn test_parse(#[case] input: &str, #[case] hour: u32, #[case] minute: u32) {
        let time: ClockTime = input.parse().unwrap();
        assert_eq!(time.hour(), hour);
        assert_eq!(time.minute(), minute);
    }

    #[rstest]
    #[case("24:00")]
    #[case("8h30")]
    #[case("")]
    fn test_parse_rejects_garbage(#[case] input: &str) {
        assert!(input.parse::<ClockTime>().is_err());
    }

    #[test]
    fn test_hour_fraction() {
        let time: ClockTime = "07:30".parse().unwrap();
        assert_eq!(time.hour_fraction(), 7.5);
    }

    #[rstest]
    #[case(62.51, 3_751)]
    #[case(60.2, 3_612)]
    #[case(60.005, 3_601)]
    #[case(60.0, 3_600)]
    #[case(-5.0, 0)]
    #[case(f64::NAN, 0)]
    fn test_fractional_minutes_round_up_to_second(#[case] minutes: f64, #[case] seconds: u32) {
        let departure: ClockTime = "07:00".parse().unwrap();
        let arrival = departure.plus_fractional_minutes(minutes);
        assert_eq!(arrival.seconds() - departure.seconds(), seconds);
    }

    #[test]
    fn test_arrival_a_fraction_of_a_second_late_is_after_target() {
        let departure: ClockTime = "07:30".parse().unwrap();
        let target: ClockTime = "08:30".parse().unwrap();
        assert!(departure.plus_fractional_minutes(60.005) > target);
        assert_eq!(departure.plus_fractional_minutes(60.0), target);
    }

    #[test]
    fn test_past_midnight_orders_later_and_wraps() {
        let late: ClockTime = "20:00".parse().unwrap();
        let arrival = late.plus_minutes(300);
        let target: ClockTime = "08:30".parse().unwrap();
        assert!(arrival > target);
        assert_eq!(arrival.to_string(), "01:00");
    }

    #[test]
    fn test_huge_advances_saturate() {
        let start: ClockTime = "05:00".parse().unwrap();
        assert_eq!(start.plus_minutes(80_000_000).seconds(), u32::MAX);
        assert_eq!(start.plus_minutes(u32::MAX).seconds(), u32::MAX);
        assert_eq!(start.plus_fractional_minutes(1e30).seconds(), u32::MAX);
    }

    #[test]
    fn test_minutes_since_is_signed() {
        let a: ClockTime = "08:00".parse().unwrap();
        let b: ClockTime = "08:30".parse().unwrap();
        assert_eq!(b.minutes_since(a), 30.0);
        assert_eq!(a.minutes_since(b), -30.0);
    }

    #[test]
    fn test_serde_round_trip_uses_hh_mm() {
        let time: ClockTime = "06:45".parse().unwrap();
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"06:45\"");
        let back: ClockTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, time);
    }
}
