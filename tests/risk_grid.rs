mod common;

use smartcommute::optimizer::{DistanceScale, estimate_late_probability};
use smartcommute::{ClockTime, WeatherCategory, build_risk_grid};

fn t(s: &str) -> ClockTime {
    s.parse().unwrap()
}

#[test]
fn test_grid_covers_every_weather_and_slot() {
    let grid = build_risk_grid(&common::predictor(), t("08:30"), DistanceScale::BASELINE).unwrap();
    assert_eq!(grid.len(), 256);
    for weather in WeatherCategory::ALL {
        let slots: Vec<ClockTime> = grid.for_weather(weather).map(|c| c.departure).collect();
        assert_eq!(slots.len(), 64);
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_probabilities_come_from_the_fixed_table() {
    let grid = build_risk_grid(&common::predictor(), t("09:00"), DistanceScale::BASELINE).unwrap();
    let allowed = [0.02, 0.07, 0.15, 0.35, 0.70];
    assert!(
        grid.cells
            .iter()
            .all(|cell| allowed.contains(&cell.late_probability))
    );
}

#[test]
fn test_crossing_count_table_is_monotone() {
    let by_crossings: Vec<f64> = (0..=4)
        .map(|late_levels| {
            // the highest `late_levels` levels are late
            let mut late = [false; 4];
            for flag in late.iter_mut().rev().take(late_levels) {
                *flag = true;
            }
            estimate_late_probability(&late)
        })
        .collect();
    assert_eq!(by_crossings, vec![0.02, 0.07, 0.15, 0.35, 0.70]);
}

#[test]
fn test_clear_morning_cells() {
    let grid = build_risk_grid(&common::predictor(), t("08:06"), DistanceScale::BASELINE).unwrap();
    let at = |s: &str| {
        grid.for_weather(WeatherCategory::Clear)
            .find(|cell| cell.departure == t(s))
            .unwrap()
            .late_probability
    };

    // 07:00 off-peak: 55, 60, 66 on time; 70 arrives 08:10
    assert_eq!(at("07:00"), 0.07);
    // 06:45: every level on time
    assert_eq!(at("06:45"), 0.02);
    // 07:15 is inside the morning peak: 85 minutes even at the median
    assert_eq!(at("07:15"), 0.70);
}

#[test]
fn test_wetter_weather_is_never_less_risky() {
    let grid = build_risk_grid(&common::predictor(), t("08:30"), DistanceScale::BASELINE).unwrap();
    let clear: Vec<f64> = grid
        .for_weather(WeatherCategory::Clear)
        .map(|c| c.late_probability)
        .collect();
    let heavy: Vec<f64> = grid
        .for_weather(WeatherCategory::HeavyRain)
        .map(|c| c.late_probability)
        .collect();
    assert!(clear.iter().zip(&heavy).all(|(c, h)| c <= h));
}

#[test]
fn test_latest_safe_departure_moves_earlier_with_weather() {
    let grid = build_risk_grid(&common::predictor(), t("12:00"), DistanceScale::BASELINE).unwrap();
    let clear = grid.latest_departure_within(WeatherCategory::Clear, 0.02).unwrap();
    let heavy = grid
        .latest_departure_within(WeatherCategory::HeavyRain, 0.02)
        .unwrap();

    // 70 and 90 minutes at the 0.95 level
    assert_eq!(clear, t("10:45"));
    assert_eq!(heavy, t("10:30"));
}
