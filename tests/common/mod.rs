//! Shared fixtures: a small exported model family with morning and evening peaks

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use smartcommute::QuantilePredictor;
use smartcommute::predictor::loader;
use tempfile::TempDir;

/// Base minutes per level; the trees add the same offsets to every level
pub const BASE_MINUTES: [(u8, f64); 4] = [(50, 55.0), (75, 60.0), (90, 66.0), (95, 70.0)];

/// Trees over [departure_hour_frac, day_of_week_num, weather_enc]:
/// - +30 between 07:00 and 09:00, +35 between 16:00 and 18:30
/// - Fog +8, Heavy Rain +20, Rain +10 (labels 1, 2, 3)
/// - Friday -3
const TREES: &str = r#"[
    { "nodes": [
        { "feature": 0, "threshold": 7.0, "left": 1, "right": 2 },
        { "value": 0.0 },
        { "feature": 0, "threshold": 9.0, "left": 3, "right": 4 },
        { "value": 30.0 },
        { "feature": 0, "threshold": 16.0, "left": 5, "right": 6 },
        { "value": 0.0 },
        { "feature": 0, "threshold": 18.5, "left": 7, "right": 8 },
        { "value": 35.0 },
        { "value": 0.0 }
    ] },
    { "nodes": [
        { "feature": 2, "threshold": 0.5, "left": 1, "right": 2 },
        { "value": 0.0 },
        { "feature": 2, "threshold": 1.5, "left": 3, "right": 4 },
        { "value": 8.0 },
        { "feature": 2, "threshold": 2.5, "left": 5, "right": 6 },
        { "value": 20.0 },
        { "value": 10.0 }
    ] },
    { "nodes": [
        { "feature": 1, "threshold": 3.5, "left": 1, "right": 2 },
        { "value": 0.0 },
        { "value": -3.0 }
    ] }
]"#;

pub fn write_model_family(dir: &Path) {
    fs::write(
        dir.join("feature_cols.json"),
        r#"["departure_hour_frac", "day_of_week_num", "weather_enc"]"#,
    )
    .unwrap();
    fs::write(
        dir.join("weather_encoder.json"),
        r#"["Clear", "Fog", "Heavy Rain", "Rain"]"#,
    )
    .unwrap();
    for (percent, base) in BASE_MINUTES {
        let quantile = f64::from(percent) / 100.0;
        let json = format!(
            r#"{{"quantile": {quantile}, "init_value": {base}, "learning_rate": 1.0, "trees": {TREES}}}"#
        );
        fs::write(dir.join(format!("quantile_{percent}_model.json")), json).unwrap();
    }
}

/// Model family written to a fresh temporary directory
pub fn model_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_model_family(dir.path());
    dir
}

pub fn predictor() -> QuantilePredictor {
    let dir = model_dir();
    loader::load(dir.path()).unwrap()
}
