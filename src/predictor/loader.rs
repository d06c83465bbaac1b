//! Model provider: loads the persisted quantile model family from disk
//!
//! Expected directory layout:
//! - `quantile_50_model.json` .. `quantile_95_model.json` (one [`TreeEnsemble`] each)
//! - `weather_encoder.json` (ordered class list)
//! - `feature_cols.json` (ordered feature column names)
//!
//! Every artifact is required. A missing or corrupt file fails the whole load
//! so the process stops at startup instead of at the first query.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::encoder::{FeatureOrder, WeatherEncoder};
use super::gbdt::TreeEnsemble;
use super::quantile::{QuantileEstimator, QuantileLevel, QuantilePredictor};
use crate::error::CommuteError;

pub const WEATHER_ENCODER_FILE: &str = "weather_encoder.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_cols.json";

/// Source of a fitted model family
pub trait ModelProvider {
    fn load(&self) -> crate::Result<QuantilePredictor>;
}

/// File name of the estimator artifact for `level`, e.g. `quantile_95_model.json`
#[must_use]
pub fn estimator_file_name(level: QuantileLevel) -> String {
    format!("quantile_{:02}_model.json", level.percent())
}

/// Model family stored as JSON artifacts in one directory
#[derive(Debug, Clone)]
pub struct ModelDirectory {
    dir: PathBuf,
}

impl ModelDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> crate::Result<T> {
        let path = self.dir.join(file_name);
        let raw = fs::read_to_string(&path).map_err(|e| {
            CommuteError::model_unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            CommuteError::model_unavailable(format!("corrupt artifact {}: {e}", path.display()))
        })
    }

    fn load_estimator(
        &self,
        level: QuantileLevel,
        n_features: usize,
    ) -> crate::Result<TreeEnsemble> {
        let file_name = estimator_file_name(level);
        let ensemble: TreeEnsemble = self.read_json(&file_name)?;

        if QuantileLevel::try_from(ensemble.quantile).ok() != Some(level) {
            return Err(CommuteError::model_unavailable(format!(
                "{file_name} was fitted for quantile {} instead of {level}",
                ensemble.quantile
            )));
        }
        ensemble.validate(n_features)?;

        debug!(%level, trees = ensemble.len(), "loaded quantile estimator");
        Ok(ensemble)
    }
}

impl ModelProvider for ModelDirectory {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn load(&self) -> crate::Result<QuantilePredictor> {
        let columns: Vec<String> = self.read_json(FEATURE_COLUMNS_FILE)?;
        let feature_order = FeatureOrder::from_column_names(&columns)?;
        let encoder: WeatherEncoder = self.read_json(WEATHER_ENCODER_FILE)?;

        let mut estimators: BTreeMap<QuantileLevel, Arc<dyn QuantileEstimator>> = BTreeMap::new();
        for level in QuantileLevel::ALL {
            let ensemble = self.load_estimator(level, feature_order.len())?;
            estimators.insert(level, Arc::new(ensemble));
        }

        let predictor = QuantilePredictor::new(estimators, encoder, feature_order)?;
        info!(
            classes = ?predictor.encoder().classes(),
            "loaded quantile model family"
        );
        Ok(predictor)
    }
}

/// Load the model family from `dir`
pub fn load(dir: impl AsRef<Path>) -> crate::Result<QuantilePredictor> {
    ModelDirectory::new(dir.as_ref()).load()
}
