//! Quantile travel-time prediction
//!
//! - [`quantile`]: quantile levels, the estimator capability and the predictor
//! - [`encoder`]: weather label encoding and model feature order
//! - [`gbdt`]: inference for exported gradient-boosted tree ensembles
//! - [`loader`]: the model provider that loads a fitted family from disk

pub mod encoder;
pub mod gbdt;
pub mod loader;
pub mod quantile;

pub use encoder::{Feature, FeatureOrder, WeatherEncoder};
pub use gbdt::{Node, Tree, TreeEnsemble};
pub use loader::{ModelDirectory, ModelProvider};
pub use quantile::{QuantileEstimator, QuantileLevel, QuantilePredictor};
