//! Error types and handling for the `SmartCommute` core

use thiserror::Error;

/// Main error type for the `SmartCommute` library
#[derive(Error, Debug)]
pub enum CommuteError {
    /// Quantile level outside the four fitted levels
    #[error("Unsupported quantile level {value}: expected one of 0.50, 0.75, 0.90, 0.95")]
    InvalidQuantile { value: f64 },

    /// Weather category the model was not fitted on
    #[error("Unknown weather category '{name}'")]
    UnknownCategory { name: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Missing or corrupt persisted model artifacts
    #[error("Model unavailable: {message}")]
    ModelUnavailable { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CommuteError {
    /// Create a new unsupported-quantile error
    #[must_use]
    pub fn invalid_quantile(value: f64) -> Self {
        Self::InvalidQuantile { value }
    }

    /// Create a new unknown-category error
    pub fn unknown_category<S: Into<String>>(name: S) -> Self {
        Self::UnknownCategory { name: name.into() }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ModelUnavailable {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's request rather than the system
    #[must_use]
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantile { .. } | Self::UnknownCategory { .. } | Self::Validation { .. }
        )
    }

    /// Stable machine-readable code for presentation layers
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuantile { .. } => "INVALID_QUANTILE",
            Self::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            Self::Validation { .. } => "VALIDATION",
            Self::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            Self::Config { .. } => "CONFIG",
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CommuteError::InvalidQuantile { value } => {
                format!("Confidence {value} is not supported. Use 0.50, 0.75, 0.90 or 0.95.")
            }
            CommuteError::UnknownCategory { name } => {
                format!("Weather '{name}' is not supported. Use Clear, Rain, Heavy Rain or Fog.")
            }
            CommuteError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            CommuteError::ModelUnavailable { .. } => {
                "Travel-time models could not be loaded. Check the model directory.".to_string()
            }
            CommuteError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
        }
    }
}
