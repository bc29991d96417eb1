//! ML client error types.

use thiserror::Error;

pub type MlClientResult<T> = Result<T, MlClientError>;

#[derive(Debug, Error)]
pub enum MlClientError {
    #[error("Detector request failed: {0}")]
    DetectorFailed(String),

    #[error("Placement classification failed: {0}")]
    ClassifyFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MlClientError {
    pub fn detector_failed(msg: impl Into<String>) -> Self {
        Self::DetectorFailed(msg.into())
    }

    pub fn classify_failed(msg: impl Into<String>) -> Self {
        Self::ClassifyFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}
