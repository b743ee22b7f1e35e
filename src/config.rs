//! Application configuration
//!
//! Defaults come from environment variables so the same binary can be
//! pointed at another data or model directory without flags; CLI flags
//! override whatever the environment provides.

use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Location of the housing archive used by the original training run.
pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/ageron/handson-ml2/master/datasets/housing/housing.tgz";

/// Top-level configuration shared by the training and inference commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding `housing.tgz` and the extracted `housing.csv`
    pub data_dir: PathBuf,
    /// Directory holding the persisted pipeline and model
    pub model_dir: PathBuf,
    /// Remote archive location
    pub dataset_url: String,
    /// Seed for the split and the forest
    pub random_state: u64,
    /// Fraction of records held out for testing
    pub test_ratio: f64,
    /// Download attempts before giving up
    pub download_retries: u32,
    /// Per-attempt HTTP timeout in seconds
    pub download_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::var("HOUSING_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("datasets/housing")),
            model_dir: std::env::var("HOUSING_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("model")),
            dataset_url: std::env::var("HOUSING_URL")
                .unwrap_or_else(|_| DEFAULT_DATASET_URL.to_string()),
            random_state: std::env::var("HOUSING_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(42),
            test_ratio: std::env::var("HOUSING_TEST_RATIO")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.2),
            download_retries: std::env::var("HOUSING_DOWNLOAD_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            download_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Create a configuration from the environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Builder method to set the model directory
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_ratio(mut self, ratio: f64) -> Self {
        self.test_ratio = ratio;
        self
    }

    /// Path of the extracted CSV
    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join("housing.csv")
    }

    /// Path of the downloaded archive
    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join("housing.tgz")
    }

    /// Reject values the training run cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(HousingError::ConfigError(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.download_retries == 0 {
            return Err(HousingError::ConfigError(
                "download_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let config = AppConfig::new()
            .with_data_dir("/tmp/data")
            .with_model_dir("/tmp/model")
            .with_random_state(7)
            .with_test_ratio(0.25);

        assert_eq!(config.csv_path(), PathBuf::from("/tmp/data/housing.csv"));
        assert_eq!(config.archive_path(), PathBuf::from("/tmp/data/housing.tgz"));
        assert_eq!(config.model_dir, PathBuf::from("/tmp/model"));
        assert_eq!(config.random_state, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_ratio() {
        let config = AppConfig::new().with_test_ratio(1.0);
        assert!(matches!(config.validate(), Err(HousingError::ConfigError(_))));
    }
}
