//! calhousing - California housing price regression
//!
//! This crate provides the full path from raw census data to a price
//! estimate:
//! - Dataset download and CSV loading
//! - Income-stratified train/test split
//! - Preprocessing: imputation, derived ratios, scaling, one-hot encoding
//! - Random-forest regression
//! - Checksummed artifact persistence
//! - A validated prediction form and CLI
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - Record types, dataset fetching and CSV loading
//! - [`split`] - Stratified train/test split on income category
//!
//! ## Core ML Modules
//! - [`preprocessing`] - Imputation, derived attributes, scaling, encoding
//! - [`training`] - Regression trees, random forest, metrics, training engine
//! - [`inference`] - Form validation and single-record prediction
//!
//! ## Infrastructure
//! - [`export`] - Artifact serialization and storage
//! - [`config`] - Application configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod data;
pub mod split;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;

// Infrastructure
pub mod export;

// Services
pub mod cli;

pub use error::{HousingError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{HousingError, Result};

    // Configuration
    pub use crate::config::AppConfig;

    // Data
    pub use crate::data::{load_housing_csv, DatasetFetcher, HousingRecord, NumericColumn, OceanProximity};
    pub use crate::split::{IncomeCategory, SplitResult, StratifiedSplit};

    // Preprocessing
    pub use crate::preprocessing::{HousingPipeline, PreprocessingConfig, UnknownCategoryPolicy};

    // Training
    pub use crate::training::{
        MaxFeatures, RandomForestRegressor, RegressionMetrics, Regressor, TrainEngine, TrainingConfig,
    };

    // Export
    pub use crate::export::{ArtifactMetadata, ArtifactStore};

    // Inference
    pub use crate::inference::{format_currency, FormInput, Predictor};
}
