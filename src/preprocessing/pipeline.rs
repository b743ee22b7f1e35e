//! Full preprocessing pipeline
//!
//! Two branches over disjoint columns, concatenated column-wise:
//! numeric attributes go through imputation, derived ratios and standard
//! scaling; `ocean_proximity` goes through one-hot encoding.

use crate::data::{HousingRecord, NumericColumn, CATEGORICAL_COLUMN};
use crate::error::{HousingError, Result};
use super::{
    attributes,
    config::PreprocessingConfig,
    encoder::OneHotEncoder,
    imputer::Imputer,
    scaler::StandardScaler,
};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Fitted-once preprocessing pipeline for housing records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousingPipeline {
    config: PreprocessingConfig,
    imputer: Imputer,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    feature_names: Vec<String>,
    is_fitted: bool,
    /// Rows seen by fit
    n_fit_samples: usize,
}

impl Default for HousingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl HousingPipeline {
    /// Create a new pipeline with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new pipeline with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            imputer: Imputer::new(config.impute_strategy),
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(CATEGORICAL_COLUMN, config.unknown_category),
            config,
            feature_names: Vec::new(),
            is_fitted: false,
            n_fit_samples: 0,
        }
    }

    /// Learn imputation, scaling and vocabulary from the training records
    ///
    /// A pipeline is fitted once; fitting again is an error so parameters
    /// cannot drift away from a persisted model.
    pub fn fit(&mut self, records: &[HousingRecord]) -> Result<&mut Self> {
        if self.is_fitted {
            return Err(HousingError::AlreadyFitted);
        }
        if records.is_empty() {
            return Err(HousingError::PreprocessingError(
                "cannot fit pipeline on zero records".to_string(),
            ));
        }

        let start = Instant::now();

        self.imputer.fit(records)?;
        let numeric = self.numeric_block(records)?;
        self.scaler.fit(&numeric)?;
        self.encoder
            .fit(records.iter().map(|r| r.ocean_proximity.as_str()))?;

        self.feature_names = self.build_feature_names();
        self.is_fitted = true;
        self.n_fit_samples = records.len();

        info!(
            samples = records.len(),
            features = self.feature_names.len(),
            categories = ?self.encoder.categories(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted preprocessing pipeline"
        );

        Ok(self)
    }

    /// Transform records into the engineered feature matrix
    pub fn transform(&self, records: &[HousingRecord]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(HousingError::NotFitted);
        }

        let numeric = self.numeric_block(records)?;
        let scaled = self.scaler.transform(&numeric)?;
        let encoded = self
            .encoder
            .transform(records.iter().map(|r| r.ocean_proximity.as_str()))?;

        let features = concatenate(Axis(1), &[scaled.view(), encoded.view()])?;
        debug!(rows = features.nrows(), cols = features.ncols(), "Transformed records");
        Ok(features)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, records: &[HousingRecord]) -> Result<Array2<f64>> {
        self.fit(records)?;
        self.transform(records)
    }

    /// Imputed numeric attributes plus derived ratios, unscaled
    fn numeric_block(&self, records: &[HousingRecord]) -> Result<Array2<f64>> {
        let width = self.numeric_width();
        let mut flat = Vec::with_capacity(records.len() * width);
        for record in records {
            let row = self.imputer.transform(record)?;
            flat.extend(attributes::combined_attributes(&row, self.config.add_bedrooms_per_room));
        }
        Ok(Array2::from_shape_vec((records.len(), width), flat)?)
    }

    fn numeric_width(&self) -> usize {
        NumericColumn::ALL.len() + attributes::derived_names(self.config.add_bedrooms_per_room).len()
    }

    fn build_feature_names(&self) -> Vec<String> {
        NumericColumn::ALL
            .iter()
            .map(|c| c.name().to_string())
            .chain(
                attributes::derived_names(self.config.add_bedrooms_per_room)
                    .into_iter()
                    .map(str::to_string),
            )
            .chain(self.encoder.feature_names())
            .collect()
    }

    /// Output column names in matrix order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of output columns
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Fit-time category vocabulary
    pub fn categories(&self) -> &[String] {
        self.encoder.categories()
    }

    /// Column index of a category's one-hot slot
    pub fn category_feature_index(&self, category: &str) -> Option<usize> {
        self.encoder
            .category_index(category)
            .map(|i| self.numeric_width() + i)
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn n_fit_samples(&self) -> usize {
        self.n_fit_samples
    }
}
