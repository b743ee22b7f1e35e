//! Single-record prediction over persisted artifacts

use crate::data::HousingRecord;
use crate::error::{HousingError, Result};
use crate::export::ArtifactStore;
use crate::preprocessing::HousingPipeline;
use crate::training::RandomForestRegressor;
use super::form::FormInput;
use ndarray::{Array1, Axis};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of one form submission
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Estimated median house value in dollars
    pub value: f64,
    /// Engineered feature vector the model saw
    pub features: Array1<f64>,
    /// Time spent transforming and predicting
    pub latency: Duration,
}

impl Prediction {
    /// Value rendered as `$452,600.00`
    pub fn formatted(&self) -> String {
        format_currency(self.value)
    }
}

/// Fitted pipeline plus model, loaded once and reused per request
#[derive(Debug, Clone)]
pub struct Predictor {
    pipeline: HousingPipeline,
    model: RandomForestRegressor,
}

impl Predictor {
    /// Load both artifacts from `model_dir`
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self> {
        let (pipeline, model) = ArtifactStore::new(model_dir.as_ref()).load()?;
        Self::from_parts(pipeline, model)
    }

    /// Wrap an in-memory pipeline and model
    pub fn from_parts(pipeline: HousingPipeline, model: RandomForestRegressor) -> Result<Self> {
        if !pipeline.is_fitted() || !model.is_fitted() {
            return Err(HousingError::NotFitted);
        }
        if pipeline.n_features() != model.n_features() {
            return Err(HousingError::ShapeError {
                expected: format!("{} features", pipeline.n_features()),
                actual: format!("{} features", model.n_features()),
            });
        }
        Ok(Self { pipeline, model })
    }

    /// Engineered feature vector for one record
    pub fn features(&self, record: &HousingRecord) -> Result<Array1<f64>> {
        let x = self.pipeline.transform(std::slice::from_ref(record))?;
        Ok(x.row(0).to_owned())
    }

    /// Predict the value of one record
    pub fn predict_one(&self, record: &HousingRecord) -> Result<f64> {
        let x = self.pipeline.transform(std::slice::from_ref(record))?;
        let predictions = self.model.predict(&x)?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| HousingError::InferenceError("model returned no prediction".to_string()))
    }

    /// Predict a batch of records
    pub fn predict_batch(&self, records: &[HousingRecord]) -> Result<Array1<f64>> {
        let x = self.pipeline.transform(records)?;
        self.model.predict(&x)
    }

    /// Validate a form submission and predict it
    pub fn predict_form(&self, input: &FormInput) -> Result<Prediction> {
        input.validate()?;
        let start = Instant::now();

        let x = self.pipeline.transform(&[input.to_record()])?;
        let value = self
            .model
            .predict(&x)?
            .first()
            .copied()
            .ok_or_else(|| HousingError::InferenceError("model returned no prediction".to_string()))?;
        let features = x.index_axis(Axis(0), 0).to_owned();
        let latency = start.elapsed();

        debug!(value, latency_us = latency.as_micros() as u64, "Form prediction");
        Ok(Prediction { value, features, latency })
    }

    pub fn pipeline(&self) -> &HousingPipeline {
        &self.pipeline
    }

    pub fn model(&self) -> &RandomForestRegressor {
        &self.model
    }
}

/// Dollar amount with thousands separators and two decimals
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }

    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(452_600.0), "$452,600.00");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(12.5), "$12.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-1500.0), "-$1,500.00");
    }

    #[test]
    fn test_unfitted_parts_rejected() {
        assert!(matches!(
            Predictor::from_parts(HousingPipeline::new(), RandomForestRegressor::new(1)),
            Err(HousingError::NotFitted)
        ));
    }
}
