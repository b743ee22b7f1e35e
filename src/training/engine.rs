//! Training engine: split, preprocess, fit, evaluate, persist

use crate::data::HousingRecord;
use crate::error::Result;
use crate::export::{ArtifactMetadata, ArtifactStore};
use crate::preprocessing::{HousingPipeline, PreprocessingConfig};
use crate::split::StratifiedSplit;
use super::{RandomForestRegressor, RegressionMetrics, Regressor, TrainingConfig};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Summary of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_records: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_names: Vec<String>,
    pub train_metrics: RegressionMetrics,
    pub test_metrics: RegressionMetrics,
    /// Features sorted by decreasing importance
    pub importances: Vec<(String, f64)>,
    pub training_time_secs: f64,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub pipeline: HousingPipeline,
    pub model: RandomForestRegressor,
    pub report: TrainingReport,
}

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    training: TrainingConfig,
    preprocessing: PreprocessingConfig,
    test_ratio: f64,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(training: TrainingConfig) -> Self {
        Self {
            training,
            preprocessing: PreprocessingConfig::default(),
            test_ratio: 0.2,
        }
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    pub fn with_test_ratio(mut self, ratio: f64) -> Self {
        self.test_ratio = ratio;
        self
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    /// Train in memory without persisting anything
    pub fn train(&self, records: &[HousingRecord]) -> Result<TrainedArtifacts> {
        self.run(records, None)
    }

    /// Train and persist the pipeline and the model into `store`
    ///
    /// Nothing is written until fitting and evaluation have succeeded, so a
    /// failed run leaves the previous artifacts in place.
    pub fn train_and_save(&self, records: &[HousingRecord], store: &ArtifactStore) -> Result<TrainedArtifacts> {
        self.run(records, Some(store))
    }

    fn run(&self, records: &[HousingRecord], store: Option<&ArtifactStore>) -> Result<TrainedArtifacts> {
        self.training.validate()?;
        let start = Instant::now();

        let split = StratifiedSplit::new(self.test_ratio)
            .with_random_state(self.training.random_state)
            .split(records)?;
        info!(train = split.train.len(), test = split.test.len(), "Stratified split");

        let mut pipeline = HousingPipeline::with_config(self.preprocessing.clone());
        pipeline.fit(&split.train)?;

        let x_train = pipeline.transform(&split.train)?;
        let y_train = targets(&split.train)?;

        let mut model = RandomForestRegressor::from_config(&self.training);
        model.fit(&x_train, &y_train)?;

        let train_metrics = evaluate(&model, &x_train, &y_train)?;
        let x_test = pipeline.transform(&split.test)?;
        let y_test = targets(&split.test)?;
        let test_metrics = evaluate(&model, &x_test, &y_test)?;

        info!(
            rmse = test_metrics.rmse,
            mae = test_metrics.mae,
            r2 = test_metrics.r2,
            "Test set evaluation"
        );

        let report = TrainingReport {
            n_records: records.len(),
            n_train: split.train.len(),
            n_test: split.test.len(),
            feature_names: pipeline.feature_names().to_vec(),
            train_metrics,
            test_metrics,
            importances: ranked_importances(&model, pipeline.feature_names()),
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        if let Some(store) = store {
            store.save_pipeline(&pipeline, ArtifactMetadata::new("full_pipeline"))?;
            store.save_model(&model, &pipeline, self.model_metadata(&report))?;
            store.save_report(&report)?;
        }

        Ok(TrainedArtifacts { pipeline, model, report })
    }

    fn model_metadata(&self, report: &TrainingReport) -> ArtifactMetadata {
        let t = &self.training;
        ArtifactMetadata::new("random_forest_regressor")
            .add_hyperparameter("n_estimators", t.n_estimators)
            .add_hyperparameter("random_state", t.random_state)
            .add_hyperparameter(
                "max_depth",
                t.max_depth.map_or_else(|| "none".to_string(), |d| d.to_string()),
            )
            .add_hyperparameter("min_samples_split", t.min_samples_split)
            .add_hyperparameter("min_samples_leaf", t.min_samples_leaf)
            .add_hyperparameter("max_features", format!("{:?}", t.max_features))
            .add_hyperparameter("bootstrap", t.bootstrap)
            .add_hyperparameter("test_ratio", self.test_ratio)
            .add_metric("test_rmse", report.test_metrics.rmse)
            .add_metric("test_mae", report.test_metrics.mae)
            .add_metric("test_r2", report.test_metrics.r2)
            .add_metric("train_rmse", report.train_metrics.rmse)
            .add_metric("n_train", report.n_train as f64)
            .add_metric("n_test", report.n_test as f64)
    }
}

/// Score any regressor on a prepared matrix
pub fn evaluate<R: Regressor + ?Sized>(model: &R, x: &Array2<f64>, y: &Array1<f64>) -> Result<RegressionMetrics> {
    let predictions = model.predict(x)?;
    RegressionMetrics::compute(y, &predictions)
}

/// Label vector of labelled records
pub fn targets(records: &[HousingRecord]) -> Result<Array1<f64>> {
    let values = records.iter().map(HousingRecord::target).collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from_vec(values))
}

fn ranked_importances(model: &RandomForestRegressor, names: &[String]) -> Vec<(String, f64)> {
    let Some(importances) = model.feature_importances() else {
        return Vec::new();
    };
    let mut ranked: Vec<(String, f64)> = names.iter().cloned().zip(importances.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<HousingRecord> {
        let oceans = ["NEAR BAY", "INLAND", "<1H OCEAN", "NEAR OCEAN"];
        (0..n)
            .map(|i| {
                let income = 0.8 + (i % 10) as f64 * 0.7;
                let rooms = 800.0 + (i % 13) as f64 * 150.0;
                HousingRecord {
                    longitude: Some(-122.0 + (i % 7) as f64 * 0.3),
                    latitude: Some(34.0 + (i % 5) as f64 * 0.5),
                    housing_median_age: Some(5.0 + (i % 40) as f64),
                    total_rooms: Some(rooms),
                    total_bedrooms: if i % 17 == 0 { None } else { Some(rooms / 5.0) },
                    population: Some(400.0 + (i % 11) as f64 * 90.0),
                    households: Some(150.0 + (i % 9) as f64 * 25.0),
                    median_income: Some(income),
                    ocean_proximity: oceans[i % 4].to_string(),
                    median_house_value: Some(40_000.0 * income + 10_000.0 * (i % 4) as f64),
                }
            })
            .collect()
    }

    #[test]
    fn test_train_in_memory() {
        let data = records(200);
        let engine = TrainEngine::new(TrainingConfig::new().with_n_estimators(10));
        let trained = engine.train(&data).unwrap();

        assert_eq!(trained.report.n_train + trained.report.n_test, 200);
        assert_eq!(trained.report.n_test, 40);
        assert_eq!(trained.model.n_features(), trained.pipeline.n_features());
        assert!(trained.report.test_metrics.r2 > 0.5, "{}", trained.report.test_metrics);
        assert_eq!(trained.report.importances[0].0, "median_income");
    }

    #[test]
    fn test_train_and_save_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let engine = TrainEngine::new(TrainingConfig::new().with_n_estimators(3));

        engine.train_and_save(&records(100), &store).unwrap();
        assert!(store.exists());

        let metadata = store.metadata(crate::export::ArtifactKind::Model).unwrap();
        assert_eq!(metadata.hyperparameters["n_estimators"], "3");
        assert!(metadata.metrics.contains_key("test_rmse"));
    }

    #[test]
    fn test_failed_run_keeps_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let engine = TrainEngine::new(TrainingConfig::new().with_n_estimators(3));
        engine.train_and_save(&records(100), &store).unwrap();
        let pipeline_bytes = std::fs::read(store.pipeline_path()).unwrap();
        let model_bytes = std::fs::read(store.model_path()).unwrap();

        let mut data = records(120);
        for record in &mut data {
            record.total_rooms = record.total_rooms.map(|v| v * 3.0);
        }
        data[7].median_house_value = None;
        assert!(engine.train_and_save(&data, &store).is_err());

        assert_eq!(std::fs::read(store.pipeline_path()).unwrap(), pipeline_bytes);
        assert_eq!(std::fs::read(store.model_path()).unwrap(), model_bytes);
        assert!(store.load().is_ok());
    }

    #[test]
    fn test_unlabelled_records_rejected() {
        let mut data = records(50);
        data[3].median_house_value = None;
        let engine = TrainEngine::new(TrainingConfig::new().with_n_estimators(2));
        assert!(engine.train(&data).is_err());
    }
}
