//! On-disk artifact store for the fitted pipeline and model

use super::serializer::{schema_fingerprint, ArtifactEnvelope, ArtifactKind, ArtifactMetadata};
use crate::error::{HousingError, Result};
use crate::preprocessing::HousingPipeline;
use crate::training::RandomForestRegressor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// File name of the persisted preprocessing pipeline
pub const PIPELINE_FILE: &str = "full_pipeline.bin";
/// File name of the persisted regressor
pub const MODEL_FILE: &str = "model.bin";
/// File name of the human-readable training summary
pub const REPORT_FILE: &str = "training_report.json";

/// Directory holding `full_pipeline.bin` and `model.bin`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn pipeline_path(&self) -> PathBuf {
        self.dir.join(PIPELINE_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// Whether both artifacts are present
    pub fn exists(&self) -> bool {
        self.pipeline_path().is_file() && self.model_path().is_file()
    }

    /// Persist a fitted pipeline
    pub fn save_pipeline(&self, pipeline: &HousingPipeline, metadata: ArtifactMetadata) -> Result<PathBuf> {
        if !pipeline.is_fitted() {
            return Err(HousingError::NotFitted);
        }

        let fingerprint = schema_fingerprint(pipeline.feature_names());
        let metadata = metadata.with_features(pipeline.feature_names().to_vec());
        let envelope = ArtifactEnvelope::wrap(ArtifactKind::Pipeline, fingerprint, metadata, pipeline)?;

        let path = self.pipeline_path();
        envelope.write_atomic(&path)?;
        info!(path = %path.display(), fingerprint = %format!("{:016x}", fingerprint), "Saved pipeline");
        Ok(path)
    }

    /// Persist a fitted model trained on `pipeline`
    ///
    /// The model envelope records the checksum of `pipeline`'s payload, so
    /// `load` only accepts it next to that exact pipeline.
    pub fn save_model(
        &self,
        model: &RandomForestRegressor,
        pipeline: &HousingPipeline,
        metadata: ArtifactMetadata,
    ) -> Result<PathBuf> {
        if !model.is_fitted() {
            return Err(HousingError::NotFitted);
        }
        if model.n_features() != pipeline.n_features() {
            return Err(HousingError::ShapeError {
                expected: format!("{} features", pipeline.n_features()),
                actual: format!("{} features", model.n_features()),
            });
        }

        let fingerprint = schema_fingerprint(pipeline.feature_names());
        let metadata = metadata.with_features(pipeline.feature_names().to_vec());
        let pipeline_checksum = ArtifactEnvelope::payload_checksum(ArtifactKind::Pipeline, pipeline)?;
        let envelope = ArtifactEnvelope::wrap(ArtifactKind::Model, fingerprint, metadata, model)?
            .with_pipeline_checksum(pipeline_checksum);

        let path = self.model_path();
        envelope.write_atomic(&path)?;
        info!(path = %path.display(), trees = model.n_trees(), "Saved model");
        Ok(path)
    }

    /// Load the pipeline on its own
    pub fn load_pipeline(&self) -> Result<HousingPipeline> {
        let envelope = ArtifactEnvelope::read(&self.pipeline_path())?;
        let pipeline: HousingPipeline = envelope.unwrap_payload(ArtifactKind::Pipeline)?;
        check_fingerprint(&envelope, &pipeline)?;
        Ok(pipeline)
    }

    /// Load both artifacts and check the model was trained on this pipeline
    pub fn load(&self) -> Result<(HousingPipeline, RandomForestRegressor)> {
        let pipeline_envelope = ArtifactEnvelope::read(&self.pipeline_path())?;
        let model_envelope = ArtifactEnvelope::read(&self.model_path())?;

        let pipeline: HousingPipeline = pipeline_envelope.unwrap_payload(ArtifactKind::Pipeline)?;
        check_fingerprint(&pipeline_envelope, &pipeline)?;

        if model_envelope.schema_fingerprint != pipeline_envelope.schema_fingerprint {
            return Err(HousingError::ArtifactMismatch {
                expected: format!("model fingerprint {:016x}", pipeline_envelope.schema_fingerprint),
                found: format!("model fingerprint {:016x}", model_envelope.schema_fingerprint),
            });
        }

        if model_envelope.pipeline_checksum != Some(pipeline_envelope.checksum) {
            return Err(HousingError::ArtifactMismatch {
                expected: format!("model trained on pipeline {:016x}", pipeline_envelope.checksum),
                found: match model_envelope.pipeline_checksum {
                    Some(checksum) => format!("model trained on pipeline {:016x}", checksum),
                    None => "model without a pipeline binding".to_string(),
                },
            });
        }

        let model: RandomForestRegressor = model_envelope.unwrap_payload(ArtifactKind::Model)?;
        if model.n_features() != pipeline.n_features() {
            return Err(HousingError::ArtifactMismatch {
                expected: format!("{} model features", pipeline.n_features()),
                found: format!("{} model features", model.n_features()),
            });
        }

        info!(dir = %self.dir.display(), trees = model.n_trees(), "Loaded artifacts");
        Ok((pipeline, model))
    }

    /// Metadata of one artifact without decoding its payload
    pub fn metadata(&self, kind: ArtifactKind) -> Result<ArtifactMetadata> {
        let path = match kind {
            ArtifactKind::Pipeline => self.pipeline_path(),
            ArtifactKind::Model => self.model_path(),
        };
        let envelope = ArtifactEnvelope::read(&path)?;
        envelope.verify(kind)?;
        Ok(envelope.metadata)
    }
}

impl ArtifactStore {
    /// Write a training summary as pretty-printed JSON
    pub fn save_report<T: Serialize>(&self, report: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.report_path();
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!(path = %path.display(), "Saved training report");
        Ok(path)
    }

    /// Read the training summary, `None` when no run has written one
    pub fn load_report<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let path = self.report_path();
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&fs::read_to_string(&path)?)?))
    }
}

fn check_fingerprint(envelope: &ArtifactEnvelope, pipeline: &HousingPipeline) -> Result<()> {
    let actual = schema_fingerprint(pipeline.feature_names());
    if actual != envelope.schema_fingerprint {
        return Err(HousingError::ArtifactMismatch {
            expected: format!("pipeline fingerprint {:016x}", envelope.schema_fingerprint),
            found: format!("pipeline fingerprint {:016x}", actual),
        });
    }
    Ok(())
}
