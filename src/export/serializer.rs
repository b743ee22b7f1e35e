//! Artifact envelope serialization
//!
//! Every persisted artifact is wrapped in an [`ArtifactEnvelope`] that
//! carries a magic tag, a format version, the artifact kind, the schema
//! fingerprint of the feature layout and an xxh3 checksum of the payload.
//! A model envelope also records the checksum of the pipeline payload it
//! was trained against, which ties it to that exact pipeline.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{HousingError, Result};

/// What an envelope holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Fitted preprocessing pipeline
    Pipeline,
    /// Fitted regressor
    Model,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Pipeline => write!(f, "pipeline"),
            ArtifactKind::Model => write!(f, "model"),
        }
    }
}

/// Descriptive metadata stored next to the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Artifact name
    pub name: String,
    /// Version of the crate that wrote the artifact
    pub version: String,
    /// Training timestamp (RFC 3339)
    pub trained_at: String,
    /// Feature names in matrix order
    pub feature_names: Vec<String>,
    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
    /// Evaluation metrics
    pub metrics: BTreeMap<String, f64>,
}

impl Default for ArtifactMetadata {
    fn default() -> Self {
        Self {
            name: "artifact".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            feature_names: Vec::new(),
            hyperparameters: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }
}

impl ArtifactMetadata {
    /// Create new metadata with name, stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set feature names
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_names = features;
        self
    }

    /// Add hyperparameter
    pub fn add_hyperparameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.hyperparameters.insert(key.into(), value.to_string());
        self
    }

    /// Add metric
    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// Fingerprint of a feature layout: xxh3 over the ordered names
pub fn schema_fingerprint(feature_names: &[String]) -> u64 {
    let joined = feature_names.join("\n");
    xxh3_64(joined.as_bytes())
}

/// Binary container written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Fingerprint of the feature layout the payload was built for
    pub schema_fingerprint: u64,
    /// Artifact metadata
    pub metadata: ArtifactMetadata,
    /// Checksum of the pipeline payload a model was trained against
    pub pipeline_checksum: Option<u64>,
    /// Bincode-encoded payload
    pub payload: Vec<u8>,
    /// Checksum for integrity verification
    pub checksum: u64,
}

impl ArtifactEnvelope {
    /// Magic bytes for housing artifacts
    pub const MAGIC: [u8; 4] = *b"CHML";
    /// Current format version
    pub const VERSION: u32 = 2;

    /// Wrap a serializable value
    pub fn wrap<T: Serialize>(
        kind: ArtifactKind,
        schema_fingerprint: u64,
        metadata: ArtifactMetadata,
        value: &T,
    ) -> Result<Self> {
        let payload = encode_payload(kind, value)?;
        let checksum = xxh3_64(&payload);
        Ok(Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            kind,
            schema_fingerprint,
            metadata,
            pipeline_checksum: None,
            payload,
            checksum,
        })
    }

    /// Checksum `wrap` would record for `value`
    pub fn payload_checksum<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<u64> {
        Ok(xxh3_64(&encode_payload(kind, value)?))
    }

    /// Bind this envelope to the pipeline payload with checksum `checksum`
    pub fn with_pipeline_checksum(mut self, checksum: u64) -> Self {
        self.pipeline_checksum = Some(checksum);
        self
    }

    /// Check magic, version, kind and checksum
    pub fn verify(&self, expected_kind: ArtifactKind) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(HousingError::ArtifactMismatch {
                expected: format!("magic {:?}", String::from_utf8_lossy(&Self::MAGIC)),
                found: format!("magic {:?}", String::from_utf8_lossy(&self.magic)),
            });
        }
        if self.format_version != Self::VERSION {
            return Err(HousingError::ArtifactMismatch {
                expected: format!("format version {}", Self::VERSION),
                found: format!("format version {}", self.format_version),
            });
        }
        if self.kind != expected_kind {
            return Err(HousingError::ArtifactMismatch {
                expected: format!("{} artifact", expected_kind),
                found: format!("{} artifact", self.kind),
            });
        }
        let actual = xxh3_64(&self.payload);
        if actual != self.checksum {
            return Err(HousingError::SerializationError(format!(
                "{} checksum mismatch: stored {:016x}, computed {:016x}",
                self.kind, self.checksum, actual
            )));
        }
        Ok(())
    }

    /// Verify and decode the payload
    pub fn unwrap_payload<T: DeserializeOwned>(&self, expected_kind: ArtifactKind) -> Result<T> {
        self.verify(expected_kind)?;
        bincode::deserialize(&self.payload).map_err(|e| {
            HousingError::SerializationError(format!("Failed to deserialize {}: {}", self.kind, e))
        })
    }

    /// Encode the whole envelope
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode an envelope without verifying it
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::MAGIC.len() || bytes[..4] != Self::MAGIC {
            return Err(HousingError::ArtifactMismatch {
                expected: "housing artifact".to_string(),
                found: "unrecognized file".to_string(),
            });
        }
        bincode::deserialize(bytes).map_err(|e| {
            HousingError::SerializationError(format!("Corrupt artifact: {}", e))
        })
    }

    /// Write to `path` through a sibling temp file and a rename
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        {
            let file = File::create(tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        if let Err(e) = fs::rename(tmp_path, path) {
            let _ = fs::remove_file(tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read an envelope from disk
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HousingError::InferenceError(format!(
                    "no artifact at {}; run `calhousing train` first",
                    path.display()
                ))
            } else {
                HousingError::IoError(e)
            }
        })?;
        Self::from_bytes(&bytes)
    }
}

fn encode_payload<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| HousingError::SerializationError(format!("Failed to serialize {}: {}", kind, e)))
}
