//! Artifact persistence
//!
//! The fitted pipeline and model are written as checksummed bincode
//! envelopes. Loading verifies both and refuses a model whose feature
//! layout differs from the pipeline's.

mod serializer;
mod store;

pub use serializer::{schema_fingerprint, ArtifactEnvelope, ArtifactKind, ArtifactMetadata};
pub use store::{ArtifactStore, MODEL_FILE, PIPELINE_FILE, REPORT_FILE};
