//! Error types for calhousing

use thiserror::Error;

/// Result type alias for calhousing operations
pub type Result<T> = std::result::Result<T, HousingError>;

/// Main error type
#[derive(Error, Debug)]
pub enum HousingError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("Download failed after {attempts} attempt(s): {reason}")]
    DownloadError { attempts: u32, reason: String },

    #[error("Stratification error: {0}")]
    StratificationError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Artifact mismatch: expected {expected}, found {found}")]
    ArtifactMismatch { expected: String, found: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Unknown category {value:?} in column {column}")]
    UnknownCategory { column: String, value: String },

    #[error("Not fitted")]
    NotFitted,

    #[error("Already fitted; refit by building a new pipeline")]
    AlreadyFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for HousingError {
    fn from(err: polars::error::PolarsError) -> Self {
        HousingError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for HousingError {
    fn from(err: serde_json::Error) -> Self {
        HousingError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for HousingError {
    fn from(err: bincode::Error) -> Self {
        HousingError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HousingError {
    fn from(err: ndarray::ShapeError) -> Self {
        HousingError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HousingError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HousingError = io_err.into();
        assert!(matches!(err, HousingError::IoError(_)));
    }

    #[test]
    fn test_unknown_category_display() {
        let err = HousingError::UnknownCategory {
            column: "ocean_proximity".to_string(),
            value: "ON THE MOON".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown category \"ON THE MOON\" in column ocean_proximity"
        );
    }
}
