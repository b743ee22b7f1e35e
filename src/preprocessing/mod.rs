//! Data preprocessing module
//!
//! Provides the housing feature pipeline:
//! - Missing value imputation (median by default)
//! - Derived household ratios
//! - Standard scaling of numeric attributes
//! - One-hot encoding of `ocean_proximity`

mod config;
mod imputer;
mod scaler;
mod encoder;
mod pipeline;
pub mod attributes;

pub use config::PreprocessingConfig;
pub use imputer::{Imputer, ImputeStrategy};
pub use scaler::StandardScaler;
pub use encoder::{OneHotEncoder, UnknownCategoryPolicy};
pub use pipeline::HousingPipeline;
