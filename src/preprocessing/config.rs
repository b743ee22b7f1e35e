//! Preprocessing configuration

use serde::{Deserialize, Serialize};
use super::{ImputeStrategy, UnknownCategoryPolicy};

/// Configuration for the housing preprocessing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Statistic used to fill missing numeric values
    pub impute_strategy: ImputeStrategy,

    /// Whether to append bedrooms_per_room to the derived attributes
    pub add_bedrooms_per_room: bool,

    /// What to do with a category that was not seen during fit
    pub unknown_category: UnknownCategoryPolicy,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            impute_strategy: ImputeStrategy::Median,
            add_bedrooms_per_room: true,
            unknown_category: UnknownCategoryPolicy::Ignore,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the impute strategy
    pub fn with_impute_strategy(mut self, strategy: ImputeStrategy) -> Self {
        self.impute_strategy = strategy;
        self
    }

    /// Builder method to toggle bedrooms_per_room
    pub fn with_bedrooms_per_room(mut self, enabled: bool) -> Self {
        self.add_bedrooms_per_room = enabled;
        self
    }

    /// Builder method to set the unknown-category policy
    pub fn with_unknown_category(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_category = policy;
        self
    }
}
