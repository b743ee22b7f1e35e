//! One-hot encoding of the categorical column

use crate::error::{HousingError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Handling of categories absent from the fit-time vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownCategoryPolicy {
    /// Encode as an all-zero block and log a warning
    Ignore,
    /// Fail the transform with [`HousingError::UnknownCategory`]
    Error,
}

/// One-hot encoder with a sorted vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
    handle_unknown: UnknownCategoryPolicy,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create a new encoder for `column`
    pub fn new(column: impl Into<String>, handle_unknown: UnknownCategoryPolicy) -> Self {
        Self {
            column: column.into(),
            categories: Vec::new(),
            handle_unknown,
            is_fitted: false,
        }
    }

    /// Learn the vocabulary: distinct values in lexicographic order
    pub fn fit<'a, I>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let vocabulary: BTreeSet<&str> = values.into_iter().collect();
        if vocabulary.is_empty() {
            return Err(HousingError::PreprocessingError(format!(
                "no values to build a vocabulary for {}",
                self.column
            )));
        }

        self.categories = vocabulary.into_iter().map(str::to_string).collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode values as rows of a `n × categories` indicator matrix
    pub fn transform<'a, I>(&self, values: I) -> Result<Array2<f64>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if !self.is_fitted {
            return Err(HousingError::NotFitted);
        }

        let values: Vec<&str> = values.into_iter().collect();
        let mut encoded = Array2::zeros((values.len(), self.categories.len()));

        for (row, value) in values.iter().enumerate() {
            match self.category_index(value) {
                Some(col) => encoded[[row, col]] = 1.0,
                None => match self.handle_unknown {
                    UnknownCategoryPolicy::Ignore => {
                        warn!(
                            column = %self.column,
                            value = %value,
                            "Unknown category encoded as all zeros"
                        );
                    }
                    UnknownCategoryPolicy::Error => {
                        return Err(HousingError::UnknownCategory {
                            column: self.column.clone(),
                            value: value.to_string(),
                        });
                    }
                },
            }
        }

        Ok(encoded)
    }

    /// Position of `value` in the vocabulary
    pub fn category_index(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Output column names, `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: [&str; 6] = ["NEAR BAY", "INLAND", "<1H OCEAN", "NEAR OCEAN", "ISLAND", "INLAND"];

    #[test]
    fn test_vocabulary_is_sorted() {
        let mut encoder = OneHotEncoder::new("ocean_proximity", UnknownCategoryPolicy::Ignore);
        encoder.fit(VALUES).unwrap();
        assert_eq!(
            encoder.categories(),
            &["<1H OCEAN", "INLAND", "ISLAND", "NEAR BAY", "NEAR OCEAN"]
        );
        assert_eq!(encoder.feature_names()[3], "ocean_proximity_NEAR BAY");
    }

    #[test]
    fn test_onehot_rows() {
        let mut encoder = OneHotEncoder::new("ocean_proximity", UnknownCategoryPolicy::Ignore);
        encoder.fit(VALUES).unwrap();

        let encoded = encoder.transform(["NEAR BAY", "<1H OCEAN"]).unwrap();
        assert_eq!(encoded.shape(), &[2, 5]);
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_ignored() {
        let mut encoder = OneHotEncoder::new("ocean_proximity", UnknownCategoryPolicy::Ignore);
        encoder.fit(VALUES).unwrap();

        let encoded = encoder.transform(["DESERT"]).unwrap();
        assert!(encoded.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_unknown_error() {
        let mut encoder = OneHotEncoder::new("ocean_proximity", UnknownCategoryPolicy::Error);
        encoder.fit(VALUES).unwrap();

        let err = encoder.transform(["DESERT"]).unwrap_err();
        assert!(matches!(err, HousingError::UnknownCategory { .. }));
    }
}
