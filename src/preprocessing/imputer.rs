//! Missing value imputation for the numeric attributes

use crate::data::{HousingRecord, NumericColumn, NumericRow};
use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the median of the observed values
    Median,
    /// Replace with the mean of the observed values
    Mean,
}

/// Fills missing numeric attributes with per-column statistics from fit time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Option<[f64; 8]>,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: None,
        }
    }

    /// Compute fill values from the observed values of every numeric column
    pub fn fit(&mut self, records: &[HousingRecord]) -> Result<&mut Self> {
        let mut fill_values = [0.0; 8];

        for column in NumericColumn::ALL {
            let mut observed: Vec<f64> = records
                .iter()
                .filter_map(|r| r.numeric(column))
                .filter(|v| v.is_finite())
                .collect();

            if observed.is_empty() {
                return Err(HousingError::PreprocessingError(format!(
                    "column {} has no observed values to impute from",
                    column
                )));
            }

            fill_values[column.index()] = match self.strategy {
                ImputeStrategy::Median => median(&mut observed),
                ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
            };
        }

        self.fill_values = Some(fill_values);
        Ok(self)
    }

    /// Replace missing values of one record
    pub fn transform(&self, record: &HousingRecord) -> Result<NumericRow> {
        let fill_values = self.fill_values.as_ref().ok_or(HousingError::NotFitted)?;

        let mut values = [0.0; 8];
        for column in NumericColumn::ALL {
            let i = column.index();
            values[i] = match record.numeric(column) {
                Some(v) if v.is_finite() => v,
                _ => fill_values[i],
            };
        }
        Ok(NumericRow(values))
    }

    /// Fill value learned for `column`
    pub fn fill_value(&self, column: NumericColumn) -> Option<f64> {
        self.fill_values.map(|f| f[column.index()])
    }

    pub fn is_fitted(&self) -> bool {
        self.fill_values.is_some()
    }
}

/// Median with the mean of the two middle values for even counts
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total_bedrooms: Option<f64>, households: f64) -> HousingRecord {
        HousingRecord {
            longitude: Some(-121.0),
            latitude: Some(37.0),
            housing_median_age: Some(30.0),
            total_rooms: Some(1000.0),
            total_bedrooms,
            population: Some(800.0),
            households: Some(households),
            median_income: Some(3.0),
            ocean_proximity: "INLAND".to_string(),
            median_house_value: None,
        }
    }

    #[test]
    fn test_median_imputation() {
        let records = vec![
            record(Some(100.0), 10.0),
            record(None, 20.0),
            record(Some(300.0), 30.0),
            record(Some(200.0), 40.0),
        ];

        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&records).unwrap();

        assert_eq!(imputer.fill_value(NumericColumn::TotalBedrooms), Some(200.0));
        // Even count: mean of the middle pair
        assert_eq!(imputer.fill_value(NumericColumn::Households), Some(25.0));

        let row = imputer.transform(&records[1]).unwrap();
        assert_eq!(row[NumericColumn::TotalBedrooms], 200.0);
        assert_eq!(row[NumericColumn::Households], 20.0);
    }

    #[test]
    fn test_mean_imputation() {
        let records = vec![record(Some(100.0), 10.0), record(Some(400.0), 20.0), record(None, 30.0)];

        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        imputer.fit(&records).unwrap();

        let row = imputer.transform(&records[2]).unwrap();
        assert_eq!(row[NumericColumn::TotalBedrooms], 250.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = Imputer::new(ImputeStrategy::Median);
        let err = imputer.transform(&record(None, 1.0)).unwrap_err();
        assert!(matches!(err, HousingError::NotFitted));
    }

    #[test]
    fn test_all_missing_column_fails() {
        let records = vec![record(None, 10.0), record(None, 20.0)];
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        assert!(imputer.fit(&records).is_err());
    }
}
