//! CSV loading into [`HousingRecord`]s

use super::{HousingRecord, NumericColumn, CATEGORICAL_COLUMN, TARGET_COLUMN};
use crate::error::{HousingError, Result};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Load the housing CSV
///
/// All eight numeric columns and `ocean_proximity` are required; the target
/// column is read when present so the same loader serves unlabeled files.
pub fn load_housing_csv(path: &Path) -> Result<Vec<HousingRecord>> {
    let start = Instant::now();

    if !path.exists() {
        return Err(HousingError::DataError(format!(
            "dataset file not found: {}",
            path.display()
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .map_err(|e| HousingError::MalformedDataset(e.to_string()))?;

    let records = records_from_dataframe(&df)?;

    info!(
        path = %path.display(),
        rows = records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded housing data"
    );

    Ok(records)
}

/// Convert an already loaded frame into records
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<HousingRecord>> {
    if df.height() == 0 {
        return Err(HousingError::MalformedDataset("dataset has no rows".to_string()));
    }

    let numeric: Vec<Vec<Option<f64>>> = NumericColumn::ALL
        .iter()
        .map(|c| numeric_column(df, c.name()))
        .collect::<Result<_>>()?;

    let categories = string_column(df, CATEGORICAL_COLUMN)?;

    let targets = if df.column(TARGET_COLUMN).is_ok() {
        numeric_column(df, TARGET_COLUMN)?
    } else {
        debug!("No target column present, loading unlabeled records");
        vec![None; df.height()]
    };

    let missing = numeric
        .iter()
        .zip(NumericColumn::ALL.iter())
        .filter_map(|(values, column)| {
            let nulls = values.iter().filter(|v| v.is_none()).count();
            (nulls > 0).then(|| format!("{}={}", column, nulls))
        })
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        debug!(missing = %missing.join(", "), "Numeric columns with missing values");
    }

    let records = (0..df.height())
        .map(|i| {
            let ocean_proximity = categories[i].clone().ok_or_else(|| {
                HousingError::MalformedDataset(format!(
                    "row {} has no {}",
                    i, CATEGORICAL_COLUMN
                ))
            })?;

            let value = |column: NumericColumn| numeric[column.index()][i];

            Ok(HousingRecord {
                longitude: value(NumericColumn::Longitude),
                latitude: value(NumericColumn::Latitude),
                housing_median_age: value(NumericColumn::HousingMedianAge),
                total_rooms: value(NumericColumn::TotalRooms),
                total_bedrooms: value(NumericColumn::TotalBedrooms),
                population: value(NumericColumn::Population),
                households: value(NumericColumn::Households),
                median_income: value(NumericColumn::MedianIncome),
                ocean_proximity,
                median_house_value: targets[i],
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(records)
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| HousingError::FeatureNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| HousingError::MalformedDataset(format!("{}: {}", name, e)))?;
    let ca = casted.f64()?;

    Ok(ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| HousingError::FeatureNotFound(name.to_string()))?;
    let casted = column.cast(&DataType::String)?;
    let ca = casted.str()?;

    Ok(ca
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_CSV: &str = "\
longitude,latitude,housing_median_age,total_rooms,total_bedrooms,population,households,median_income,median_house_value,ocean_proximity
-122.23,37.88,41.0,880.0,129.0,322.0,126.0,8.3252,452600.0,NEAR BAY
-122.22,37.86,21.0,7099.0,,2401.0,1138.0,8.3014,358500.0,NEAR BAY
-121.09,39.48,25.0,1665.0,374.0,845.0,330.0,1.5603,78100.0,INLAND
";

    #[test]
    fn test_load_csv_with_missing_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CSV.as_bytes()).unwrap();

        let records = load_housing_csv(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].total_rooms, Some(880.0));
        assert_eq!(records[0].ocean_proximity, "NEAR BAY");
        assert_eq!(records[1].total_bedrooms, None);
        assert_eq!(records[2].median_house_value, Some(78100.0));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"longitude,latitude\n-122.0,37.0\n").unwrap();

        let err = load_housing_csv(file.path()).unwrap_err();
        assert!(matches!(err, HousingError::FeatureNotFound(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_housing_csv(Path::new("/nonexistent/housing.csv")).unwrap_err();
        assert!(matches!(err, HousingError::DataError(_)));
    }
}
