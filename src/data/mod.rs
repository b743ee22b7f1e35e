//! Housing record schema and dataset access
//!
//! - [`HousingRecord`] is one census block row
//! - [`NumericColumn`] fixes the order of the numeric attributes so every
//!   stage reads fields by name instead of by position
//! - [`fetch`] downloads and unpacks the dataset archive
//! - [`loader`] turns the CSV into records

pub mod fetch;
pub mod loader;

pub use fetch::DatasetFetcher;
pub use loader::load_housing_csv;

use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

/// Name of the categorical column
pub const CATEGORICAL_COLUMN: &str = "ocean_proximity";

/// Name of the target column
pub const TARGET_COLUMN: &str = "median_house_value";

/// Numeric attributes in their canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericColumn {
    Longitude,
    Latitude,
    HousingMedianAge,
    TotalRooms,
    TotalBedrooms,
    Population,
    Households,
    MedianIncome,
}

impl NumericColumn {
    /// All numeric columns, in feature-matrix order
    pub const ALL: [NumericColumn; 8] = [
        NumericColumn::Longitude,
        NumericColumn::Latitude,
        NumericColumn::HousingMedianAge,
        NumericColumn::TotalRooms,
        NumericColumn::TotalBedrooms,
        NumericColumn::Population,
        NumericColumn::Households,
        NumericColumn::MedianIncome,
    ];

    /// Column name as it appears in the CSV header
    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::Longitude => "longitude",
            NumericColumn::Latitude => "latitude",
            NumericColumn::HousingMedianAge => "housing_median_age",
            NumericColumn::TotalRooms => "total_rooms",
            NumericColumn::TotalBedrooms => "total_bedrooms",
            NumericColumn::Population => "population",
            NumericColumn::Households => "households",
            NumericColumn::MedianIncome => "median_income",
        }
    }

    /// Position within [`NumericColumn::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The five proximity-to-ocean categories of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OceanProximity {
    LessThanOneHour,
    Inland,
    Island,
    NearBay,
    NearOcean,
}

impl OceanProximity {
    pub const ALL: [OceanProximity; 5] = [
        OceanProximity::LessThanOneHour,
        OceanProximity::Inland,
        OceanProximity::Island,
        OceanProximity::NearBay,
        OceanProximity::NearOcean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OceanProximity::LessThanOneHour => "<1H OCEAN",
            OceanProximity::Inland => "INLAND",
            OceanProximity::Island => "ISLAND",
            OceanProximity::NearBay => "NEAR BAY",
            OceanProximity::NearOcean => "NEAR OCEAN",
        }
    }
}

impl fmt::Display for OceanProximity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OceanProximity {
    type Err = HousingError;

    fn from_str(s: &str) -> Result<Self> {
        OceanProximity::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| HousingError::UnknownCategory {
                column: CATEGORICAL_COLUMN.to_string(),
                value: s.to_string(),
            })
    }
}

/// One census block
///
/// Numeric fields are optional because the raw CSV has blanks
/// (`total_bedrooms` in particular). The target is absent at inference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingRecord {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub housing_median_age: Option<f64>,
    pub total_rooms: Option<f64>,
    pub total_bedrooms: Option<f64>,
    pub population: Option<f64>,
    pub households: Option<f64>,
    pub median_income: Option<f64>,
    pub ocean_proximity: String,
    pub median_house_value: Option<f64>,
}

impl HousingRecord {
    /// Value of a numeric attribute
    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Longitude => self.longitude,
            NumericColumn::Latitude => self.latitude,
            NumericColumn::HousingMedianAge => self.housing_median_age,
            NumericColumn::TotalRooms => self.total_rooms,
            NumericColumn::TotalBedrooms => self.total_bedrooms,
            NumericColumn::Population => self.population,
            NumericColumn::Households => self.households,
            NumericColumn::MedianIncome => self.median_income,
        }
    }

    /// All numeric attributes in [`NumericColumn::ALL`] order
    pub fn numeric_values(&self) -> [Option<f64>; 8] {
        NumericColumn::ALL.map(|c| self.numeric(c))
    }

    /// Target value, failing when the record has none
    pub fn target(&self) -> Result<f64> {
        self.median_house_value.ok_or_else(|| {
            HousingError::DataError(format!("record has no {}", TARGET_COLUMN))
        })
    }
}

/// Numeric attributes after imputation, indexed by [`NumericColumn`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRow(pub [f64; 8]);

impl Index<NumericColumn> for NumericRow {
    type Output = f64;

    fn index(&self, column: NumericColumn) -> &f64 {
        &self.0[column.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near_bay_record() -> HousingRecord {
        HousingRecord {
            longitude: Some(-122.23),
            latitude: Some(37.88),
            housing_median_age: Some(41.0),
            total_rooms: Some(880.0),
            total_bedrooms: Some(129.0),
            population: Some(322.0),
            households: Some(126.0),
            median_income: Some(8.3252),
            ocean_proximity: "NEAR BAY".to_string(),
            median_house_value: Some(452600.0),
        }
    }

    #[test]
    fn test_numeric_order_matches_names() {
        let names: Vec<&str> = NumericColumn::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "longitude",
                "latitude",
                "housing_median_age",
                "total_rooms",
                "total_bedrooms",
                "population",
                "households",
                "median_income",
            ]
        );
        for (i, c) in NumericColumn::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn test_numeric_values() {
        let record = near_bay_record();
        let values = record.numeric_values();
        assert_eq!(values[NumericColumn::TotalRooms.index()], Some(880.0));
        assert_eq!(values[NumericColumn::Households.index()], Some(126.0));
        assert_eq!(record.target().unwrap(), 452600.0);
    }

    #[test]
    fn test_ocean_proximity_parse() {
        assert_eq!("NEAR BAY".parse::<OceanProximity>().unwrap(), OceanProximity::NearBay);
        assert_eq!("<1H OCEAN".parse::<OceanProximity>().unwrap(), OceanProximity::LessThanOneHour);
        assert!("MOUNTAIN".parse::<OceanProximity>().is_err());
    }

    #[test]
    fn test_numeric_row_index() {
        let row = NumericRow([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(row[NumericColumn::TotalRooms], 4.0);
        assert_eq!(row[NumericColumn::MedianIncome], 8.0);
    }
}
