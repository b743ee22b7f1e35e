//! Prediction form: field bounds and input validation

use crate::data::{HousingRecord, NumericColumn, OceanProximity};
use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};

/// Value domain of a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Any decimal within bounds
    Decimal,
    /// Whole numbers only
    Integer,
}

/// Declared bounds for one numeric input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub column: NumericColumn,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Check a value against this field's bounds and kind
    pub fn check(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(HousingError::ValidationError(format!(
                "{} must be a finite number",
                self.label
            )));
        }
        if value < self.min || value > self.max {
            return Err(HousingError::ValidationError(format!(
                "{} must be between {} and {}, got {}",
                self.label, self.min, self.max, value
            )));
        }
        if self.kind == FieldKind::Integer && value.fract() != 0.0 {
            return Err(HousingError::ValidationError(format!(
                "{} must be a whole number, got {}",
                self.label, value
            )));
        }
        Ok(())
    }

    /// Starting value offered by the form
    pub fn default_value(&self) -> f64 {
        self.min
    }
}

/// Form fields in feature order
pub const FIELDS: [FieldSpec; 8] = [
    FieldSpec {
        column: NumericColumn::Longitude,
        label: "Longitude",
        min: -124.0,
        max: -114.0,
        kind: FieldKind::Decimal,
    },
    FieldSpec {
        column: NumericColumn::Latitude,
        label: "Latitude",
        min: 32.0,
        max: 42.0,
        kind: FieldKind::Decimal,
    },
    FieldSpec {
        column: NumericColumn::HousingMedianAge,
        label: "Housing Median Age",
        min: 1.0,
        max: 52.0,
        kind: FieldKind::Integer,
    },
    FieldSpec {
        column: NumericColumn::TotalRooms,
        label: "Total Rooms",
        min: 2.0,
        max: 10_000.0,
        kind: FieldKind::Integer,
    },
    FieldSpec {
        column: NumericColumn::TotalBedrooms,
        label: "Total Bedrooms",
        min: 1.0,
        max: 3_000.0,
        kind: FieldKind::Integer,
    },
    FieldSpec {
        column: NumericColumn::Population,
        label: "Population",
        min: 1.0,
        max: 20_000.0,
        kind: FieldKind::Integer,
    },
    FieldSpec {
        column: NumericColumn::Households,
        label: "Households",
        min: 1.0,
        max: 5_000.0,
        kind: FieldKind::Integer,
    },
    FieldSpec {
        column: NumericColumn::MedianIncome,
        label: "Median Income",
        min: 0.0,
        max: 15.0,
        kind: FieldKind::Decimal,
    },
];

/// Bounds of the field feeding `column`
pub fn field_spec(column: NumericColumn) -> &'static FieldSpec {
    &FIELDS[column.index()]
}

/// One submission of the prediction form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInput {
    pub longitude: f64,
    pub latitude: f64,
    pub housing_median_age: f64,
    pub total_rooms: f64,
    pub total_bedrooms: f64,
    pub population: f64,
    pub households: f64,
    pub median_income: f64,
    pub ocean_proximity: OceanProximity,
}

impl Default for FormInput {
    fn default() -> Self {
        let mut values = [0.0; 8];
        for (value, spec) in values.iter_mut().zip(FIELDS.iter()) {
            *value = spec.default_value();
        }
        Self::from_values(values, OceanProximity::LessThanOneHour)
    }
}

impl FormInput {
    /// Build from values in feature order
    pub fn from_values(values: [f64; 8], ocean_proximity: OceanProximity) -> Self {
        let [longitude, latitude, housing_median_age, total_rooms, total_bedrooms, population, households, median_income] =
            values;
        Self {
            longitude,
            latitude,
            housing_median_age,
            total_rooms,
            total_bedrooms,
            population,
            households,
            median_income,
            ocean_proximity,
        }
    }

    /// Value entered for `column`
    pub fn value(&self, column: NumericColumn) -> f64 {
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

    /// Check every field against its declared bounds
    pub fn validate(&self) -> Result<()> {
        for spec in FIELDS.iter() {
            spec.check(self.value(spec.column))?;
        }
        Ok(())
    }

    /// Unlabelled record for the pipeline
    pub fn to_record(&self) -> HousingRecord {
        HousingRecord {
            longitude: Some(self.longitude),
            latitude: Some(self.latitude),
            housing_median_age: Some(self.housing_median_age),
            total_rooms: Some(self.total_rooms),
            total_bedrooms: Some(self.total_bedrooms),
            population: Some(self.population),
            households: Some(self.households),
            median_income: Some(self.median_income),
            ocean_proximity: self.ocean_proximity.as_str().to_string(),
            median_house_value: None,
        }
    }
}
