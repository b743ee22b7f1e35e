//! Derived household ratios
//!
//! Stateless: the same row always produces the same attributes, so there is
//! nothing to fit or persist.

use crate::data::{NumericColumn, NumericRow};

/// Names of the derived columns, in the order they are appended
pub fn derived_names(add_bedrooms_per_room: bool) -> Vec<&'static str> {
    let mut names = vec!["rooms_per_household", "population_per_household"];
    if add_bedrooms_per_room {
        names.push("bedrooms_per_room");
    }
    names
}

/// `numerator / denominator`, or 0 when the denominator is zero or the
/// quotient is not finite
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let q = numerator / denominator;
    if q.is_finite() { q } else { 0.0 }
}

/// The row's numeric attributes followed by its derived ratios
pub fn combined_attributes(row: &NumericRow, add_bedrooms_per_room: bool) -> Vec<f64> {
    let households = row[NumericColumn::Households];
    let total_rooms = row[NumericColumn::TotalRooms];

    let mut values = Vec::with_capacity(NumericColumn::ALL.len() + 3);
    values.extend_from_slice(&row.0);
    values.push(safe_ratio(total_rooms, households));
    values.push(safe_ratio(row[NumericColumn::Population], households));
    if add_bedrooms_per_room {
        values.push(safe_ratio(row[NumericColumn::TotalBedrooms], total_rooms));
    }
    values
}
