//! Shared fixtures: deterministic synthetic housing data

#![allow(dead_code)]

use calhousing::data::HousingRecord;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "longitude,latitude,housing_median_age,total_rooms,total_bedrooms,population,households,median_income,median_house_value,ocean_proximity";

/// Categories present in the synthetic data; ISLAND is deliberately absent
pub const CATEGORIES: [&str; 4] = ["<1H OCEAN", "INLAND", "NEAR BAY", "NEAR OCEAN"];

/// `n` records whose value is driven mostly by income, plus a coastal premium
///
/// Roughly one in twenty records has a blank `total_bedrooms`.
pub fn synthetic_records(n: usize, seed: u64) -> Vec<HousingRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let income: f64 = rng.gen_range(0.5..10.0);
            let households: f64 = rng.gen_range(50.0..1500.0_f64).round();
            let rooms = (households * rng.gen_range(3.0..7.0)).round();
            let bedrooms = (rooms * rng.gen_range(0.15..0.3)).round();
            let population = (households * rng.gen_range(2.0..4.0)).round();
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            let premium = match category {
                "INLAND" => -40_000.0,
                "NEAR BAY" => 60_000.0,
                _ => 20_000.0,
            };
            let value = 40_000.0 + 40_000.0 * income + premium + rng.gen_range(-10_000.0..10_000.0);

            HousingRecord {
                longitude: Some(rng.gen_range(-124.0..-114.0)),
                latitude: Some(rng.gen_range(32.0..42.0)),
                housing_median_age: Some(rng.gen_range(1..=52) as f64),
                total_rooms: Some(rooms),
                total_bedrooms: if rng.gen_bool(0.05) { None } else { Some(bedrooms) },
                population: Some(population),
                households: Some(households),
                median_income: Some(income),
                ocean_proximity: category.to_string(),
                median_house_value: Some(value.max(15_000.0)),
            }
        })
        .collect()
}

fn field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write records as a housing CSV under `dir`
pub fn write_csv(dir: &Path, records: &[HousingRecord]) -> PathBuf {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            field(r.longitude),
            field(r.latitude),
            field(r.housing_median_age),
            field(r.total_rooms),
            field(r.total_bedrooms),
            field(r.population),
            field(r.households),
            field(r.median_income),
            field(r.median_house_value),
            r.ocean_proximity
        )
        .unwrap();
    }

    let path = dir.join("housing.csv");
    std::fs::write(&path, out).unwrap();
    path
}

/// The first row of the real dataset
pub fn near_bay_record() -> HousingRecord {
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
        median_house_value: None,
    }
}
