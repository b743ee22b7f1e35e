//! Income-stratified train/test split
//!
//! Records are bucketed by [`IncomeCategory`] and each bucket contributes to
//! the test set in proportion to its size, so both subsets keep the income
//! distribution of the full dataset.

use crate::data::HousingRecord;
use crate::error::{HousingError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Ordinal income bucket 1..=5
///
/// Bins are right-closed: `(0, 1.5]`, `(1.5, 3]`, `(3, 4.5]`, `(4.5, 6]`,
/// `(6, inf)`. Income of zero, below zero or missing has no bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncomeCategory(u8);

impl IncomeCategory {
    /// Upper edges of the first four buckets
    pub const BREAKPOINTS: [f64; 4] = [1.5, 3.0, 4.5, 6.0];

    pub fn from_income(income: f64) -> Option<Self> {
        if !(income > 0.0) {
            return None;
        }
        let below = Self::BREAKPOINTS.iter().take_while(|&&edge| income > edge).count();
        Some(Self(below as u8 + 1))
    }

    pub fn of(record: &HousingRecord) -> Option<Self> {
        record.median_income.and_then(Self::from_income)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Result of a stratified split
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub train: Vec<HousingRecord>,
    pub test: Vec<HousingRecord>,
    /// Positions of the training records in the input
    pub train_indices: Vec<usize>,
    /// Positions of the test records in the input
    pub test_indices: Vec<usize>,
}

/// Single shuffled split that preserves income-category proportions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratifiedSplit {
    test_ratio: f64,
    random_state: Option<u64>,
}

impl Default for StratifiedSplit {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl StratifiedSplit {
    /// Create a splitter holding out `test_ratio` of the records
    pub fn new(test_ratio: f64) -> Self {
        Self {
            test_ratio,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Split `records` into disjoint train and test subsets
    pub fn split(&self, records: &[HousingRecord]) -> Result<SplitResult> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(HousingError::StratificationError(format!(
                "test ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }

        let n_samples = records.len();
        if n_samples < 2 {
            return Err(HousingError::StratificationError(format!(
                "need at least 2 records, got {}",
                n_samples
            )));
        }

        // Bucket order is fixed by the BTreeMap so the RNG stream is consumed
        // identically on every run.
        let mut strata: BTreeMap<IncomeCategory, Vec<usize>> = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            let category = IncomeCategory::of(record).ok_or_else(|| {
                HousingError::StratificationError(format!(
                    "record {} has no income category (median_income = {:?})",
                    idx, record.median_income
                ))
            })?;
            strata.entry(category).or_default().push(idx);
        }

        if let Some((category, members)) = strata.iter().find(|(_, m)| m.len() < 2) {
            return Err(HousingError::StratificationError(format!(
                "income category {} has only {} member(s); at least 2 are needed",
                category.value(),
                members.len()
            )));
        }

        let n_test = (self.test_ratio * n_samples as f64).ceil() as usize;
        let n_train = n_samples - n_test;
        let n_classes = strata.len();
        if n_test < n_classes || n_train < n_classes {
            return Err(HousingError::StratificationError(format!(
                "train size {} and test size {} must each be at least the number of income categories ({})",
                n_train, n_test, n_classes
            )));
        }

        let counts: Vec<usize> = strata.values().map(|m| m.len()).collect();
        let allocation = allocate_test_counts(&counts, n_test, n_samples);

        for ((category, members), &n_cat_test) in strata.iter().zip(allocation.iter()) {
            if n_cat_test == 0 || n_cat_test == members.len() {
                return Err(HousingError::StratificationError(format!(
                    "income category {} ({} members) cannot be represented in both subsets",
                    category.value(),
                    members.len()
                )));
            }
        }

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut train_indices = Vec::with_capacity(n_train);
        let mut test_indices = Vec::with_capacity(n_test);

        for (members, &n_cat_test) in strata.values().zip(allocation.iter()) {
            let mut shuffled = members.clone();
            shuffled.shuffle(&mut rng);
            test_indices.extend_from_slice(&shuffled[..n_cat_test]);
            train_indices.extend_from_slice(&shuffled[n_cat_test..]);
        }

        train_indices.shuffle(&mut rng);
        test_indices.shuffle(&mut rng);

        debug!(
            n_train = train_indices.len(),
            n_test = test_indices.len(),
            allocation = ?allocation,
            "Stratified split allocation"
        );

        let train: Vec<HousingRecord> = train_indices.iter().map(|&i| records[i].clone()).collect();
        let test: Vec<HousingRecord> = test_indices.iter().map(|&i| records[i].clone()).collect();

        info!(
            train = train.len(),
            test = test.len(),
            categories = n_classes,
            "Performed stratified split"
        );

        Ok(SplitResult {
            train,
            test,
            train_indices,
            test_indices,
        })
    }
}

/// Distribute `n_test` slots over strata proportionally to their sizes
///
/// Every stratum gets the floor of its exact share; the leftover slots go to
/// the strata with the largest fractional parts, ties to the lower category.
fn allocate_test_counts(counts: &[usize], n_test: usize, n_samples: usize) -> Vec<usize> {
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n_samples as f64)
        .collect();
    let mut allocation: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let assigned: usize = allocation.iter().sum();
    let mut leftover = n_test.saturating_sub(assigned);

    let mut by_remainder: Vec<usize> = (0..counts.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    for idx in by_remainder {
        if leftover == 0 {
            break;
        }
        if allocation[idx] < counts[idx] {
            allocation[idx] += 1;
            leftover -= 1;
        }
    }

    allocation
}

/// Share of each income category among `records`
pub fn income_category_proportions(records: &[HousingRecord]) -> Result<BTreeMap<u8, f64>> {
    if records.is_empty() {
        return Err(HousingError::StratificationError("no records".to_string()));
    }

    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let category = IncomeCategory::of(record).ok_or_else(|| {
            HousingError::StratificationError(format!("record {} has no income category", idx))
        })?;
        *counts.entry(category.value()).or_insert(0) += 1;
    }

    let n = records.len() as f64;
    Ok(counts.into_iter().map(|(k, c)| (k, c as f64 / n)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_income(income: Option<f64>) -> HousingRecord {
        HousingRecord {
            longitude: Some(-120.0),
            latitude: Some(36.0),
            housing_median_age: Some(20.0),
            total_rooms: Some(1000.0),
            total_bedrooms: Some(200.0),
            population: Some(500.0),
            households: Some(180.0),
            median_income: income,
            ocean_proximity: "INLAND".to_string(),
            median_house_value: Some(150000.0),
        }
    }

    fn skewed_records(n: usize) -> Vec<HousingRecord> {
        // Uneven category sizes: 5%, 30%, 35%, 20%, 10%
        (0..n)
            .map(|i| {
                let r = i % 20;
                let income = match r {
                    0 => 1.0,
                    1..=6 => 2.5,
                    7..=13 => 3.7,
                    14..=17 => 5.2,
                    _ => 8.0,
                };
                record_with_income(Some(income + (i as f64) * 1e-6))
            })
            .collect()
    }

    #[test]
    fn test_income_category_bins() {
        assert_eq!(IncomeCategory::from_income(0.5).unwrap().value(), 1);
        assert_eq!(IncomeCategory::from_income(1.5).unwrap().value(), 1);
        assert_eq!(IncomeCategory::from_income(1.51).unwrap().value(), 2);
        assert_eq!(IncomeCategory::from_income(3.0).unwrap().value(), 2);
        assert_eq!(IncomeCategory::from_income(4.5).unwrap().value(), 3);
        assert_eq!(IncomeCategory::from_income(6.0).unwrap().value(), 4);
        assert_eq!(IncomeCategory::from_income(15.0001).unwrap().value(), 5);
        assert!(IncomeCategory::from_income(0.0).is_none());
        assert!(IncomeCategory::from_income(-1.0).is_none());
        assert!(IncomeCategory::from_income(f64::NAN).is_none());
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let records = skewed_records(1000);
        let result = StratifiedSplit::new(0.2).with_random_state(42).split(&records).unwrap();

        assert_eq!(result.test.len(), 200);
        assert_eq!(result.train.len(), 800);

        let mut all: Vec<usize> = result
            .train_indices
            .iter()
            .chain(result.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_preserves_proportions() {
        let records = skewed_records(2000);
        let result = StratifiedSplit::new(0.2).with_random_state(42).split(&records).unwrap();

        let full = income_category_proportions(&records).unwrap();
        let train = income_category_proportions(&result.train).unwrap();
        let test = income_category_proportions(&result.test).unwrap();

        for (category, share) in &full {
            assert!((train[category] - share).abs() < 0.01, "train category {}", category);
            assert!((test[category] - share).abs() < 0.01, "test category {}", category);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let records = skewed_records(500);
        let splitter = StratifiedSplit::new(0.2).with_random_state(7);

        let a = splitter.split(&records).unwrap();
        let b = splitter.split(&records).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
        assert_eq!(a.test_indices, b.test_indices);

        let c = StratifiedSplit::new(0.2).with_random_state(8).split(&records).unwrap();
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_tiny_category_fails() {
        let mut records = skewed_records(100)
            .into_iter()
            .filter(|r| IncomeCategory::of(r).unwrap().value() != 1)
            .collect::<Vec<_>>();
        records.push(record_with_income(Some(0.9)));

        let err = StratifiedSplit::new(0.2).with_random_state(42).split(&records).unwrap_err();
        assert!(matches!(err, HousingError::StratificationError(_)));
    }

    #[test]
    fn test_category_that_cannot_reach_test_set_fails() {
        // Two members of category 1 among 100 records: its test share rounds to zero
        let mut records: Vec<HousingRecord> =
            (0..98).map(|_| record_with_income(Some(5.0))).collect();
        records.push(record_with_income(Some(1.0)));
        records.push(record_with_income(Some(1.2)));

        let err = StratifiedSplit::new(0.1).with_random_state(42).split(&records).unwrap_err();
        assert!(matches!(err, HousingError::StratificationError(_)));
    }

    #[test]
    fn test_missing_income_fails() {
        let mut records = skewed_records(100);
        records[3].median_income = None;

        let err = StratifiedSplit::new(0.2).with_random_state(42).split(&records).unwrap_err();
        assert!(matches!(err, HousingError::StratificationError(_)));
    }

    #[test]
    fn test_allocation_sums_to_test_size() {
        let counts = [7, 13, 29, 31, 20];
        let allocation = allocate_test_counts(&counts, 20, 100);
        assert_eq!(allocation.iter().sum::<usize>(), 20);
        for (a, c) in allocation.iter().zip(counts.iter()) {
            assert!(*a <= *c);
        }
    }
}
