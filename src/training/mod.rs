//! Model training module
//!
//! Provides the random-forest regressor used to predict median house
//! values, the regression tree it is built from, evaluation metrics and the
//! engine that runs a full training pass.

mod config;
mod engine;
mod metrics;
pub mod decision_tree;
pub mod random_forest;

pub use config::{MaxFeatures, TrainingConfig};
pub use engine::{evaluate, targets, TrainEngine, TrainedArtifacts, TrainingReport};
pub use metrics::RegressionMetrics;
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use random_forest::RandomForestRegressor;

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Feature matrix in, one scalar estimate per row out
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Short model name for logs and metadata
    fn name(&self) -> &'static str;
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForestRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForestRegressor::predict(self, x)
    }

    fn name(&self) -> &'static str {
        "random_forest_regressor"
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTreeRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTreeRegressor::predict(self, x)
    }

    fn name(&self) -> &'static str {
        "decision_tree_regressor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressors_behind_trait() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![10.0, 10.0, 30.0, 30.0];

        let mut models: Vec<Box<dyn Regressor>> = vec![
            Box::new(DecisionTreeRegressor::new()),
            Box::new(RandomForestRegressor::new(5).with_bootstrap(false)),
        ];

        for model in models.iter_mut() {
            model.fit(&x, &y).unwrap();
            let metrics = evaluate(model.as_ref(), &x, &y).unwrap();
            assert_eq!(metrics.rmse, 0.0, "{}", model.name());
        }
    }
}
