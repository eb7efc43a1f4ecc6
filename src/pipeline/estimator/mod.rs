//! Cost estimators
//!
//! An estimator is fitted once on encoded decision units and then frozen.
//! The optimizer treats it as an opaque scoring function, so prediction must
//! be pure: same feature matrix in, same costs out, regardless of call order.

mod boosting;
mod forest;
mod linear;
mod tree;

use serde::{Deserialize, Serialize};

use super::encoder::FeatureMatrix;
use super::error::PipelineError;

pub use boosting::GradientBoosting;
pub use forest::RandomForest;
pub use linear::LinearModel;
pub use tree::{RegressionTree, TreeParams};

/// Regression algorithm used for the cost model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimatorKind {
    /// Ordinary least squares
    Linear,
    /// Random forest of CART trees (default)
    #[default]
    Forest,
    /// Gradient boosted shallow trees
    Boosting,
}

impl EstimatorKind {
    pub const ALL: [EstimatorKind; 3] = [
        EstimatorKind::Linear,
        EstimatorKind::Forest,
        EstimatorKind::Boosting,
    ];

    /// Human-readable model name for reports
    pub fn label(&self) -> &'static str {
        match self {
            EstimatorKind::Linear => "Linear Regression",
            EstimatorKind::Forest => "Random Forest",
            EstimatorKind::Boosting => "Gradient Boosting",
        }
    }
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimatorKind::Linear => write!(f, "linear"),
            EstimatorKind::Forest => write!(f, "forest"),
            EstimatorKind::Boosting => write!(f, "boosting"),
        }
    }
}

impl std::str::FromStr for EstimatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(EstimatorKind::Linear),
            "forest" | "random-forest" => Ok(EstimatorKind::Forest),
            "boosting" | "gradient-boosting" => Ok(EstimatorKind::Boosting),
            _ => Err(format!(
                "Unknown estimator: '{}'. Use 'linear', 'forest', or 'boosting'.",
                s
            )),
        }
    }
}

/// Fitting parameters for all estimator kinds
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Number of trees in the random forest
    pub n_trees: usize,
    /// Depth limit for forest trees (None = unlimited)
    pub forest_max_depth: Option<usize>,
    /// Minimum samples per leaf for forest and boosting trees
    pub min_samples_leaf: usize,
    /// Number of boosting stages
    pub boosting_stages: usize,
    /// Shrinkage applied to each boosting stage
    pub learning_rate: f64,
    /// Depth of each boosting tree
    pub boosting_max_depth: usize,
    /// Relative ridge term for the linear model
    pub ridge: f64,
    /// Base seed for all fit-time randomness
    pub seed: u64,
    /// Show a progress bar while growing forest trees
    pub show_progress: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            forest_max_depth: None,
            min_samples_leaf: 1,
            boosting_stages: 100,
            learning_rate: 0.1,
            boosting_max_depth: 3,
            ridge: 1e-8,
            seed: 42,
            show_progress: false,
        }
    }
}

/// A fitted cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearModel),
    Forest(RandomForest),
    Boosting(GradientBoosting),
}

impl Estimator {
    /// Fit an estimator of the given kind on `(x, y)`
    pub fn fit(
        kind: EstimatorKind,
        x: &FeatureMatrix,
        y: &[f64],
        config: &EstimatorConfig,
    ) -> Result<Self, PipelineError> {
        match kind {
            EstimatorKind::Linear => Ok(Estimator::Linear(LinearModel::fit(x, y, config.ridge)?)),
            EstimatorKind::Forest => {
                let params = TreeParams {
                    max_depth: config.forest_max_depth,
                    min_samples_split: 2,
                    min_samples_leaf: config.min_samples_leaf,
                };
                Ok(Estimator::Forest(RandomForest::fit(
                    x,
                    y,
                    config.n_trees,
                    &params,
                    config.seed,
                    config.show_progress,
                )?))
            }
            EstimatorKind::Boosting => {
                let params = TreeParams {
                    max_depth: Some(config.boosting_max_depth),
                    min_samples_split: 2,
                    min_samples_leaf: config.min_samples_leaf,
                };
                Ok(Estimator::Boosting(GradientBoosting::fit(
                    x,
                    y,
                    config.boosting_stages,
                    config.learning_rate,
                    &params,
                )?))
            }
        }
    }

    pub fn kind(&self) -> EstimatorKind {
        match self {
            Estimator::Linear(_) => EstimatorKind::Linear,
            Estimator::Forest(_) => EstimatorKind::Forest,
            Estimator::Boosting(_) => EstimatorKind::Boosting,
        }
    }

    /// Predict the cost of one encoded row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Estimator::Linear(m) => m.predict_row(row),
            Estimator::Forest(m) => m.predict_row(row),
            Estimator::Boosting(m) => m.predict_row(row),
        }
    }

    /// Predict one cost per row of `x`
    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().map(|row| self.predict_row(row)).collect()
    }
}
