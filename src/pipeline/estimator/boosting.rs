//! Gradient boosted regression trees with squared loss

use serde::{Deserialize, Serialize};

use super::super::encoder::FeatureMatrix;
use super::super::error::PipelineError;
use super::tree::{RegressionTree, TreeParams};

/// Fitted boosting ensemble: `init + learning_rate * Σ tree(x)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    stages: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit(
        x: &FeatureMatrix,
        y: &[f64],
        n_stages: usize,
        learning_rate: f64,
        params: &TreeParams,
    ) -> Result<Self, PipelineError> {
        let n = x.n_rows();
        if n == 0 || n != y.len() {
            return Err(PipelineError::FitFailed {
                estimator: "boosting",
                reason: format!("{} feature rows but {} targets", n, y.len()),
            });
        }
        if !(learning_rate > 0.0 && learning_rate <= 1.0) {
            return Err(PipelineError::FitFailed {
                estimator: "boosting",
                reason: format!("learning rate must be in (0, 1], got {}", learning_rate),
            });
        }

        let init = y.iter().sum::<f64>() / n as f64;
        let mut current = vec![init; n];
        let samples: Vec<usize> = (0..n).collect();
        let mut stages = Vec::with_capacity(n_stages);

        for _ in 0..n_stages {
            // Negative gradient of squared loss is the residual
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            let tree = RegressionTree::fit(x, &residuals, &samples, params);
            for (i, row) in x.rows().enumerate() {
                current[i] += learning_rate * tree.predict_row(row);
            }
            stages.push(tree);
        }

        Ok(Self {
            init,
            learning_rate,
            stages,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate * self.stages.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boosting_reduces_training_error() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..30).map(|i| (i as f64 / 3.0).sin() * 10.0 + i as f64).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let params = TreeParams {
            max_depth: Some(3),
            ..TreeParams::default()
        };

        let short = GradientBoosting::fit(&x, &y, 5, 0.1, &params).unwrap();
        let long = GradientBoosting::fit(&x, &y, 100, 0.1, &params).unwrap();

        let sse = |m: &GradientBoosting| -> f64 {
            rows.iter()
                .zip(&y)
                .map(|(r, t)| (m.predict_row(r) - t).powi(2))
                .sum()
        };
        assert!(sse(&long) < sse(&short));
        assert_eq!(long.n_stages(), 100);
    }

    #[test]
    fn test_zero_stages_predicts_mean() {
        let x = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let model = GradientBoosting::fit(&x, &[4.0, 8.0], 0, 0.1, &TreeParams::default()).unwrap();
        assert_eq!(model.predict_row(&[1.0]), 6.0);
    }

    #[test]
    fn test_invalid_learning_rate_rejected() {
        let x = FeatureMatrix::from_rows(&[vec![1.0]]).unwrap();
        assert!(GradientBoosting::fit(&x, &[1.0], 3, 0.0, &TreeParams::default()).is_err());
    }
}
