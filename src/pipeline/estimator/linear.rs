//! Ordinary least squares with intercept
//!
//! Features are standardized before solving the normal equations. A small
//! ridge term keeps the system positive definite when one-hot indicator
//! columns are collinear with the intercept.

use faer::prelude::*;
use faer::{Mat, Side};
use serde::{Deserialize, Serialize};

use super::super::encoder::FeatureMatrix;
use super::super::error::PipelineError;

/// Fitted linear model in the original feature space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit by least squares. `ridge` is relative to the sample count.
    pub fn fit(x: &FeatureMatrix, y: &[f64], ridge: f64) -> Result<Self, PipelineError> {
        let n = x.n_rows();
        let p = x.n_cols();
        if n == 0 || n != y.len() {
            return Err(PipelineError::FitFailed {
                estimator: "linear",
                reason: format!("{} feature rows but {} targets", n, y.len()),
            });
        }

        let mut means = vec![0.0; p];
        for row in x.rows() {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n as f64);

        let mut scales = vec![0.0; p];
        for row in x.rows() {
            for j in 0..p {
                let d = row[j] - means[j];
                scales[j] += d * d;
            }
        }
        // Constant columns get scale 1; they are all-zero after centering
        for s in scales.iter_mut() {
            *s = (*s / n as f64).sqrt();
            if *s < 1e-12 {
                *s = 1.0;
            }
        }

        let y_mean = y.iter().sum::<f64>() / n as f64;

        let mut z = Mat::<f64>::zeros(n, p);
        let mut yc = Mat::<f64>::zeros(n, 1);
        for (i, row) in x.rows().enumerate() {
            for j in 0..p {
                z[(i, j)] = (row[j] - means[j]) / scales[j];
            }
            yc[(i, 0)] = y[i] - y_mean;
        }

        // Normal equations: (ZᵀZ + λI) β = Zᵀy
        let mut gram = z.transpose() * &z;
        let zty = z.transpose() * &yc;

        let lambda = ridge.max(1e-12) * n as f64;
        for i in 0..p {
            gram[(i, i)] += lambda;
        }

        let beta = gram
            .cholesky(Side::Lower)
            .map_err(|_| PipelineError::FitFailed {
                estimator: "linear",
                reason: "normal equations are not positive definite".to_string(),
            })?
            .solve(zty.as_ref());
        if (0..p).any(|j| !beta[(j, 0)].is_finite()) {
            return Err(PipelineError::FitFailed {
                estimator: "linear",
                reason: "non-finite coefficients".to_string(),
            });
        }

        // Map back to the original feature space
        let coefficients: Vec<f64> = (0..p).map(|j| beta[(j, 0)] / scales[j]).collect();
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&means)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}
