//! Random forest regression
//!
//! Each tree is grown on a bootstrap sample drawn from an RNG seeded with
//! `seed + tree_index`, so the fitted forest does not depend on how rayon
//! schedules the trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::super::encoder::FeatureMatrix;
use super::super::error::PipelineError;
use super::tree::{RegressionTree, TreeParams};
use crate::utils::tree_progress;

/// Fitted forest; prediction is the mean over trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(
        x: &FeatureMatrix,
        y: &[f64],
        n_trees: usize,
        params: &TreeParams,
        seed: u64,
        show_progress: bool,
    ) -> Result<Self, PipelineError> {
        let n = x.n_rows();
        if n == 0 || n != y.len() {
            return Err(PipelineError::FitFailed {
                estimator: "forest",
                reason: format!("{} feature rows but {} targets", n, y.len()),
            });
        }
        if n_trees == 0 {
            return Err(PipelineError::FitFailed {
                estimator: "forest",
                reason: "at least one tree is required".to_string(),
            });
        }

        let pb = tree_progress(n_trees, show_progress);

        let trees: Vec<RegressionTree> = (0..n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let tree = RegressionTree::fit(x, y, &samples, params);
                pb.inc(1);
                tree
            })
            .collect();

        pb.finish_and_clear();

        Ok(Self { trees })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
