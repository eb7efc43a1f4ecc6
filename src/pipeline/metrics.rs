//! Holdout evaluation and model comparison

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::aggregate::DecisionUnit;
use super::encoder::UnknownCategoryPolicy;
use super::error::PipelineError;
use super::estimator::{EstimatorConfig, EstimatorKind};
use super::fitted::FittedPipeline;

/// Train/test split settings
#[derive(Debug, Clone, Copy)]
pub struct SplitConfig {
    /// Fraction of units held out for testing (0 = train on everything)
    pub test_size: f64,
    /// Shuffle seed
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Holdout score of one fitted model
#[derive(Debug, Clone, Serialize)]
pub struct ModelScore {
    pub estimator: EstimatorKind,
    pub mae: f64,
    pub r2: f64,
    pub train_size: usize,
    pub test_size: usize,
}

/// Shuffle `0..n` and split into (train, test) index sets.
///
/// The test set has `ceil(n * test_size)` members, but at least one row is
/// always kept for training. Both sets are returned sorted so that callers
/// preserve the aggregation ordering.
pub fn train_test_split(n: usize, config: &SplitConfig) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < 2 || config.test_size <= 0.0 {
        return (indices, Vec::new());
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * config.test_size).ceil() as usize).min(n - 1);
    let mut test = indices[..n_test].to_vec();
    let mut train = indices[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Score a fitted pipeline on the held-out units
pub fn holdout_score(
    pipeline: &FittedPipeline,
    units: &[DecisionUnit],
    test: &[usize],
    train_size: usize,
) -> Result<ModelScore, PipelineError> {
    let test_units: Vec<DecisionUnit> = test.iter().map(|&i| units[i].clone()).collect();
    let actual: Vec<f64> = test_units.iter().map(|u| u.logistics_cost).collect();
    let predicted = pipeline.predict_units(&test_units)?;

    Ok(ModelScore {
        estimator: pipeline.estimator().kind(),
        mae: mean_absolute_error(&actual, &predicted),
        r2: r2_score(&actual, &predicted),
        train_size,
        test_size: test.len(),
    })
}

/// Fit every estimator kind on the same split and score each on the holdout.
///
/// Scores are computed on aggregated weekly units with the full encoding
/// (supplier indicators included), not on raw shipment records.
///
/// With `UnknownCategoryPolicy::Error`, a supplier that only appears in the
/// test split aborts the comparison.
pub fn compare_models(
    units: &[DecisionUnit],
    kinds: &[EstimatorKind],
    config: &EstimatorConfig,
    split: &SplitConfig,
    policy: UnknownCategoryPolicy,
) -> Result<Vec<ModelScore>, PipelineError> {
    let (train, test) = train_test_split(units.len(), split);
    if test.is_empty() {
        return Err(PipelineError::FitFailed {
            estimator: "comparison",
            reason: "model comparison needs a non-empty test split".to_string(),
        });
    }
    let train_units: Vec<DecisionUnit> = train.iter().map(|&i| units[i].clone()).collect();

    kinds
        .iter()
        .map(|&kind| {
            let pipeline = FittedPipeline::fit(&train_units, kind, config, policy)?;
            holdout_score(&pipeline, units, &test, train.len())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(10, &SplitConfig::default());
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);
        assert!(test.iter().all(|t| !train.contains(t)));
    }

    #[test]
    fn test_split_is_reproducible() {
        let a = train_test_split(50, &SplitConfig::default());
        let b = train_test_split(50, &SplitConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_test_size_keeps_everything() {
        let config = SplitConfig {
            test_size: 0.0,
            seed: 1,
        };
        let (train, test) = train_test_split(5, &config);
        assert_eq!(train, vec![0, 1, 2, 3, 4]);
        assert!(test.is_empty());
    }

    #[test]
    fn test_split_keeps_a_training_row() {
        let config = SplitConfig {
            test_size: 1.0,
            seed: 1,
        };
        let (train, test) = train_test_split(3, &config);
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 2);
    }

    #[test]
    fn test_mae_and_r2() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean_absolute_error(&actual, &[1.0, 2.0, 3.0, 5.0]), 0.25);
        assert_eq!(r2_score(&actual, &actual), 1.0);
        // Predicting the mean scores zero
        assert_eq!(r2_score(&actual, &[2.5; 4]), 0.0);
    }

    #[test]
    fn test_r2_constant_target() {
        assert_eq!(r2_score(&[3.0, 3.0], &[3.0, 3.0]), 1.0);
        assert_eq!(r2_score(&[3.0, 3.0], &[2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_compare_models_scores_weekly_units() {
        let units: Vec<DecisionUnit> = (1..=20)
            .map(|w| {
                let packages = ((w * 7) % 23 + w) as f64;
                DecisionUnit {
                    supplier: "A".to_string(),
                    year: 2024,
                    week: w,
                    fuel_surcharge: 1.0,
                    max_capacity: 100.0,
                    logistics_cost: 100.0 + 3.0 * packages,
                    packages_ordered: packages,
                    record_count: 1,
                }
            })
            .collect();
        let config = EstimatorConfig {
            n_trees: 5,
            boosting_stages: 10,
            ..EstimatorConfig::default()
        };

        let scores = compare_models(
            &units,
            &EstimatorKind::ALL,
            &config,
            &SplitConfig::default(),
            UnknownCategoryPolicy::Error,
        )
        .unwrap();

        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| s.train_size == 16 && s.test_size == 4));
        assert_eq!(scores[0].estimator, EstimatorKind::Linear);
        assert!(scores[0].r2 > 0.999);
    }
}
