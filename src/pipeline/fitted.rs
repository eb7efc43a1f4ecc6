//! Fitted encoder + estimator, persisted as one JSON document

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::aggregate::DecisionUnit;
use super::encoder::{FeatureEncoder, UnknownCategoryPolicy};
use super::error::PipelineError;
use super::estimator::{Estimator, EstimatorConfig, EstimatorKind};

/// A frozen cost model. Everything downstream only borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    encoder: FeatureEncoder,
    estimator: Estimator,
    /// Number of decision units the model was trained on
    training_rows: usize,
}

impl FittedPipeline {
    /// Fit the encoder vocabulary and the estimator on `units`, using each
    /// unit's summed logistics cost as the target.
    pub fn fit(
        units: &[DecisionUnit],
        kind: EstimatorKind,
        config: &EstimatorConfig,
        policy: UnknownCategoryPolicy,
    ) -> Result<Self, PipelineError> {
        let encoder = FeatureEncoder::fit(units, policy)?;
        let x = encoder.encode_units(units)?;
        let y: Vec<f64> = units.iter().map(|u| u.logistics_cost).collect();
        let estimator = Estimator::fit(kind, &x, &y, config)?;

        Ok(Self {
            encoder,
            estimator,
            training_rows: units.len(),
        })
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Predicted cost per unit at the units' own decision values
    pub fn predict_units(&self, units: &[DecisionUnit]) -> Result<Vec<f64>, PipelineError> {
        let x = self.encoder.encode_units(units)?;
        Ok(self.estimator.predict(&x))
    }

    /// Predicted cost per unit with the decision values replaced by `decision`
    pub fn predict(&self, units: &[DecisionUnit], decision: &[f64]) -> Result<Vec<f64>, PipelineError> {
        let x = self.encoder.encode(units, decision)?;
        Ok(self.estimator.predict(&x))
    }

    /// Sum of predicted costs under `decision`
    pub fn total_cost(&self, units: &[DecisionUnit], decision: &[f64]) -> Result<f64, PipelineError> {
        Ok(self.predict(units, decision)?.iter().sum())
    }

    /// Write the pipeline as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create model file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write model file: {}", path.display()))?;
        Ok(())
    }

    /// Load a pipeline previously written by [`FittedPipeline::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file: {}", path.display()))?;
        let pipeline: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse model file: {}", path.display()))?;
        Ok(pipeline)
    }
}
