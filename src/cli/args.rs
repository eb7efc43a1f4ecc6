//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::optimizer::OptimizerConfig;
use crate::pipeline::{EstimatorConfig, SplitConfig};

/// freightopt - Predict logistics cost and reallocate weekly shipment volumes
#[derive(Parser, Debug)]
#[command(name = "freightopt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input file path (CSV or Parquet) with one row per shipment record
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Allocation output path (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_optimized' suffix (e.g., data.csv → data_optimized.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Savings report path (JSON).
    /// Defaults to input directory with '_savings.json' suffix.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Previously fitted pipeline (JSON from `freightopt fit`).
    /// When given, no model is trained and holdout metrics are skipped.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    #[command(flatten)]
    pub model_args: ModelArgs,

    /// Fraction of decision units held out to score the model (0 = train on all)
    #[arg(long, default_value = "0.2", value_parser = validate_test_size)]
    pub test_size: f64,

    /// Maximum number of optimizer iterations
    #[arg(long, default_value = "1000")]
    pub max_iterations: usize,

    /// Optimizer convergence tolerance on the step and relative objective change
    #[arg(long, default_value = "1e-6", value_parser = validate_positive)]
    pub tolerance: f64,

    /// Relative finite-difference step for gradient estimation.
    /// Raise it for tree-based models whose predictions are piecewise constant.
    #[arg(long, default_value = "1e-3", value_parser = validate_positive)]
    pub gradient_step: f64,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

/// Estimator settings shared by the pipeline and the `fit` / `evaluate` subcommands
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Regression algorithm: "linear", "forest" (default) or "boosting"
    #[arg(short, long, default_value = "forest")]
    pub estimator: String,

    /// Number of trees in the random forest
    #[arg(long, default_value = "100")]
    pub trees: usize,

    /// Number of gradient boosting stages
    #[arg(long, default_value = "100")]
    pub boosting_stages: usize,

    /// Gradient boosting learning rate (0, 1]
    #[arg(long, default_value = "0.1", value_parser = validate_learning_rate)]
    pub learning_rate: f64,

    /// Seed for the train/test split and bootstrap sampling
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// What to do with a supplier the model never saw: "error" or "zero-fill"
    #[arg(long, default_value = "error")]
    pub unknown_category: String,
}

impl ModelArgs {
    /// Library estimator configuration for these arguments
    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            n_trees: self.trees,
            boosting_stages: self.boosting_stages,
            learning_rate: self.learning_rate,
            seed: self.seed,
            ..EstimatorConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Concatenate several shipment files (one per supplier) into one dataset
    Combine {
        /// Input files (CSV or Parquet), at least one
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output file path (CSV or Parquet)
        #[arg(short, long)]
        output: PathBuf,

        /// Number of rows to use for schema inference
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },

    /// Fit a cost model on all decision units and save it as JSON
    Fit {
        /// Input file path (CSV or Parquet)
        input: PathBuf,

        /// Model output path (defaults to input with '_model.json' suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        model_args: ModelArgs,

        /// Skip interactive confirmation prompts
        #[arg(long, default_value = "false")]
        no_confirm: bool,

        /// Number of rows to use for schema inference
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },

    /// Compare linear, random forest and gradient boosting models on a holdout split
    Evaluate {
        /// Input file path (CSV or Parquet)
        input: PathBuf,

        /// Fraction of decision units held out for scoring
        #[arg(long, default_value = "0.2", value_parser = validate_test_size)]
        test_size: f64,

        #[command(flatten)]
        model_args: ModelArgs,

        /// Write the comparison as plain text to this path
        #[arg(long)]
        export: Option<PathBuf>,

        /// Number of rows to use for schema inference
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },
}

impl Cli {
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Get the allocation output path, deriving from input if not explicitly provided.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(self.output.clone().unwrap_or_else(|| {
            let extension = input
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("csv");
            sibling_path(input, &format!("_optimized.{}", extension))
        }))
    }

    /// Get the savings report path, deriving from input if not explicitly provided.
    pub fn report_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(
            self.report
                .clone()
                .unwrap_or_else(|| sibling_path(input, "_savings.json")),
        )
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            gradient_step: self.gradient_step,
            show_progress: true,
            ..OptimizerConfig::default()
        }
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            test_size: self.test_size,
            seed: self.model_args.seed,
        }
    }
}

/// `dir/stem<suffix>` next to `input`
pub fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    parent.join(format!("{}{}", stem, suffix))
}

/// Validator for test_size: [0, 1)
fn validate_test_size(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..1.0).contains(&value) {
        Err(format!("test_size must be in [0.0, 1.0), got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for strictly positive tolerances and step sizes
fn validate_positive(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("value must be a positive number, got {}", value))
    }
}

/// Validator for learning_rate: (0, 1]
fn validate_learning_rate(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("learning_rate must be in (0.0, 1.0], got {}", value))
    }
}
