//! Pipeline module - ingestion, aggregation, encoding and cost models

pub mod aggregate;
pub mod encoder;
pub mod error;
pub mod estimator;
pub mod fitted;
pub mod loader;
pub mod metrics;

pub use aggregate::*;
pub use encoder::*;
pub use error::PipelineError;
pub use estimator::{Estimator, EstimatorConfig, EstimatorKind};
pub use fitted::FittedPipeline;
pub use loader::*;
pub use metrics::*;
