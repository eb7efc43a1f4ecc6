//! Savings report, allocation table and model comparison exports

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use super::comparison::ComparisonReport;
use crate::optimizer::{OptimizationResult, SolverStatus};
use crate::pipeline::{DecisionUnit, EstimatorKind, ModelScore};

/// Metadata about the optimization run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub freightopt_version: String,
    pub input_file: String,
    pub estimator: String,
    pub status: SolverStatus,
    pub iterations: usize,
    pub evaluations: usize,
    pub max_violation: f64,
}

/// Savings figures for one supplier
#[derive(Serialize)]
pub struct GroupSavings {
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub savings: f64,
    pub original_volume: f64,
    pub optimized_volume: f64,
}

#[derive(Serialize)]
pub struct SavingsTotals {
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub savings: f64,
    pub savings_pct: f64,
}

/// Top-level JSON document
#[derive(Serialize)]
pub struct SavingsExport {
    pub metadata: RunMetadata,
    pub totals: SavingsTotals,
    /// Keyed by supplier
    pub groups: BTreeMap<String, GroupSavings>,
}

/// Parameters that only the caller knows
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub estimator: EstimatorKind,
}

/// Build the savings document without writing it
pub fn build_savings_export(
    report: &ComparisonReport,
    result: &OptimizationResult,
    params: &ExportParams,
) -> SavingsExport {
    let groups = report
        .groups
        .iter()
        .map(|g| {
            (
                g.group.clone(),
                GroupSavings {
                    original_cost: g.original_cost,
                    optimized_cost: g.optimized_cost,
                    savings: g.savings,
                    original_volume: g.original_volume,
                    optimized_volume: g.optimized_volume,
                },
            )
        })
        .collect();

    SavingsExport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            freightopt_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            estimator: params.estimator.to_string(),
            status: result.status,
            iterations: result.iterations,
            evaluations: result.evaluations,
            max_violation: result.max_violation,
        },
        totals: SavingsTotals {
            original_cost: report.total_original_cost,
            optimized_cost: report.total_optimized_cost,
            savings: report.total_savings,
            savings_pct: report.total_savings_pct(),
        },
        groups,
    }
}

/// Write the savings report as pretty-printed JSON
pub fn export_savings_report(
    report: &ComparisonReport,
    result: &OptimizationResult,
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let export = build_savings_export(report, result, params);

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize savings report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write savings report to {}", output_path.display()))?;

    Ok(())
}

/// Per-unit allocation table in aggregation order
pub fn allocation_frame(
    units: &[DecisionUnit],
    optimized: &[f64],
    report: &ComparisonReport,
) -> Result<DataFrame> {
    if optimized.len() != units.len() {
        bail!(
            "Allocation has {} entries but there are {} decision units",
            optimized.len(),
            units.len()
        );
    }

    let columns = vec![
        Column::new(
            "supplier".into(),
            units.iter().map(|u| u.supplier.clone()).collect::<Vec<_>>(),
        ),
        Column::new("year".into(), units.iter().map(|u| u.year).collect::<Vec<_>>()),
        Column::new("week".into(), units.iter().map(|u| u.week).collect::<Vec<_>>()),
        Column::new(
            "fuel_surcharge".into(),
            units.iter().map(|u| u.fuel_surcharge).collect::<Vec<_>>(),
        ),
        Column::new(
            "max_capacity".into(),
            units.iter().map(|u| u.max_capacity).collect::<Vec<_>>(),
        ),
        Column::new(
            "packages_ordered".into(),
            units.iter().map(|u| u.packages_ordered).collect::<Vec<_>>(),
        ),
        Column::new("optimized_packages_ordered".into(), optimized.to_vec()),
        Column::new(
            "logistics_cost".into(),
            units.iter().map(|u| u.logistics_cost).collect::<Vec<_>>(),
        ),
        Column::new("predicted_cost".into(), report.original_unit_costs.clone()),
        Column::new(
            "optimized_predicted_cost".into(),
            report.optimized_unit_costs.clone(),
        ),
    ];

    DataFrame::new(columns).context("Failed to build allocation table")
}

/// Save dataset to file (CSV or Parquet based on extension)
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}

/// Plain-text model comparison, one block per estimator
pub fn format_model_comparison(scores: &[ModelScore]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model comparison ({})", Utc::now().to_rfc3339());
    for score in scores {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", score.estimator.label());
        let _ = writeln!(out, "  MAE: {:.4}", score.mae);
        let _ = writeln!(out, "  R2:  {:.4}", score.r2);
        let _ = writeln!(out, "  train/test: {}/{}", score.train_size, score.test_size);
    }
    out
}

pub fn export_model_comparison(scores: &[ModelScore], output_path: &Path) -> Result<()> {
    std::fs::write(output_path, format_model_comparison(scores))
        .with_context(|| format!("Failed to write model comparison to {}", output_path.display()))?;
    Ok(())
}
