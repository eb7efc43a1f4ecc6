//! Dataset loader for CSV and Parquet shipment files

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::PipelineError;

/// Columns every shipment dataset must provide
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "supplier",
    "year",
    "week",
    "fuel_surcharge",
    "packages_ordered",
    "max_capacity",
    "logistics_cost",
];

/// One raw shipment row as read from the input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub supplier: String,
    pub year: i32,
    pub week: u32,
    pub fuel_surcharge: f64,
    pub packages_ordered: f64,
    pub max_capacity: f64,
    pub logistics_cost: f64,
}

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Load and validate shipment records from a CSV or Parquet file
pub fn load_records(path: &Path, infer_schema_length: usize) -> Result<Vec<ShipmentRecord>> {
    let df = load_dataset(path, infer_schema_length)?
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    let records = records_from_dataframe(&df)
        .with_context(|| format!("Invalid shipment data in {}", path.display()))?;

    Ok(records)
}

/// Convert a DataFrame into shipment records, validating every required field.
///
/// Numeric columns must have a numeric dtype, be non-null and finite.
/// Volumes, capacities and costs must additionally be non-negative.
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<ShipmentRecord>, PipelineError> {
    let available: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for column in REQUIRED_COLUMNS {
        if !available.iter().any(|c| c == column) {
            return Err(PipelineError::MissingColumn {
                column: column.to_string(),
                available: available.clone(),
            });
        }
    }

    if df.height() == 0 {
        return Err(PipelineError::EmptyDataset);
    }

    let suppliers = string_column(df, "supplier")?;
    let years = integer_column(df, "year")?;
    let weeks = integer_column(df, "week")?;
    let fuel = float_column(df, "fuel_surcharge", false)?;
    let packages = float_column(df, "packages_ordered", true)?;
    let capacity = float_column(df, "max_capacity", true)?;
    let cost = float_column(df, "logistics_cost", true)?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let week = u32::try_from(weeks[row]).map_err(|_| PipelineError::InvalidValue {
            column: "week".to_string(),
            row,
            value: weeks[row] as f64,
            reason: "must be a non-negative week number",
        })?;
        let year = i32::try_from(years[row]).map_err(|_| PipelineError::InvalidValue {
            column: "year".to_string(),
            row,
            value: years[row] as f64,
            reason: "out of range for a calendar year",
        })?;

        records.push(ShipmentRecord {
            supplier: suppliers[row].clone(),
            year,
            week,
            fuel_surcharge: fuel[row],
            packages_ordered: packages[row],
            max_capacity: capacity[row],
            logistics_cost: cost[row],
        });
    }

    Ok(records)
}

/// Get column names from a dataset file without loading all rows
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let schema = load_dataset(path, 100)?
        .collect_schema()
        .with_context(|| format!("Failed to read schema: {}", path.display()))?;
    Ok(schema.iter_names().map(|s| s.to_string()).collect())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>, PipelineError> {
    let column = df
        .column(name)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(|e| PipelineError::InvalidType {
            column: name.to_string(),
            expected: "text",
            found: e.to_string(),
        })?;
    let ca = column.str().map_err(|e| PipelineError::InvalidType {
        column: name.to_string(),
        expected: "text",
        found: e.to_string(),
    })?;

    ca.iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(PipelineError::NullValue {
                column: name.to_string(),
                row,
            }),
        })
        .collect()
}

fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<i64>, PipelineError> {
    let values = float_column(df, name, false)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            if v.fract() != 0.0 {
                Err(PipelineError::InvalidValue {
                    column: name.to_string(),
                    row,
                    value: v,
                    reason: "must be a whole number",
                })
            } else {
                Ok(v as i64)
            }
        })
        .collect()
}

fn float_column(df: &DataFrame, name: &str, non_negative: bool) -> Result<Vec<f64>, PipelineError> {
    let column = df.column(name).map_err(|_| PipelineError::MissingColumn {
        column: name.to_string(),
        available: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })?;

    // Casting a text column to Float64 silently produces nulls, so check the dtype first
    if !column.dtype().is_primitive_numeric() {
        return Err(PipelineError::InvalidType {
            column: name.to_string(),
            expected: "numeric",
            found: column.dtype().to_string(),
        });
    }

    let float_col = column
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::InvalidType {
            column: name.to_string(),
            expected: "numeric",
            found: e.to_string(),
        })?;
    let ca = float_col.f64().map_err(|e| PipelineError::InvalidType {
        column: name.to_string(),
        expected: "numeric",
        found: e.to_string(),
    })?;

    let mut values = Vec::with_capacity(ca.len());
    for (row, opt_val) in ca.iter().enumerate() {
        let v = opt_val.ok_or_else(|| PipelineError::NullValue {
            column: name.to_string(),
            row,
        })?;
        if !v.is_finite() {
            return Err(PipelineError::InvalidValue {
                column: name.to_string(),
                row,
                value: v,
                reason: "must be finite",
            });
        }
        if non_negative && v < 0.0 {
            return Err(PipelineError::InvalidValue {
                column: name.to_string(),
                row,
                value: v,
                reason: "must be non-negative",
            });
        }
        values.push(v);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_df() -> DataFrame {
        df! {
            "supplier" => ["A", "B"],
            "year" => [2023i64, 2023],
            "week" => [1i64, 2],
            "fuel_surcharge" => [0.1f64, 0.2],
            "packages_ordered" => [100.0f64, 200.0],
            "max_capacity" => [150.0f64, 250.0],
            "logistics_cost" => [1000.0f64, 1900.0],
        }
        .unwrap()
    }

    #[test]
    fn test_records_from_valid_dataframe() {
        let records = records_from_dataframe(&valid_df()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].supplier, "A");
        assert_eq!(records[1].week, 2);
        assert_eq!(records[1].packages_ordered, 200.0);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let df = valid_df().drop("week").unwrap();
        let err = records_from_dataframe(&df).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "week"));
    }

    #[test]
    fn test_text_in_numeric_column_is_rejected() {
        let mut df = valid_df();
        df.with_column(Column::new("fuel_surcharge".into(), ["high", "low"]))
            .unwrap();
        let err = records_from_dataframe(&df).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidType { .. }));
    }

    #[test]
    fn test_null_value_is_rejected() {
        let mut df = valid_df();
        df.with_column(Column::new(
            "max_capacity".into(),
            [Some(150.0f64), None],
        ))
        .unwrap();
        let err = records_from_dataframe(&df).unwrap_err();
        assert!(matches!(err, PipelineError::NullValue { row: 1, .. }));
    }

    #[test]
    fn test_negative_volume_is_rejected() {
        let mut df = valid_df();
        df.with_column(Column::new("packages_ordered".into(), [100.0f64, -5.0]))
            .unwrap();
        let err = records_from_dataframe(&df).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn test_fractional_week_is_rejected() {
        let mut df = valid_df();
        df.with_column(Column::new("week".into(), [1.5f64, 2.0]))
            .unwrap();
        let err = records_from_dataframe(&df).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { ref column, .. } if column == "week"));
    }
}
