//! Concatenate per-supplier shipment files into one dataset

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use polars::prelude::*;

use crate::pipeline::{get_column_names, load_dataset, REQUIRED_COLUMNS};
use crate::report::save_dataset;
use crate::utils::{create_spinner, print_warning};

/// Stack the rows of every input file and write them to `output`.
///
/// Column dtypes are widened to a common supertype; inputs must share the
/// same column names. Returns the combined row count.
pub fn run_combine(inputs: &[PathBuf], output: &Path, infer_schema_length: usize) -> Result<usize> {
    println!(
        "\n {} Combining {} file(s)",
        style("◆").cyan().bold(),
        inputs.len()
    );
    for input in inputs {
        println!("   Input:  {}", style(input.display()).dim());

        let columns = get_column_names(input)?;
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.iter().any(|name| name == c))
            .collect();
        if !missing.is_empty() {
            print_warning(&format!(
                "{} is missing shipment column(s): {}",
                input.display(),
                missing.join(", ")
            ));
        }
    }
    println!("   Output: {}", style(output.display()).dim());
    println!();

    let frames = inputs
        .iter()
        .map(|p| load_dataset(p, infer_schema_length))
        .collect::<Result<Vec<LazyFrame>>>()?;

    let spinner = create_spinner("Concatenating rows...");
    let args = UnionArgs {
        to_supertypes: true,
        ..Default::default()
    };
    let mut df = concat(frames, args)
        .and_then(|lf| lf.collect())
        .context("Failed to concatenate input files (do they share the same columns?)")?;
    spinner.finish_with_message(format!("{} Rows concatenated", style("✓").green()));

    save_dataset(&mut df, output)?;

    println!();
    println!(
        "   {} rows × {} columns",
        style(df.height()).yellow(),
        style(df.width()).yellow()
    );
    println!();
    println!(" {} Combine complete!", style("✓").green().bold());

    Ok(df.height())
}
