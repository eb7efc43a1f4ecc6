//! freightopt: Logistics Cost Optimization CLI Tool
//!
//! Fits a cost model on weekly shipment data and reallocates shipment
//! volumes across weeks to minimize total predicted logistics cost.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use console::style;

use freightopt::cli::{combine::run_combine, confirm_overwrite, sibling_path, Cli, Commands, ModelArgs};
use freightopt::optimizer::{optimize, SolverStatus};
use freightopt::pipeline::{
    aggregate, compare_models, holdout_score, load_records, train_test_split, Aggregation,
    DecisionUnit, EstimatorKind, FittedPipeline, PipelineError, SplitConfig, UnknownCategoryPolicy,
};
use freightopt::report::{
    allocation_frame, compare, display_comparison, display_model_scores, display_optimization,
    display_volume_check, export_model_comparison, export_savings_report, save_dataset,
    ExportParams,
};
use freightopt::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_success, print_warning,
    RunConfig,
};

/// Group sums are reported as preserved within this absolute tolerance
const VOLUME_TOLERANCE: f64 = 1e-3;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Combine {
                inputs,
                output,
                infer_schema_length,
            } => run_combine(inputs, output, *infer_schema_length).map(|_| ()),
            Commands::Fit {
                input,
                output,
                model_args,
                no_confirm,
                infer_schema_length,
            } => {
                let output = output
                    .clone()
                    .unwrap_or_else(|| sibling_path(input, "_model.json"));
                run_fit(input, &output, model_args, *no_confirm, *infer_schema_length)
            }
            Commands::Evaluate {
                input,
                test_size,
                model_args,
                export,
                infer_schema_length,
            } => run_evaluate(
                input,
                *test_size,
                model_args,
                export.as_deref(),
                *infer_schema_length,
            ),
        };
    }

    run_optimize(&cli)
}

fn parse_model_args(args: &ModelArgs) -> Result<(EstimatorKind, UnknownCategoryPolicy)> {
    let kind = args.estimator.parse::<EstimatorKind>().map_err(|e| anyhow!(e))?;
    let policy = args
        .unknown_category
        .parse::<UnknownCategoryPolicy>()
        .map_err(|e| anyhow!(e))?;
    Ok((kind, policy))
}

/// Load shipment records and aggregate them into weekly decision units
fn load_units(input: &Path, infer_schema_length: usize) -> Result<Aggregation> {
    let spinner = create_spinner("Loading shipment records...");
    let records = load_records(input, infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    let aggregation = aggregate(&records)
        .with_context(|| format!("Failed to aggregate shipments from {}", input.display()))?;

    print_count("shipment record(s)", records.len(), None);
    print_count(
        "weekly decision unit(s)",
        aggregation.units.len(),
        Some(&format!("across {} supplier(s)", aggregation.constraints.len())),
    );

    Ok(aggregation)
}

fn subset(units: &[DecisionUnit], indices: &[usize]) -> Vec<DecisionUnit> {
    indices.iter().map(|&i| units[i].clone()).collect()
}

/// Fit on the training split, print holdout metrics, then refit on every unit
/// so the optimizer sees all suppliers.
fn fit_with_holdout(
    units: &[DecisionUnit],
    kind: EstimatorKind,
    model_args: &ModelArgs,
    policy: UnknownCategoryPolicy,
    split: &SplitConfig,
) -> Result<FittedPipeline> {
    let mut config = model_args.estimator_config();
    config.show_progress = true;

    let (train, test) = train_test_split(units.len(), split);
    if !test.is_empty() {
        let train_units = subset(units, &train);
        let holdout = FittedPipeline::fit(&train_units, kind, &config, policy)?;
        match holdout_score(&holdout, units, &test, train.len()) {
            Ok(score) => {
                println!(
                    "\n    {} Holdout metrics ({} train / {} test units):",
                    style("✧").cyan(),
                    score.train_size,
                    score.test_size
                );
                println!("      MAE: {:.4}", score.mae);
                println!("      R²:  {:.4}", score.r2);
            }
            Err(PipelineError::UnknownCategory { supplier, .. }) => print_warning(&format!(
                "Holdout skipped: supplier '{}' only appears in the test split",
                supplier
            )),
            Err(e) => return Err(e.into()),
        }
    }

    let pipeline = FittedPipeline::fit(units, kind, &config, policy)?;
    print_success(&format!(
        "{} fitted on {} unit(s)",
        kind.label(),
        pipeline.training_rows()
    ));
    Ok(pipeline)
}

fn run_optimize(cli: &Cli) -> Result<()> {
    let input = cli.input().ok_or_else(|| {
        anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;
    let output_path = cli
        .output_path()
        .ok_or_else(|| anyhow!("Could not derive an output path"))?;
    let report_path = cli
        .report_path()
        .ok_or_else(|| anyhow!("Could not derive a report path"))?;
    let (kind, policy) = parse_model_args(&cli.model_args)?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&RunConfig {
        input,
        output: &output_path,
        report: &report_path,
        model: cli.model.as_deref(),
        estimator: kind,
        policy,
        test_size: cli.test_size,
        max_iterations: cli.max_iterations,
        tolerance: cli.tolerance,
    });

    // Step 1: Load and aggregate
    print_step_header(1, "Load & Aggregate");
    let Aggregation { units, constraints } = load_units(input, cli.infer_schema_length)?;

    // Step 2: Cost model
    print_step_header(2, "Cost Model");
    let pipeline = match &cli.model {
        Some(path) => {
            let pipeline = FittedPipeline::load(path)?;
            print_info(&format!(
                "Loaded {} model trained on {} unit(s)",
                pipeline.estimator().kind().label(),
                pipeline.training_rows()
            ));
            pipeline
        }
        None => fit_with_holdout(&units, kind, &cli.model_args, policy, &cli.split_config())?,
    };

    // Step 3: Optimize
    print_step_header(3, "Optimize Allocation");
    let result = optimize(&pipeline, &units, &constraints, &cli.optimizer_config())?;
    display_optimization(&result);

    match result.status {
        SolverStatus::Converged => print_success("Optimizer converged"),
        SolverStatus::IterationLimit => print_warning(&format!(
            "Iteration limit of {} reached before convergence; using the last feasible iterate",
            cli.max_iterations
        )),
        SolverStatus::Infeasible => {
            for g in &result.infeasible_groups {
                print_warning(&format!(
                    "Supplier '{}' needs {:.2} but weekly capacities only allow {:.2}",
                    g.group, g.target_sum, g.capacity
                ));
            }
        }
    }
    let allocation = result.clone().into_allocation()?;

    // Step 4: Compare
    print_step_header(4, "Compare Allocations");
    let comparison = compare(&pipeline, &units, &constraints, &allocation)?;
    display_comparison(&comparison);
    display_volume_check(&comparison, VOLUME_TOLERANCE);

    // Step 5: Save
    print_step_header(5, "Save Results");
    if !confirm_overwrite(&[output_path.as_path(), report_path.as_path()], cli.no_confirm)? {
        print_info("Kept existing files; nothing written");
        return Ok(());
    }

    let spinner = create_spinner("Writing allocation...");
    let mut df = allocation_frame(&units, &allocation, &comparison)?;
    save_dataset(&mut df, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));

    let params = ExportParams {
        input_file: &input.display().to_string(),
        estimator: pipeline.estimator().kind(),
    };
    export_savings_report(&comparison, &result, &report_path, &params)?;
    print_success(&format!("Savings report saved to {}", report_path.display()));

    print_completion();
    Ok(())
}

fn run_fit(
    input: &Path,
    output: &Path,
    model_args: &ModelArgs,
    no_confirm: bool,
    infer_schema_length: usize,
) -> Result<()> {
    let (kind, policy) = parse_model_args(model_args)?;
    println!("\n {} Fitting {}", style("◆").cyan().bold(), kind.label());
    println!("   Input:  {}", style(input.display()).dim());
    println!("   Output: {}", style(output.display()).dim());
    println!();

    let aggregation = load_units(input, infer_schema_length)?;

    let mut config = model_args.estimator_config();
    config.show_progress = true;
    let pipeline = FittedPipeline::fit(&aggregation.units, kind, &config, policy)?;
    print_success("Cost model fitted");

    if !confirm_overwrite(&[output], no_confirm)? {
        print_info("Kept existing model; nothing written");
        return Ok(());
    }
    pipeline.save(output)?;
    print_success(&format!("Model saved to {}", output.display()));
    Ok(())
}

fn run_evaluate(
    input: &Path,
    test_size: f64,
    model_args: &ModelArgs,
    export: Option<&Path>,
    infer_schema_length: usize,
) -> Result<()> {
    let (_, policy) = parse_model_args(model_args)?;
    println!("\n {} Evaluating cost models", style("◆").cyan().bold());
    println!("   Input:  {}", style(input.display()).dim());
    println!();

    let aggregation = load_units(input, infer_schema_length)?;
    let split = SplitConfig {
        test_size,
        seed: model_args.seed,
    };

    let spinner = create_spinner("Fitting linear, forest and boosting models...");
    let scores = match compare_models(
        &aggregation.units,
        &EstimatorKind::ALL,
        &model_args.estimator_config(),
        &split,
        policy,
    ) {
        Ok(scores) => {
            finish_with_success(&spinner, "Models evaluated");
            scores
        }
        Err(e) => {
            finish_with_warning(&spinner, "Model evaluation failed");
            return Err(e).context("Try --unknown-category zero-fill or a smaller --test-size");
        }
    };
    display_model_scores(&scores);

    if let Some(path) = export {
        export_model_comparison(&scores, path)?;
        print_success(&format!("Comparison saved to {}", path.display()));
    }
    Ok(())
}
