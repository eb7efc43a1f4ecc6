//! Terminal summaries for optimization runs

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use super::comparison::ComparisonReport;
use crate::optimizer::{OptimizationResult, SolverStatus};
use crate::pipeline::ModelScore;

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn money(value: f64) -> Cell {
    Cell::new(format!("{:.2}", value)).set_alignment(CellAlignment::Right)
}

fn signed(value: f64) -> Cell {
    let color = if value > 0.0 {
        Color::Green
    } else if value < 0.0 {
        Color::Red
    } else {
        Color::White
    };
    money(value).fg(color)
}

/// Solver outcome overview
pub fn display_optimization(result: &OptimizationResult) {
    print_section("🧮", "OPTIMIZATION SUMMARY");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Metric", "Value"]));

    let status_color = match result.status {
        SolverStatus::Converged => Color::Green,
        SolverStatus::IterationLimit => Color::Yellow,
        SolverStatus::Infeasible => Color::Red,
    };
    table.add_row(vec![
        Cell::new("Status"),
        Cell::new(result.status)
            .fg(status_color)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("Iterations"), Cell::new(result.iterations)]);
    table.add_row(vec![Cell::new("Objective evaluations"), Cell::new(result.evaluations)]);
    table.add_row(vec![Cell::new("Initial predicted cost"), money(result.initial_objective)]);
    table.add_row(vec![Cell::new("Optimized predicted cost"), money(result.objective)]);
    table.add_row(vec![Cell::new("Improvement"), signed(result.improvement())]);
    table.add_row(vec![
        Cell::new("Max constraint violation"),
        Cell::new(format!("{:.2e}", result.max_violation)),
    ]);
    if result.phase_one {
        table.add_row(vec![
            Cell::new("Start repaired"),
            Cell::new("yes (phase-one LP)").fg(Color::Yellow),
        ]);
    }

    print_indented(&table);
}

/// Per-supplier savings table with totals
pub fn display_comparison(report: &ComparisonReport) {
    print_section("💰", "SAVINGS BY SUPPLIER");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "Supplier",
        "Weeks",
        "Original Cost",
        "Optimized Cost",
        "Savings",
        "Savings %",
        "Mean Orig.",
        "Mean Opt.",
    ]));

    for g in &report.groups {
        table.add_row(vec![
            Cell::new(&g.group),
            Cell::new(g.units),
            money(g.original_cost),
            money(g.optimized_cost),
            signed(g.savings),
            Cell::new(format!("{:.1}%", g.savings_pct())).set_alignment(CellAlignment::Right),
            money(g.mean_original_cost),
            money(g.mean_optimized_cost),
        ]);
    }

    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        Cell::new(report.groups.iter().map(|g| g.units).sum::<usize>()),
        money(report.total_original_cost).add_attribute(Attribute::Bold),
        money(report.total_optimized_cost).add_attribute(Attribute::Bold),
        signed(report.total_savings).add_attribute(Attribute::Bold),
        Cell::new(format!("{:.1}%", report.total_savings_pct()))
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
    ]);

    print_indented(&table);
}

/// Original vs optimized total volume per supplier
pub fn display_volume_check(report: &ComparisonReport, tolerance: f64) {
    print_section("📦", "VOLUME VERIFICATION");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Supplier", "Original Volume", "Optimized Volume", "Check"]));

    for g in &report.groups {
        let ok = (g.original_volume - g.optimized_volume).abs() <= tolerance;
        table.add_row(vec![
            Cell::new(&g.group),
            money(g.original_volume),
            money(g.optimized_volume),
            if ok {
                Cell::new("✓").fg(Color::Green)
            } else {
                Cell::new("✗").fg(Color::Red)
            },
        ]);
    }

    print_indented(&table);
}

/// Holdout MAE and R² per estimator
pub fn display_model_scores(scores: &[ModelScore]) {
    print_section("📈", "MODEL EVALUATION");

    let best = scores
        .iter()
        .map(|s| s.mae)
        .fold(f64::INFINITY, f64::min);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Model", "MAE", "R²", "Train", "Test"]));

    for score in scores {
        let name = Cell::new(score.estimator.label());
        let name = if score.mae == best && scores.len() > 1 {
            name.fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            name
        };
        table.add_row(vec![
            name,
            money(score.mae),
            Cell::new(format!("{:.4}", score.r2)).set_alignment(CellAlignment::Right),
            Cell::new(score.train_size),
            Cell::new(score.test_size),
        ]);
    }

    print_indented(&table);
}
