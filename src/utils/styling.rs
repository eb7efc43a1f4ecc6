//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;

use crate::pipeline::{EstimatorKind, UnknownCategoryPolicy};

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static MODEL: Emoji<'_, '_> = Emoji("🌲 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ┌─┐┬─┐┌─┐┬┌─┐┬ ┬┌┬┐┌─┐┌─┐┌┬┐
    ├┤ ├┬┘├┤ ││ ┬├─┤ │ │ │├─┘ │
    └  ┴└─└─┘┴└─┘┴ ┴ ┴ └─┘┴   ┴
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Predict logistics cost, rebalance weekly volumes").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown in the configuration card
pub struct RunConfig<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub report: &'a Path,
    pub model: Option<&'a Path>,
    pub estimator: EstimatorKind,
    pub policy: UnknownCategoryPolicy,
    pub test_size: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

const CARD_WIDTH: usize = 56;

/// One `│  icon label value │` row, value padded to the card edge
fn card_row(icon: &Emoji<'_, '_>, label: &str, value: &str) {
    let width = CARD_WIDTH - 8 - label.chars().count();
    println!(
        "    │  {} {} {:<width$}│",
        icon,
        label,
        truncate_string(value, width - 1),
        width = width
    );
}

/// Print configuration card
pub fn print_config(config: &RunConfig) {
    let line = "─".repeat(CARD_WIDTH - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(CARD_WIDTH - 20)
    );
    println!("    ├{}┤", line);
    card_row(&FOLDER, "Input: ", &config.input.display().to_string());
    card_row(&SAVE, "Output:", &config.output.display().to_string());
    card_row(&SAVE, "Report:", &config.report.display().to_string());
    println!("    ├{}┤", line);

    let model = match config.model {
        Some(path) => path.display().to_string(),
        None => format!(
            "{} (test size {:.0}%)",
            config.estimator.label(),
            config.test_size * 100.0
        ),
    };
    card_row(&MODEL, "Model: ", &model);
    card_row(&GEAR, "Unknown suppliers:", &config.policy.to_string());
    card_row(&GEAR, "Max iterations:   ", &config.max_iterations.to_string());
    card_row(&GEAR, "Tolerance:        ", &format!("{:.0e}", config.tolerance));
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("freightopt optimization complete!").green().bold()
    );
    println!();
}

/// `Found <count> <description> <detail>`
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!(
            "      Found {} {}",
            style(count).yellow().bold(),
            description
        );
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let tail: String = s
            .chars()
            .rev()
            .take(max_len - 3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    }
}
