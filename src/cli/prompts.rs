//! Interactive prompts using dialoguer

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Ask before replacing files that already exist. Returns true when there is
/// nothing to overwrite or the user agreed.
pub fn confirm_overwrite(paths: &[&Path], no_confirm: bool) -> Result<bool> {
    let existing: Vec<String> = paths
        .iter()
        .filter(|p| p.exists())
        .map(|p| p.display().to_string())
        .collect();

    if existing.is_empty() || no_confirm {
        return Ok(true);
    }

    confirm_step(&format!("Overwrite existing file(s): {}?", existing.join(", ")))
}
