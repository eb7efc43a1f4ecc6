//! CLI module - argument parsing, subcommands and interactive prompts

mod args;
pub mod combine;
mod prompts;

pub use args::{sibling_path, Cli, Commands, ModelArgs};
pub use prompts::*;
