//! Command-line interface for reel-forge.
//!
//! Provides the `generate` and `critique` commands.

mod commands;

pub use commands::{
    critique_state_file, load_brief, parse_cli, run, run_with_cli, Cli, Commands,
    GenerationSummary,
};
