//! Command-line interface for pipeforge.
//!
//! Provides commands for source inspection, pipeline synthesis, storage,
//! execution and schedule generation.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
