//! Pipeline domain types.
//!
//! - **config**: the schema-checked transformation document ([`PipelineConfig`])
//! - **model**: stored definitions, runs, and their status enums
//!
//! A definition is created once (by synthesis or by hand) and afterwards only
//! mutated by the executor through the store: `last_run`, `status` and
//! `error_log`. Runs are append-only and immutable once finalized.

pub mod config;
pub mod model;

pub use config::{PipelineConfig, PipelineStep};
pub use model::{
    ErrorRecord, PipelineDefinition, PipelineRun, PipelineStatus, RunOutcome, RunStatus,
};
