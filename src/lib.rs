//! pipeforge: AI-assisted data pipeline builder.
//!
//! Inspects tabular and structured data sources, asks an LLM to synthesize a
//! pipeline configuration from a plain-language description, persists the
//! result in SQLite, executes it with run tracking, and renders Airflow DAGs
//! for scheduling.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod inspect;
pub mod llm;
pub mod pipeline;
pub mod schedule;
pub mod store;
pub mod synth;

pub use config::ForgeConfig;
pub use error::{
    ConfigError, ConfigValidationError, ExecutionError, InspectError, LlmError, ScheduleError,
    StoreError, SynthesisError, TransformationError,
};
pub use executor::{ExecutionResult, PipelineExecutor, Transformation, TransformationOutput};
pub use inspect::{SchemaSummary, SourceInspector, SourceKind};
pub use pipeline::{PipelineConfig, PipelineDefinition, PipelineRun, PipelineStatus, RunStatus};
pub use schedule::ScheduleArtifactGenerator;
pub use store::PipelineStore;
pub use synth::PipelineSynthesizer;
