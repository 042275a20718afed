//! Error types for pipeforge operations.
//!
//! Defines one error enum per subsystem:
//! - Source inspection
//! - LLM API interactions and pipeline synthesis
//! - Pipeline storage
//! - Pipeline execution and the pluggable transformation step
//! - Schedule artifact rendering
//! - Construction-time configuration

use thiserror::Error;

/// Errors that can occur while inspecting a data source.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("inspect: unsupported source kind '{0}' (expected tabular-delimited, tabular-spreadsheet or structured-records)")]
    UnsupportedSourceKind(String),

    #[error("inspect: source '{location}' is unreadable: {reason}")]
    SourceUnreadable { location: String, reason: String },
}

impl InspectError {
    pub(crate) fn unreadable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnreadable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: a credential for the generative service is required")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while synthesizing a pipeline configuration.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The generative service call itself failed (network, auth, quota).
    #[error("synthesize: generative service call failed: {0}")]
    Service(#[from] LlmError),

    /// The response was not a parsable structured document.
    #[error("synthesize: response is not a parsable document: {0}")]
    Parse(String),

    /// The response parsed but does not satisfy the pipeline config schema.
    #[error("synthesize: response is not a valid pipeline config: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// The request payload could not be serialized.
    #[error("synthesize: failed to build request: {0}")]
    Request(#[from] serde_json::Error),
}

/// Schema violations found when validating a pipeline config document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("step {index} is missing a non-empty string 'type'")]
    MissingStepType { index: usize },

    #[error("document is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors that can occur during pipeline store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store: pipeline '{0}' not found")]
    PipelineNotFound(String),

    #[error("store: run '{0}' not found")]
    RunNotFound(String),

    #[error("store: run '{0}' is already finalized")]
    RunAlreadyFinalized(String),

    #[error("store: records_processed {0} exceeds the storable range")]
    CountOutOfRange(u64),

    #[error("store: failed to open database '{path}': {reason}")]
    Open { path: String, reason: String },

    #[error("store: query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store: serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store: corrupt row: {0}")]
    Corrupt(String),
}

/// Error raised by a pluggable transformation step.
///
/// Wraps whatever the transformation engine reports; the executor records its
/// message on the failed run instead of propagating it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransformationError {
    message: String,
}

impl TransformationError {
    /// Creates a transformation error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for TransformationError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{:#}", err))
    }
}

impl From<std::io::Error> for TransformationError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Fatal errors that abort a pipeline execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("execute: pipeline store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("execute: invalid state transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}

/// Errors that can occur while rendering or writing a schedule artifact.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule: template rendering failed: {0}")]
    Render(#[from] tera::Error),

    #[error("schedule: IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
