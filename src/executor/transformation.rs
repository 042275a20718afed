//! The pluggable transformation step run by the executor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransformationError;
use crate::pipeline::PipelineConfig;

/// What a transformation reports back on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationOutput {
    pub records_processed: u64,
}

impl TransformationOutput {
    pub fn new(records_processed: u64) -> Self {
        Self { records_processed }
    }
}

/// Performs the actual data work for a pipeline.
///
/// The executor does not interpret `config`; it only times the call and
/// records its outcome. Returning an error, or panicking, marks the run
/// failed.
#[async_trait]
pub trait Transformation: Send + Sync {
    async fn run(&self, config: &PipelineConfig) -> Result<TransformationOutput, TransformationError>;
}

/// Logs the pipeline and processes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransformation;

#[async_trait]
impl Transformation for NoopTransformation {
    async fn run(&self, config: &PipelineConfig) -> Result<TransformationOutput, TransformationError> {
        tracing::info!(
            pipeline = config.name().unwrap_or("<unnamed>"),
            steps = config.steps().len(),
            "Pipeline started"
        );
        Ok(TransformationOutput::default())
    }
}
