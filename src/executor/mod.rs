//! Pipeline execution with run-level tracking.
//!
//! The executor records a run start before any work, times the pluggable
//! [`Transformation`], classifies the outcome and finalizes the run.
//! Transformation failures (errors and panics) end up in the run record;
//! only store failures reach the caller.
//!
//! No timeout is applied to the transformation. Callers that need one wrap
//! [`PipelineExecutor::execute`] in `tokio::time::timeout`; a cancelled
//! execution leaves its run open.

pub mod state;
pub mod transformation;

pub use state::ExecutionState;
pub use transformation::{NoopTransformation, Transformation, TransformationOutput};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::pipeline::{PipelineDefinition, RunOutcome, RunStatus};
use crate::store::PipelineStore;

/// Outcome of one execution, mirroring the finalized run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub run_id: Uuid,
    pub pipeline_id: Uuid,
    pub status: RunStatus,
    /// Wall-clock time spent in the transformation.
    pub duration_seconds: f64,
    pub records_processed: u64,
    /// Error text when the run failed.
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Runs pipeline definitions against a store.
pub struct PipelineExecutor {
    store: PipelineStore,
    transformation: Arc<dyn Transformation>,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Creates an executor using [`NoopTransformation`].
    pub fn new(store: PipelineStore) -> Self {
        Self::with_transformation(store, Arc::new(NoopTransformation))
    }

    pub fn with_transformation(store: PipelineStore, transformation: Arc<dyn Transformation>) -> Self {
        Self {
            store,
            transformation,
        }
    }

    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    /// Executes a stored pipeline by id.
    pub async fn execute_by_id(&self, pipeline_id: Uuid) -> Result<ExecutionResult, ExecutionError> {
        let definition = self.store.get_pipeline(pipeline_id).await?;
        self.execute(&definition).await
    }

    /// Executes `definition` once and records the run.
    pub async fn execute(
        &self,
        definition: &PipelineDefinition,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut state = ExecutionState::Pending;
        let run = self.store.record_run_start(definition.id).await?;
        state = state.transition(ExecutionState::Running)?;

        tracing::info!(
            run_id = %run.id,
            pipeline_id = %definition.id,
            pipeline = %definition.name,
            "Executing pipeline"
        );

        let start = Instant::now();
        let result = AssertUnwindSafe(self.transformation.run(&definition.config))
            .catch_unwind()
            .await;
        let duration = start.elapsed();

        let (outcome, records_processed, errors) = match result {
            Ok(Ok(output)) => (RunOutcome::Success, output.records_processed, Vec::new()),
            Ok(Err(e)) => {
                tracing::warn!(run_id = %run.id, error = %e, "Transformation failed");
                (RunOutcome::Failed, 0, vec![e.to_string()])
            }
            Err(panic) => {
                let message = format!("transformation panicked: {}", panic_message(&*panic));
                tracing::warn!(run_id = %run.id, error = %message, "Transformation panicked");
                (RunOutcome::Failed, 0, vec![message])
            }
        };

        state = state.transition(match outcome {
            RunOutcome::Success => ExecutionState::Succeeded,
            RunOutcome::Failed => ExecutionState::Failed,
        })?;

        let finished = self
            .store
            .record_run_completion(run.id, outcome, records_processed, &errors)
            .await?;

        tracing::info!(
            run_id = %finished.id,
            state = %state,
            duration_ms = duration.as_millis() as u64,
            records_processed = finished.records_processed,
            "Execution finished"
        );

        Ok(ExecutionResult {
            run_id: finished.id,
            pipeline_id: finished.pipeline_id,
            status: finished.status,
            duration_seconds: duration.as_secs_f64(),
            records_processed: finished.records_processed,
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join("; "))
            },
            started_at: finished.started_at,
            completed_at: finished.completed_at.unwrap_or(finished.started_at),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
