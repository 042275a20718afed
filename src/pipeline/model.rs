//! Pipeline definitions, runs, and their status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::config::PipelineConfig;

/// Current status of a pipeline definition.
///
/// Reflects the outcome of the most recent run, or `Created` if the pipeline
/// has never run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Created => "created",
            PipelineStatus::Running => "running",
            PipelineStatus::Succeeded => "succeeded",
            PipelineStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PipelineStatus::Created),
            "running" => Ok(PipelineStatus::Running),
            "succeeded" => Ok(PipelineStatus::Succeeded),
            "failed" => Ok(PipelineStatus::Failed),
            other => Err(format!("unknown pipeline status '{}'", other)),
        }
    }
}

/// Status of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Started but not yet finalized.
    Pending,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// Final outcome used to finalize a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Failed,
}

impl RunOutcome {
    /// Status stored on the run row.
    pub fn run_status(self) -> RunStatus {
        match self {
            RunOutcome::Success => RunStatus::Success,
            RunOutcome::Failed => RunStatus::Failed,
        }
    }

    /// Status the owning pipeline moves to.
    pub fn pipeline_status(self) -> PipelineStatus {
        match self {
            RunOutcome::Success => PipelineStatus::Succeeded,
            RunOutcome::Failed => PipelineStatus::Failed,
        }
    }
}

/// One entry of a pipeline's error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Run that produced the error.
    pub run_id: Option<Uuid>,
    /// Error message(s) reported by the run.
    pub message: String,
    /// When the error was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A stored pipeline definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Unique identifier, stable for the definition's lifetime.
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Free-text description of the transformation.
    pub description: String,
    /// Validated transformation configuration.
    pub config: PipelineConfig,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Completion time of the most recent finalized run.
    pub last_run: Option<DateTime<Utc>>,
    pub status: PipelineStatus,
    /// Append-only log of failures.
    pub error_log: Vec<ErrorRecord>,
}

/// One execution attempt of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    /// Owning pipeline (weak reference).
    pub pipeline_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Set when the run is finalized; never earlier than `started_at`.
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    /// Number of records processed; zero if unknown.
    pub records_processed: u64,
    /// Error detail; empty on success.
    pub errors: Vec<String>,
}

impl PipelineRun {
    /// A run is finalized once its completion timestamp is set.
    pub fn is_finalized(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Wall-clock time between start and completion, if finalized.
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at
            .and_then(|completed| (completed - self.started_at).to_std().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            PipelineStatus::Created,
            PipelineStatus::Running,
            PipelineStatus::Succeeded,
            PipelineStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PipelineStatus>().unwrap(), status);
        }
        assert!("done".parse::<PipelineStatus>().is_err());
        assert_eq!("pending".parse::<RunStatus>().unwrap(), RunStatus::Pending);
        assert!("succeeded".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(RunOutcome::Success.run_status(), RunStatus::Success);
        assert_eq!(RunOutcome::Success.pipeline_status(), PipelineStatus::Succeeded);
        assert_eq!(RunOutcome::Failed.run_status(), RunStatus::Failed);
        assert_eq!(RunOutcome::Failed.pipeline_status(), PipelineStatus::Failed);
    }

    #[test]
    fn test_run_duration() {
        let started_at = Utc::now();
        let mut run = PipelineRun {
            id: Uuid::new_v4(),
            pipeline_id: Uuid::new_v4(),
            started_at,
            completed_at: None,
            status: RunStatus::Pending,
            records_processed: 0,
            errors: Vec::new(),
        };
        assert!(!run.is_finalized());
        assert!(run.duration().is_none());

        run.completed_at = Some(started_at + chrono::Duration::milliseconds(250));
        assert!(run.is_finalized());
        assert_eq!(run.duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PipelineStatus::Succeeded).unwrap(),
            "\"succeeded\""
        );
        assert_eq!(serde_json::to_string(&RunStatus::Failed).unwrap(), "\"failed\"");
    }
}
