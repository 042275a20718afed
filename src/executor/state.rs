//! Per-execution state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ExecutionError;

/// State of a single pipeline execution.
///
/// Legal transitions: `pending -> running -> {succeeded | failed}`.
/// Terminal states have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Pending => "pending",
            ExecutionState::Running => "running",
            ExecutionState::Succeeded => "succeeded",
            ExecutionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Succeeded | ExecutionState::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: ExecutionState) -> bool {
        matches!(
            (self, next),
            (ExecutionState::Pending, ExecutionState::Running)
                | (ExecutionState::Running, ExecutionState::Succeeded)
                | (ExecutionState::Running, ExecutionState::Failed)
        )
    }

    /// Moves to `next`, rejecting illegal transitions.
    pub fn transition(self, next: ExecutionState) -> Result<ExecutionState, ExecutionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ExecutionError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
