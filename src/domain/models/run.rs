//! Run-level aggregate.
//!
//! `RunState` is the single mutable aggregate describing one engine run. It
//! is owned behind the state handle; everything readers see is a clone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::branch::Branch;
use super::perspective::Perspective;

/// Phase of the engine run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No run active; the only phase a run may start from
    Idle,
    /// Deriving perspectives from the task
    Decomposing,
    /// Branches running concurrently
    Branching,
    /// Streaming the merged conclusion
    Synthesizing,
    /// Run finished with a usable synthesis
    Complete,
    /// Run aborted; `failure` carries the reason
    Failed,
}

impl Default for RunPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Decomposing => "decomposing",
            Self::Branching => "branching",
            Self::Synthesizing => "synthesizing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Check if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// A branch that reached `Succeeded`, reduced to what synthesis needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedBranch {
    pub perspective: Perspective,
    pub final_artifact: String,
}

/// Aggregate state of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// The problem statement, immutable for the run's lifetime.
    pub task: String,
    pub phase: RunPhase,
    /// Branches in decomposition order, stable for the run.
    pub branches: Vec<Branch>,
    /// Growing synthesis buffer; append-only while Synthesizing, frozen once
    /// the run is terminal.
    pub synthesis: String,
    pub failure: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            phase: RunPhase::Idle,
            branches: Vec::new(),
            synthesis: String::new(),
            failure: None,
            started_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state = RunState::default();
        assert_eq!(state.phase, RunPhase::Idle);
        assert!(state.branches.is_empty());
        assert!(state.synthesis.is_empty());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(RunPhase::Complete.is_terminal());
        assert!(RunPhase::Failed.is_terminal());
        assert!(!RunPhase::Idle.is_terminal());
        assert!(!RunPhase::Synthesizing.is_terminal());
    }
}
