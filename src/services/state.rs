//! Shared run-state handle.
//!
//! `StateHandle` is the single mutator capability for [`RunState`]. The
//! coordinator, branch runners, and synthesis aggregator all hold clones of
//! it; none of them holds a reference into the aggregate itself. Every
//! mutation runs inside one write-lock critical section, so a reader taking
//! a snapshot can never observe a branch phase advanced without the field
//! written alongside it.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Branch, Perspective, RunPhase, RunState};

/// Cloneable handle to the run aggregate.
#[derive(Clone, Default)]
pub struct StateHandle {
    inner: Arc<RwLock<RunState>>,
}

impl StateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy, safe under concurrent mutation.
    pub async fn snapshot(&self) -> RunState {
        self.inner.read().await.clone()
    }

    /// Replace the aggregate with a fresh run for `task`.
    pub async fn begin(&self, task: &str, phase: RunPhase) {
        let mut state = self.inner.write().await;
        *state = RunState::new(task);
        state.phase = phase;
    }

    pub async fn set_phase(&self, phase: RunPhase) {
        let mut state = self.inner.write().await;
        state.phase = phase;
    }

    pub async fn phase(&self) -> RunPhase {
        self.inner.read().await.phase
    }

    /// Create one pending branch per perspective, in decomposition order.
    pub async fn init_branches(&self, perspectives: Vec<Perspective>) {
        let mut state = self.inner.write().await;
        state.branches = perspectives.into_iter().map(Branch::new).collect();
    }

    /// Apply a transition to one branch. The closure runs under the write
    /// lock so the phase change and any field write land atomically.
    pub async fn update_branch<F>(&self, index: usize, apply: F) -> EngineResult<()>
    where
        F: FnOnce(&mut Branch) -> Result<(), String>,
    {
        let mut state = self.inner.write().await;
        let branch = state
            .branches
            .get_mut(index)
            .ok_or_else(|| EngineError::InvalidTransition(format!("no branch at index {index}")))?;
        apply(branch).map_err(EngineError::InvalidTransition)
    }

    /// Append one synthesis fragment. The buffer is append-only while the
    /// run is Synthesizing and frozen once the run is terminal.
    pub async fn append_synthesis(&self, fragment: &str) {
        let mut state = self.inner.write().await;
        if state.phase == RunPhase::Synthesizing {
            state.synthesis.push_str(fragment);
        } else {
            warn!(phase = state.phase.as_str(), "dropping synthesis fragment outside Synthesizing phase");
        }
    }

    /// Transition the run to Failed, keeping the first failure message and
    /// any partial synthesis for diagnostics.
    pub async fn fail(&self, message: &str) {
        let mut state = self.inner.write().await;
        if state.phase.is_terminal() {
            return;
        }
        state.phase = RunPhase::Failed;
        state.failure = Some(message.to_string());
    }

    pub async fn complete(&self) {
        let mut state = self.inner.write().await;
        state.phase = RunPhase::Complete;
    }

    /// Discard the prior run's branches and synthesis buffer.
    pub async fn reset(&self) {
        let mut state = self.inner.write().await;
        *state = RunState::default();
    }
}
