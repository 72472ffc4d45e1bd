//! The engine controller.
//!
//! `ConsensusEngine` owns the run lifecycle: it sequences decomposition,
//! fan-out, and synthesis, tracks the run phase, and is the only surface
//! observers talk to. At most one run is active at a time; a terminal run
//! must be explicitly reset before the next one starts.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{EngineConfig, Perspective, PerspectiveSpec, RunPhase, RunState};
use crate::domain::ports::{Completion, CompletionGateway, Structured};
use crate::services::{fan_out, prompts, state::StateHandle, synthesis, with_cancellation};

struct ActiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Top-level driver of the consensus pipeline.
pub struct ConsensusEngine {
    gateway: Arc<dyn CompletionGateway>,
    config: EngineConfig,
    state: StateHandle,
    active: Mutex<Option<ActiveRun>>,
}

impl ConsensusEngine {
    pub fn new(gateway: Arc<dyn CompletionGateway>, config: EngineConfig) -> Self {
        Self {
            gateway,
            config,
            state: StateHandle::new(),
            active: Mutex::new(None),
        }
    }

    /// Start a run for `task`. Rejected unless the engine is Idle; the
    /// pipeline runs on a spawned task and progress is observed through
    /// [`Self::current_snapshot`].
    pub async fn start_run(&self, task: &str) -> EngineResult<()> {
        let mut active = self.active.lock().await;
        if self.state.phase().await != RunPhase::Idle {
            return Err(EngineError::RunActive);
        }
        let task = task.trim();
        if task.is_empty() {
            return Err(EngineError::InvalidTransition(
                "cannot start a run with an empty task".to_string(),
            ));
        }

        self.state.begin(task, RunPhase::Decomposing).await;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_pipeline(
            Arc::clone(&self.gateway),
            self.state.clone(),
            self.config.clone(),
            cancel.clone(),
            task.to_string(),
        ));
        *active = Some(ActiveRun { cancel, handle });
        Ok(())
    }

    /// Wait for the active run to finish and return its final state. A
    /// no-op returning the current snapshot when no run is active.
    pub async fn wait(&self) -> RunState {
        let run = self.active.lock().await.take();
        if let Some(run) = run {
            if let Err(err) = run.handle.await {
                error!(%err, "run task panicked");
                self.state.fail("run task panicked").await;
            }
        }
        self.state.snapshot().await
    }

    /// Signal cancellation to the active run. The run transitions to
    /// Failed at its next suspension point.
    pub async fn cancel(&self) {
        if let Some(run) = self.active.lock().await.as_ref() {
            run.cancel.cancel();
        }
    }

    /// Read-only, point-in-time copy of the run state.
    pub async fn current_snapshot(&self) -> RunState {
        self.state.snapshot().await
    }

    /// Discard the prior run and return to Idle. Only valid once the run is
    /// terminal (Complete or Failed); a reset from Idle is a no-op.
    pub async fn reset_to_idle(&self) -> EngineResult<()> {
        let mut active = self.active.lock().await;
        let phase = self.state.phase().await;
        if !(phase.is_terminal() || phase == RunPhase::Idle) {
            return Err(EngineError::ResetWhileActive);
        }
        if let Some(run) = active.take() {
            // Terminal phase means the pipeline already finished; this only
            // reaps the join handle.
            run.handle.abort();
        }
        self.state.reset().await;
        Ok(())
    }
}

/// Drive the three stages, recording the terminal phase in the run state.
async fn run_pipeline(
    gateway: Arc<dyn CompletionGateway>,
    state: StateHandle,
    config: EngineConfig,
    cancel: CancellationToken,
    task: String,
) {
    match drive(&gateway, &state, &config, &cancel, &task).await {
        Ok(()) => {
            state.complete().await;
            info!("run complete");
        }
        Err(err) => {
            error!(%err, "run failed");
            state.fail(&err.to_string()).await;
        }
    }
}

#[instrument(skip_all)]
async fn drive(
    gateway: &Arc<dyn CompletionGateway>,
    state: &StateHandle,
    config: &EngineConfig,
    cancel: &CancellationToken,
    task: &str,
) -> EngineResult<()> {
    let perspectives = decompose(gateway, cancel, task, config.perspective_count).await?;
    info!(count = perspectives.len(), "task decomposed");

    state.set_phase(RunPhase::Branching).await;
    let finalized = fan_out::fan_out(
        gateway,
        state,
        cancel,
        task,
        perspectives,
        config.artifact_word_target,
    )
    .await?;

    state.set_phase(RunPhase::Synthesizing).await;
    synthesis::synthesize(gateway, state, cancel, task, &finalized).await
}

/// Decomposition step, owned by the controller: one structured call on the
/// fast tier. Zero perspectives or an unparseable result is fatal.
async fn decompose(
    gateway: &Arc<dyn CompletionGateway>,
    cancel: &CancellationToken,
    task: &str,
    count: usize,
) -> EngineResult<Vec<Perspective>> {
    let request = prompts::decompose(task, count);
    let completion = with_cancellation(cancel, gateway.complete(request))
        .await
        .map_err(|err| match err {
            EngineError::Cancelled => EngineError::Cancelled,
            other => EngineError::Decomposition(other.to_string()),
        })?;

    match completion {
        Completion::Structured(Structured::Parsed(value)) => {
            let specs: Vec<PerspectiveSpec> = serde_json::from_value(value)
                .map_err(|err| EngineError::Decomposition(format!("malformed perspectives: {err}")))?;
            if specs.is_empty() {
                return Err(EngineError::Decomposition(
                    "provider returned zero perspectives".to_string(),
                ));
            }
            Ok(specs.into_iter().map(Perspective::from).collect())
        }
        Completion::Structured(Structured::ParseFailure { reason, .. }) => Err(
            EngineError::Decomposition(format!("unparseable perspectives: {reason}")),
        ),
        Completion::Text(_) => Err(EngineError::Decomposition(
            "expected structured perspectives, got plain text".to_string(),
        )),
    }
}
