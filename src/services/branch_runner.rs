//! Branch state machine execution.
//!
//! Runs one perspective's lifecycle: generate the initial artifact, audit
//! it, and refine it when the audit gate rejects it. Every transition is
//! published through the state handle as it happens, and every gateway
//! await is raced against the run's cancellation token.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Audit, AuditVerdict, Branch, FinalizedBranch, Perspective};
use crate::domain::ports::{Completion, CompletionGateway, Structured};
use crate::services::prompts;
use crate::services::state::StateHandle;
use crate::services::with_cancellation;
use tokio_util::sync::CancellationToken;

/// Run one branch to a terminal phase. On success returns the finalized
/// branch; on provider error or cancellation the branch is marked Failed
/// and the error is returned to the coordinator.
#[instrument(skip_all, fields(perspective = %perspective.name))]
pub async fn run_branch(
    gateway: &Arc<dyn CompletionGateway>,
    state: &StateHandle,
    cancel: &CancellationToken,
    task: &str,
    index: usize,
    perspective: Perspective,
    word_target: usize,
) -> EngineResult<FinalizedBranch> {
    state.update_branch(index, Branch::start_generating).await?;

    // Generate
    let request = prompts::generate(task, &perspective, word_target);
    let artifact = match with_cancellation(cancel, gateway.complete(request)).await {
        Ok(completion) => non_empty_text(&completion),
        Err(err) => {
            fail_branch(state, index).await;
            return Err(step_failure(StepKind::Generation, &perspective.name, &err));
        }
    };
    let Some(artifact) = artifact else {
        fail_branch(state, index).await;
        return Err(EngineError::BranchGeneration {
            perspective: perspective.name.clone(),
            reason: "provider returned no artifact text".to_string(),
        });
    };
    state
        .update_branch(index, |b| b.record_artifact(artifact.clone()))
        .await?;
    debug!(chars = artifact.len(), "initial artifact recorded");

    // Audit-gate. Transport errors fail the branch; an unusable verdict
    // degrades to a synthetic Dumb so the branch still moves forward.
    let request = prompts::audit(task, &artifact, &perspective.name);
    let audit = match with_cancellation(cancel, gateway.complete(request)).await {
        Ok(completion) => parse_audit(&completion, &perspective.name),
        Err(err) => {
            fail_branch(state, index).await;
            return Err(step_failure(StepKind::Audit, &perspective.name, &err));
        }
    };
    let verdict = audit.verdict;
    state
        .update_branch(index, |b| b.record_audit(audit.clone()))
        .await?;
    debug!(verdict = ?verdict, rationale = %audit.rationale, "audit recorded");

    // Conditional repair: exactly one refinement, accepted unconditionally.
    let final_artifact = match verdict {
        AuditVerdict::Smart => artifact,
        AuditVerdict::Dumb => {
            let request = prompts::refine(task, &perspective.name, &artifact, &audit.rationale);
            let refined = match with_cancellation(cancel, gateway.complete(request)).await {
                Ok(completion) => non_empty_text(&completion),
                Err(err) => {
                    fail_branch(state, index).await;
                    return Err(step_failure(StepKind::Refinement, &perspective.name, &err));
                }
            };
            let Some(refined) = refined else {
                fail_branch(state, index).await;
                return Err(EngineError::BranchRefinement {
                    perspective: perspective.name.clone(),
                    reason: "provider returned no refined text".to_string(),
                });
            };
            state
                .update_branch(index, |b| b.record_refinement(refined.clone()))
                .await?;
            refined
        }
    };

    Ok(FinalizedBranch {
        perspective,
        final_artifact,
    })
}

enum StepKind {
    Generation,
    Audit,
    Refinement,
}

fn step_failure(step: StepKind, perspective: &str, err: &EngineError) -> EngineError {
    if matches!(err, EngineError::Cancelled) {
        return EngineError::Cancelled;
    }
    let perspective = perspective.to_string();
    let reason = err.to_string();
    match step {
        StepKind::Generation => EngineError::BranchGeneration { perspective, reason },
        StepKind::Audit => EngineError::BranchAudit { perspective, reason },
        StepKind::Refinement => EngineError::BranchRefinement { perspective, reason },
    }
}

async fn fail_branch(state: &StateHandle, index: usize) {
    if let Err(err) = state.update_branch(index, Branch::fail).await {
        warn!(%err, "could not mark branch failed");
    }
}

fn non_empty_text(completion: &Completion) -> Option<String> {
    completion
        .as_text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}

/// Interpret the audit completion. Anything that is not a well-formed
/// `{status, reasoning}` value becomes a synthetic Dumb verdict (fail-open
/// policy: a broken audit must not block forward progress).
fn parse_audit(completion: &Completion, perspective: &str) -> Audit {
    match completion {
        Completion::Structured(Structured::Parsed(value)) => {
            match serde_json::from_value::<Audit>(value.clone()) {
                Ok(audit) => audit,
                Err(err) => {
                    warn!(perspective, %err, "audit JSON did not match the verdict shape");
                    Audit::fail_open(&err.to_string())
                }
            }
        }
        Completion::Structured(Structured::ParseFailure { reason, .. }) => {
            warn!(perspective, %reason, "audit response unparseable");
            Audit::fail_open(reason)
        }
        Completion::Text(_) => {
            warn!(perspective, "audit returned plain text instead of a structured verdict");
            Audit::fail_open("plain text instead of structured verdict")
        }
    }
}
