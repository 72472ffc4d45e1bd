//! Fan-out coordination over the branch state machines.
//!
//! One branch per perspective, all running concurrently with no cap (N is
//! small; decomposition itself bounds it). The join barrier waits for every
//! branch to reach a terminal phase before anything else happens; only then
//! is the first branch failure, in decomposition order, propagated.

use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::domain::errors::EngineResult;
use crate::domain::models::{FinalizedBranch, Perspective};
use crate::domain::ports::CompletionGateway;
use crate::services::branch_runner::run_branch;
use crate::services::state::StateHandle;

/// Run every perspective's branch to completion concurrently and join.
///
/// Returns the finalized branches in decomposition order, or the first
/// failed branch's error once all branches are terminal.
#[instrument(skip_all, fields(branches = perspectives.len()))]
pub async fn fan_out(
    gateway: &Arc<dyn CompletionGateway>,
    state: &StateHandle,
    cancel: &CancellationToken,
    task: &str,
    perspectives: Vec<Perspective>,
    word_target: usize,
) -> EngineResult<Vec<FinalizedBranch>> {
    state.init_branches(perspectives.clone()).await;

    let futures = perspectives
        .into_iter()
        .enumerate()
        .map(|(index, perspective)| {
            run_branch(gateway, state, cancel, task, index, perspective, word_target)
        });

    // Full join: every branch reaches Succeeded or Failed before we look at
    // any result, so a failed run never leaves a branch mid-flight.
    let results = join_all(futures).await;

    let mut finalized = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(branch) => finalized.push(branch),
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => {
            info!(finalized = finalized.len(), "all branches succeeded");
            Ok(finalized)
        }
    }
}
