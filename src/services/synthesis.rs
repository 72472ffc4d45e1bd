//! Synthesis aggregation.
//!
//! Issues the final merge request on the capable tier and folds the
//! streamed fragments into the run's synthesis buffer in arrival order. A
//! mid-stream error fails the run but keeps whatever text already arrived.

use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::FinalizedBranch;
use crate::domain::ports::CompletionGateway;
use crate::services::prompts;
use crate::services::state::StateHandle;
use crate::services::with_cancellation;

/// Stream the synthesized conclusion into the run state.
#[instrument(skip_all, fields(branches = branches.len()))]
pub async fn synthesize(
    gateway: &Arc<dyn CompletionGateway>,
    state: &StateHandle,
    cancel: &CancellationToken,
    task: &str,
    branches: &[FinalizedBranch],
) -> EngineResult<()> {
    let request = prompts::synthesize(task, branches);
    let mut stream = with_cancellation(cancel, gateway.complete_streaming(request))
        .await
        .map_err(|err| match err {
            EngineError::Cancelled => EngineError::Cancelled,
            other => EngineError::SynthesisStream(other.to_string()),
        })?;

    let mut fragments = 0usize;
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            item = stream.next() => item,
        };
        match next {
            Some(Ok(fragment)) => {
                state.append_synthesis(&fragment).await;
                fragments += 1;
            }
            // Partial text stays in the buffer for diagnostics.
            Some(Err(err)) => return Err(EngineError::SynthesisStream(err.to_string())),
            None => break,
        }
    }

    debug!(fragments, "synthesis stream complete");
    Ok(())
}
