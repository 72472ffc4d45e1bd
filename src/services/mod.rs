//! Service layer: the pipeline stages and the shared-state handle.

pub mod branch_runner;
pub mod fan_out;
pub mod prompts;
pub mod state;
pub mod synthesis;

pub use state::StateHandle;

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::GatewayResult;

/// Race a gateway call against the run's cancellation token. Every
/// suspension point in the pipeline goes through this, so a cancelled run
/// stops at the next await rather than finishing its in-flight calls.
pub(crate) async fn with_cancellation<T, F>(
    cancel: &CancellationToken,
    call: F,
) -> EngineResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    tokio::select! {
        () = cancel.cancelled() => Err(EngineError::Cancelled),
        result = call => Ok(result?),
    }
}
