//! Error taxonomy for the consensus engine.

use thiserror::Error;

/// Errors produced by a completion gateway adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Run-level errors. Every variant except `RunActive`/`ResetWhileActive`
/// transitions the run to its Failed phase.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Decomposition failed: {0}")]
    Decomposition(String),

    #[error("Generation failed for perspective '{perspective}': {reason}")]
    BranchGeneration { perspective: String, reason: String },

    #[error("Refinement failed for perspective '{perspective}': {reason}")]
    BranchRefinement { perspective: String, reason: String },

    #[error("Audit failed for perspective '{perspective}': {reason}")]
    BranchAudit { perspective: String, reason: String },

    #[error("Synthesis stream failed: {0}")]
    SynthesisStream(String),

    #[error("Run already active")]
    RunActive,

    #[error("Cannot reset while a run is active")]
    ResetWhileActive,

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type EngineResult<T> = Result<T, EngineError>;
