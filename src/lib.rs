//! Quorum - multi-perspective consensus engine.
//!
//! Given an open-ended problem statement, Quorum derives several independent
//! analytical perspectives, develops a reasoning artifact for each
//! concurrently, audits and conditionally repairs each artifact, then merges
//! the survivors into one synthesized answer delivered incrementally.
//!
//! # Architecture
//!
//! The crate follows hexagonal layering:
//!
//! - **Domain** (`domain`): data model, the completion-gateway port, errors
//! - **Services** (`services`): prompt construction, shared run state, the
//!   branch state machine, fan-out coordination, synthesis aggregation
//! - **Application** (`application`): the engine controller
//! - **Infrastructure** (`infrastructure`): config, logging, HTTP adapter
//! - **CLI** (`cli`): command-line surface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quorum::{ConsensusEngine, EngineConfig, HttpGateway};
//!
//! # async fn example(gateway: Arc<quorum::HttpGateway>) -> anyhow::Result<()> {
//! let engine = ConsensusEngine::new(gateway, EngineConfig::default());
//! engine.start_run("How should a startup allocate a limited budget?").await?;
//! let final_state = engine.wait().await;
//! println!("{}", final_state.synthesis);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::ConsensusEngine;
pub use domain::errors::{EngineError, EngineResult, GatewayError};
pub use domain::models::{
    Audit, AuditVerdict, Branch, BranchPhase, Config, EngineConfig, FinalizedBranch, GatewayConfig,
    LoggingConfig, Perspective, RunPhase, RunState,
};
pub use domain::ports::{
    Completion, CompletionGateway, CompletionRequest, FragmentStream, GatewayResult, ModelTier,
    OutputShape, Structured,
};
pub use infrastructure::{ConfigLoader, HttpGateway};
pub use services::StateHandle;
