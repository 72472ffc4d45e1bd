//! Domain models for the consensus engine.

pub mod branch;
pub mod config;
pub mod perspective;
pub mod run;

pub use branch::{Audit, AuditVerdict, Branch, BranchPhase};
pub use config::{Config, EngineConfig, GatewayConfig, LoggingConfig};
pub use perspective::{Perspective, PerspectiveSpec};
pub use run::{FinalizedBranch, RunPhase, RunState};
