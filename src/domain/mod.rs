//! Domain layer for the Quorum consensus engine.
//!
//! This module contains the core data model, the gateway port, and the
//! error taxonomy. Nothing in here performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{EngineError, EngineResult, GatewayError};
