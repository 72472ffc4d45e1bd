//! Application layer: the engine controller.

pub mod engine;

pub use engine::ConsensusEngine;
