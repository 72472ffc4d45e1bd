//! Port traits consumed by the engine.

pub mod completion;

pub use completion::{
    Completion, CompletionGateway, CompletionRequest, FragmentStream, GatewayResult, ModelTier,
    OutputShape, Structured,
};
