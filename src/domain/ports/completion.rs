//! Port trait for the completion gateway.
//!
//! The gateway is the external capability that turns prompts into text,
//! structured values, or fragment streams. The domain layer depends on this
//! trait only; adapters in the infrastructure layer implement it over a
//! concrete provider, and tests implement it with scripted stubs.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::pin::Pin;

use crate::domain::errors::GatewayError;

/// Result type for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Model tier selection: cheap/fast for the per-branch steps, the capable
/// tier for the final synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Fast,
    Capable,
}

/// A named schema descriptor constraining a structured response.
///
/// Only two shapes exist in the engine; both are expressed as plain JSON
/// schema values the adapter can pass through as a response schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputShape {
    /// Identifier for logging ("perspective_list", "audit_verdict")
    pub name: &'static str,
    /// JSON schema the response must conform to
    pub schema: Value,
}

impl OutputShape {
    /// Array of `{name, description}` objects, used by decomposition.
    pub fn perspective_list() -> Self {
        Self {
            name: "perspective_list",
            schema: json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name of the perspective (e.g., 'Economic', 'Ethical')"
                        },
                        "description": {
                            "type": "string",
                            "description": "A brief one-sentence description of this angle."
                        }
                    },
                    "required": ["name", "description"]
                }
            }),
        }
    }

    /// Object `{status: SMART|DUMB, reasoning}`, used by the audit step.
    pub fn audit_verdict() -> Self {
        Self {
            name: "audit_verdict",
            schema: json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["SMART", "DUMB"],
                        "description": "SMART if high quality, DUMB if hallucinated, generic, or illogical."
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "A one sentence explanation of the verdict."
                    }
                },
                "required": ["status", "reasoning"]
            }),
        }
    }
}

/// A single-shot completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// User-facing prompt text
    pub prompt: String,
    /// Optional system instruction framing the call
    pub system: Option<String>,
    /// When present, the response must conform to this shape
    pub output_shape: Option<OutputShape>,
    pub tier: ModelTier,
}

impl CompletionRequest {
    pub fn text(prompt: impl Into<String>, tier: ModelTier) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            output_shape: None,
            tier,
        }
    }

    pub fn structured(prompt: impl Into<String>, shape: OutputShape, tier: ModelTier) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            output_shape: Some(shape),
            tier,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Parse outcome of a structured response. Both arms must be handled at
/// every call site; whether a parse failure is fatal is the caller's policy,
/// not the gateway's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Structured {
    Parsed(Value),
    ParseFailure { raw: String, reason: String },
}

/// Result of a single-shot completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Plain text response (no output shape was supplied)
    Text(String),
    /// Structured response, parsed or not
    Structured(Structured),
}

impl Completion {
    /// The plain text of this completion, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

/// Lazy, finite, non-restartable sequence of text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = GatewayResult<String>> + Send>>;

/// Port trait for the completion gateway.
///
/// Implementations must be `Send + Sync`; methods take `&self` so all N
/// branch calls can be in flight on one shared client.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Single-shot request. When `request.output_shape` is set, the result
    /// is `Completion::Structured`; otherwise `Completion::Text`.
    async fn complete(&self, request: CompletionRequest) -> GatewayResult<Completion>;

    /// Streaming request, used only for synthesis. The stream ends when the
    /// provider signals completion and may terminate early with an error.
    async fn complete_streaming(&self, request: CompletionRequest)
        -> GatewayResult<FragmentStream>;
}
