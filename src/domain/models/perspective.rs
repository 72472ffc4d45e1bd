//! Perspective domain model.
//!
//! A perspective is one analytical angle chosen by decomposition to attack
//! the task. Perspectives are produced once and never mutated.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named analytical angle on the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perspective {
    /// Stable identifier, unique within a run.
    pub id: Uuid,
    /// Short name of the angle (e.g. "Economic", "Ethical").
    pub name: String,
    /// One-sentence description of what this angle covers.
    pub description: String,
}

impl Perspective {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Raw perspective as returned by the gateway's decomposition call,
/// before an id is assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct PerspectiveSpec {
    pub name: String,
    pub description: String,
}

impl From<PerspectiveSpec> for Perspective {
    fn from(spec: PerspectiveSpec) -> Self {
        Self::new(spec.name, spec.description)
    }
}
