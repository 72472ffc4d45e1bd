//! Branch domain model.
//!
//! A branch is the mutable unit of work bound one-to-one to a perspective:
//! generate an artifact, audit it, and conditionally refine it. Field writes
//! go through phase-checked methods so states like refined-without-audit are
//! unrepresentable.

use serde::{Deserialize, Serialize};

use super::perspective::Perspective;

/// Phase of a branch in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPhase {
    /// Branch created, work not started
    Pending,
    /// Initial artifact being generated
    Generating,
    /// Artifact under audit
    Auditing,
    /// Audit rejected the artifact, producing a corrected one
    Refining,
    /// Branch finished with a usable artifact
    Succeeded,
    /// Provider error terminated the branch
    Failed,
}

impl Default for BranchPhase {
    fn default() -> Self {
        Self::Pending
    }
}

impl BranchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Auditing => "auditing",
            Self::Refining => "refining",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Check if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(&self) -> Vec<BranchPhase> {
        match self {
            Self::Pending => vec![Self::Generating],
            Self::Generating => vec![Self::Auditing, Self::Failed],
            Self::Auditing => vec![Self::Succeeded, Self::Refining, Self::Failed],
            Self::Refining => vec![Self::Succeeded, Self::Failed],
            Self::Succeeded | Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Audit verdict: the two-valued quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditVerdict {
    /// Artifact is high quality; branch succeeds as-is
    #[serde(rename = "SMART")]
    Smart,
    /// Artifact is hallucinated, generic, or illogical; branch is refined
    #[serde(rename = "DUMB")]
    Dumb,
}

/// Outcome of the audit step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(rename = "status")]
    pub verdict: AuditVerdict,
    #[serde(rename = "reasoning")]
    pub rationale: String,
}

impl Audit {
    /// Synthetic verdict used when the gateway's audit response could not be
    /// parsed. Fail-open: the branch proceeds to refinement instead of dying.
    pub fn fail_open(reason: &str) -> Self {
        Self {
            verdict: AuditVerdict::Dumb,
            rationale: format!("audit response unusable ({reason}); refining instead"),
        }
    }
}

/// The lifecycle of one perspective's reasoning artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub perspective: Perspective,
    /// Set once by the generation step, then immutable.
    pub initial_artifact: Option<String>,
    /// Set once by the audit step, then immutable.
    pub audit: Option<Audit>,
    /// Set only when the audit verdict was Dumb; once set, immutable.
    pub refined_artifact: Option<String>,
    pub phase: BranchPhase,
}

impl Branch {
    pub fn new(perspective: Perspective) -> Self {
        Self {
            perspective,
            initial_artifact: None,
            audit: None,
            refined_artifact: None,
            phase: BranchPhase::Pending,
        }
    }

    /// The artifact that represents this branch: the refinement when one was
    /// produced, otherwise the initial artifact.
    pub fn final_artifact(&self) -> Option<&str> {
        self.refined_artifact
            .as_deref()
            .or(self.initial_artifact.as_deref())
    }

    fn transition_to(&mut self, next: BranchPhase) -> Result<(), String> {
        if !self.phase.can_transition_to(next) {
            return Err(format!(
                "branch {}: cannot transition from {} to {}",
                self.perspective.name,
                self.phase.as_str(),
                next.as_str()
            ));
        }
        self.phase = next;
        Ok(())
    }

    /// Pending -> Generating.
    pub fn start_generating(&mut self) -> Result<(), String> {
        self.transition_to(BranchPhase::Generating)
    }

    /// Generating -> Auditing, recording the initial artifact.
    pub fn record_artifact(&mut self, artifact: String) -> Result<(), String> {
        self.transition_to(BranchPhase::Auditing)?;
        self.initial_artifact = Some(artifact);
        Ok(())
    }

    /// Auditing -> Succeeded (Smart) or Auditing -> Refining (Dumb),
    /// recording the verdict.
    pub fn record_audit(&mut self, audit: Audit) -> Result<(), String> {
        let next = match audit.verdict {
            AuditVerdict::Smart => BranchPhase::Succeeded,
            AuditVerdict::Dumb => BranchPhase::Refining,
        };
        self.transition_to(next)?;
        self.audit = Some(audit);
        Ok(())
    }

    /// Refining -> Succeeded, recording the corrected artifact.
    pub fn record_refinement(&mut self, artifact: String) -> Result<(), String> {
        if self.audit.as_ref().map(|a| a.verdict) != Some(AuditVerdict::Dumb) {
            return Err(format!(
                "branch {}: refinement without a Dumb verdict",
                self.perspective.name
            ));
        }
        self.transition_to(BranchPhase::Succeeded)?;
        self.refined_artifact = Some(artifact);
        Ok(())
    }

    /// Any non-terminal phase -> Failed.
    pub fn fail(&mut self) -> Result<(), String> {
        self.transition_to(BranchPhase::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch() -> Branch {
        Branch::new(Perspective::new("Economic", "Cost and revenue impact"))
    }

    #[test]
    fn test_smart_path() {
        let mut b = branch();
        b.start_generating().unwrap();
        b.record_artifact("thought".into()).unwrap();
        assert_eq!(b.phase, BranchPhase::Auditing);
        b.record_audit(Audit {
            verdict: AuditVerdict::Smart,
            rationale: "solid".into(),
        })
        .unwrap();
        assert_eq!(b.phase, BranchPhase::Succeeded);
        assert!(b.phase.is_terminal());
        assert_eq!(b.final_artifact(), Some("thought"));
    }

    #[test]
    fn test_dumb_path_uses_refinement() {
        let mut b = branch();
        b.start_generating().unwrap();
        b.record_artifact("weak".into()).unwrap();
        b.record_audit(Audit {
            verdict: AuditVerdict::Dumb,
            rationale: "generic filler".into(),
        })
        .unwrap();
        assert_eq!(b.phase, BranchPhase::Refining);
        b.record_refinement("stronger".into()).unwrap();
        assert_eq!(b.final_artifact(), Some("stronger"));
        assert_eq!(b.initial_artifact.as_deref(), Some("weak"));
    }

    #[test]
    fn test_refinement_requires_dumb_verdict() {
        let mut b = branch();
        b.start_generating().unwrap();
        b.record_artifact("good".into()).unwrap();
        b.record_audit(Audit {
            verdict: AuditVerdict::Smart,
            rationale: "fine".into(),
        })
        .unwrap();
        assert!(b.record_refinement("unwanted".into()).is_err());
        assert!(b.refined_artifact.is_none());
    }

    #[test]
    fn test_audit_never_before_artifact() {
        let mut b = branch();
        b.start_generating().unwrap();
        // Still Generating: audit transition is invalid
        assert!(b
            .record_audit(Audit {
                verdict: AuditVerdict::Smart,
                rationale: "too early".into(),
            })
            .is_err());
        assert!(b.audit.is_none());
    }

    #[test]
    fn test_terminal_phases_frozen() {
        let mut b = branch();
        b.start_generating().unwrap();
        b.fail().unwrap();
        assert!(b.start_generating().is_err());
        assert!(b.record_artifact("late".into()).is_err());
        assert!(b.fail().is_err());
    }

    #[test]
    fn test_verdict_serde_names() {
        let smart: AuditVerdict = serde_json::from_str("\"SMART\"").unwrap();
        assert_eq!(smart, AuditVerdict::Smart);
        let audit: Audit =
            serde_json::from_str(r#"{"status":"DUMB","reasoning":"logical gap"}"#).unwrap();
        assert_eq!(audit.verdict, AuditVerdict::Dumb);
        assert_eq!(audit.rationale, "logical gap");
    }
}
