//! Prompt construction for the five gateway calls.
//!
//! Each builder returns a ready-to-send request; the wording carries the
//! engine's quality contract (distinct non-generic perspectives, bounded
//! artifact length, two-valued audit, markdown synthesis).

use crate::domain::models::{FinalizedBranch, Perspective};
use crate::domain::ports::{CompletionRequest, ModelTier, OutputShape};

/// Structured request asking for the N most important, distinct
/// perspectives on the task.
pub fn decompose(task: &str, perspective_count: usize) -> CompletionRequest {
    let prompt = format!(
        "Analyze this complex task: \"{task}\"\n\
         Identify the {perspective_count} most important and distinct perspectives needed to solve it effectively.\n\
         Avoid generic perspectives; choose specific, high-impact angles."
    );
    CompletionRequest::structured(prompt, OutputShape::perspective_list(), ModelTier::Fast)
        .with_system(
            "You are a strategic planning AI. Your job is to break down problems \
             into distinct analytical frameworks.",
        )
}

/// Ask for a bounded-length reasoning artifact from one perspective.
pub fn generate(task: &str, perspective: &Perspective, word_target: usize) -> CompletionRequest {
    let prompt = format!(
        "TASK: {task}\n\n\
         Adopt the following perspective strictly:\n\
         ROLE: {name}\n\
         CONTEXT: {description}\n\n\
         Provide a detailed reasoning step or solution proposal from this specific viewpoint.\n\
         Focus on unique insights that only this perspective would see.\n\
         Keep it concise (approx {word_target} words) but deep.",
        name = perspective.name,
        description = perspective.description,
    );
    CompletionRequest::text(prompt, ModelTier::Fast)
}

/// Structured critique of one artifact, constrained to the SMART/DUMB enum.
pub fn audit(task: &str, artifact: &str, perspective_name: &str) -> CompletionRequest {
    let prompt = format!(
        "Act as a Critical Auditor.\n\
         Original Task: {task}\n\
         Perspective: {perspective_name}\n\
         Proposed Thought: \"{artifact}\"\n\n\
         Evaluate this reasoning. Check for: Hallucinations, generic filler, \
         logical gaps, or failure to address the prompt."
    );
    CompletionRequest::structured(prompt, OutputShape::audit_verdict(), ModelTier::Fast)
}

/// Ask for a corrected artifact addressing the auditor's critique.
pub fn refine(
    task: &str,
    perspective_name: &str,
    previous_artifact: &str,
    critique: &str,
) -> CompletionRequest {
    let prompt = format!(
        "TASK: {task}\n\
         PERSPECTIVE: {perspective_name}\n\n\
         Your previous attempt was rejected by the auditor.\n\
         PREVIOUS ATTEMPT: \"{previous_artifact}\"\n\
         CRITIQUE: \"{critique}\"\n\n\
         Please try again. Provide a corrected, higher-quality reasoning step \
         that addresses the critique."
    );
    CompletionRequest::text(prompt, ModelTier::Fast)
}

/// Merge request over every finalized branch, in branch order. Runs on the
/// capable tier.
pub fn synthesize(task: &str, branches: &[FinalizedBranch]) -> CompletionRequest {
    let context = branches
        .iter()
        .map(|b| {
            format!(
                "PERSPECTIVE [{}]:\n{}",
                b.perspective.name, b.final_artifact
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = format!(
        "TASK: {task}\n\n\
         I have explored this problem through multiple expert lenses. Here are the findings:\n\n\
         {context}\n\n\
         Your Goal: Synthesize these different viewpoints into a Master Solution.\n\
         1. Resolve contradictions.\n\
         2. Extract the best unique insights from each path.\n\
         3. Create a unified, actionable conclusion.\n\n\
         Format nicely with Markdown headers/bullet points."
    );
    CompletionRequest::text(prompt, ModelTier::Capable)
}
