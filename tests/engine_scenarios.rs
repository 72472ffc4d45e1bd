//! End-to-end engine scenarios against a scripted gateway stub.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use quorum::{
    AuditVerdict, BranchPhase, Completion, CompletionGateway, CompletionRequest, ConsensusEngine,
    EngineConfig, EngineError, FragmentStream, GatewayError, GatewayResult, RunPhase, Structured,
};

// ========================
// Stub gateway
// ========================

/// One scripted synthesis fragment: an optional delay before delivery, then
/// either text or a transport error.
type ScriptedFragment = (u64, Result<String, String>);

struct StubGateway {
    /// `(name, description)` pairs returned by decomposition.
    perspectives: Vec<(String, String)>,
    /// Overrides the decomposition response entirely when set.
    decompose_override: StdMutex<Option<Structured>>,
    /// Per-perspective generated text; missing entries get a default.
    generate_text: HashMap<String, String>,
    /// Per-perspective delay before generation returns.
    generate_delay_ms: HashMap<String, u64>,
    /// Per-perspective audit response; missing entries get SMART.
    audit_response: HashMap<String, Structured>,
    /// Per-perspective refined text; missing entries get a default.
    refine_text: HashMap<String, String>,
    fragments: Vec<ScriptedFragment>,

    events: StdMutex<Vec<String>>,
    refine_calls: StdMutex<Vec<String>>,
    synthesize_calls: AtomicUsize,
    synthesize_prompt: StdMutex<Option<String>>,
}

impl StubGateway {
    fn new(perspectives: &[&str]) -> Self {
        Self {
            perspectives: perspectives
                .iter()
                .map(|n| ((*n).to_string(), format!("{n} angle")))
                .collect(),
            decompose_override: StdMutex::new(None),
            generate_text: HashMap::new(),
            generate_delay_ms: HashMap::new(),
            audit_response: HashMap::new(),
            refine_text: HashMap::new(),
            fragments: vec![(0, Ok("synthesized answer".to_string()))],
            events: StdMutex::new(Vec::new()),
            refine_calls: StdMutex::new(Vec::new()),
            synthesize_calls: AtomicUsize::new(0),
            synthesize_prompt: StdMutex::new(None),
        }
    }

    fn with_decompose_override(self, structured: Structured) -> Self {
        *self.decompose_override.lock().unwrap() = Some(structured);
        self
    }

    fn with_generate_text(mut self, perspective: &str, text: &str) -> Self {
        self.generate_text
            .insert(perspective.to_string(), text.to_string());
        self
    }

    fn with_generate_delay(mut self, perspective: &str, ms: u64) -> Self {
        self.generate_delay_ms.insert(perspective.to_string(), ms);
        self
    }

    fn with_audit(mut self, perspective: &str, verdict: &str, rationale: &str) -> Self {
        self.audit_response.insert(
            perspective.to_string(),
            Structured::Parsed(json!({"status": verdict, "reasoning": rationale})),
        );
        self
    }

    fn with_audit_response(mut self, perspective: &str, structured: Structured) -> Self {
        self.audit_response
            .insert(perspective.to_string(), structured);
        self
    }

    fn with_refine_text(mut self, perspective: &str, text: &str) -> Self {
        self.refine_text
            .insert(perspective.to_string(), text.to_string());
        self
    }

    fn with_fragments(mut self, fragments: Vec<ScriptedFragment>) -> Self {
        self.fragments = fragments;
        self
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn refine_calls(&self) -> Vec<String> {
        self.refine_calls.lock().unwrap().clone()
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn decompose_value(&self) -> Structured {
        if let Some(structured) = self.decompose_override.lock().unwrap().clone() {
            return structured;
        }
        let list: Vec<Value> = self
            .perspectives
            .iter()
            .map(|(name, description)| json!({"name": name, "description": description}))
            .collect();
        Structured::Parsed(Value::Array(list))
    }
}

/// Pull `{prefix}{value}` off the first matching prompt line.
fn line_value(prompt: &str, prefix: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(prefix))
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl CompletionGateway for StubGateway {
    async fn complete(&self, request: CompletionRequest) -> GatewayResult<Completion> {
        if let Some(shape) = &request.output_shape {
            match shape.name {
                "perspective_list" => {
                    self.log("decompose".to_string());
                    return Ok(Completion::Structured(self.decompose_value()));
                }
                "audit_verdict" => {
                    let name = line_value(&request.prompt, "Perspective: ");
                    self.log(format!("audit:{name}"));
                    let response = self.audit_response.get(&name).cloned().unwrap_or_else(|| {
                        Structured::Parsed(json!({"status": "SMART", "reasoning": "solid"}))
                    });
                    return Ok(Completion::Structured(response));
                }
                other => panic!("unexpected output shape: {other}"),
            }
        }

        if request.prompt.contains("PREVIOUS ATTEMPT") {
            let name = line_value(&request.prompt, "PERSPECTIVE: ");
            self.log(format!("refine:{name}"));
            self.refine_calls.lock().unwrap().push(name.clone());
            let text = self
                .refine_text
                .get(&name)
                .cloned()
                .unwrap_or_else(|| format!("refined {name} insight"));
            return Ok(Completion::Text(text));
        }

        let name = line_value(&request.prompt, "ROLE: ");
        if let Some(ms) = self.generate_delay_ms.get(&name) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.log(format!("generate:{name}"));
        let text = self
            .generate_text
            .get(&name)
            .cloned()
            .unwrap_or_else(|| format!("{name} insight"));
        Ok(Completion::Text(text))
    }

    async fn complete_streaming(
        &self,
        request: CompletionRequest,
    ) -> GatewayResult<FragmentStream> {
        self.log("synthesize".to_string());
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        *self.synthesize_prompt.lock().unwrap() = Some(request.prompt);

        let fragments = self.fragments.clone();
        let stream = futures::stream::iter(fragments).then(|(delay_ms, result)| async move {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            result.map_err(GatewayError::Transport)
        });
        Ok(Box::pin(stream))
    }
}

fn engine(gateway: Arc<StubGateway>) -> ConsensusEngine {
    ConsensusEngine::new(gateway, EngineConfig::default())
}

async fn run_to_end(engine: &ConsensusEngine, task: &str) -> quorum::RunState {
    engine.start_run(task).await.expect("start accepted");
    engine.wait().await
}

// ========================
// Scenarios
// ========================

#[tokio::test]
async fn scenario_all_smart_no_refinement() {
    let gateway = Arc::new(StubGateway::new(&["Economic", "Ethical", "Operational"]));
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Complete);
    assert_eq!(state.branches.len(), 3);
    assert!(gateway.refine_calls().is_empty());
    assert_eq!(gateway.synthesize_calls.load(Ordering::SeqCst), 1);

    // One branch per perspective, ids unique within the run
    let mut ids: Vec<_> = state.branches.iter().map(|b| b.perspective.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    for branch in &state.branches {
        assert_eq!(branch.phase, BranchPhase::Succeeded);
        assert!(branch.refined_artifact.is_none());
        assert_eq!(
            branch.audit.as_ref().map(|a| a.verdict),
            Some(AuditVerdict::Smart)
        );
        // Derivation law: final == refined ?? initial
        assert_eq!(branch.final_artifact(), branch.initial_artifact.as_deref());
    }

    // Synthesis sees all three finalized branches in decomposition order
    let prompt = gateway.synthesize_prompt.lock().unwrap().clone().unwrap();
    let economic = prompt.find("PERSPECTIVE [Economic]").unwrap();
    let ethical = prompt.find("PERSPECTIVE [Ethical]").unwrap();
    let operational = prompt.find("PERSPECTIVE [Operational]").unwrap();
    assert!(economic < ethical && ethical < operational);
}

#[tokio::test]
async fn scenario_dumb_branch_gets_exactly_one_refinement() {
    let gateway = Arc::new(
        StubGateway::new(&["Economic", "Ethical", "Operational"])
            .with_generate_text("Ethical", "weak take")
            .with_audit("Ethical", "DUMB", "generic filler")
            .with_refine_text("Ethical", "sharpened take"),
    );
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Complete);
    assert_eq!(gateway.refine_calls(), vec!["Ethical".to_string()]);

    let ethical = &state.branches[1];
    assert_eq!(ethical.perspective.name, "Ethical");
    assert_eq!(ethical.final_artifact(), Some("sharpened take"));
    assert_eq!(ethical.initial_artifact.as_deref(), Some("weak take"));
    assert_eq!(ethical.refined_artifact.as_deref(), Some("sharpened take"));

    // The other branches were never refined
    assert!(state.branches[0].refined_artifact.is_none());
    assert!(state.branches[2].refined_artifact.is_none());
}

#[tokio::test]
async fn scenario_empty_generation_fails_run_without_synthesis() {
    let gateway = Arc::new(
        StubGateway::new(&["Economic", "Ethical", "Operational"])
            .with_generate_text("Economic", ""),
    );
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Failed);
    let failure = state.failure.unwrap();
    assert!(failure.contains("Generation failed"), "got: {failure}");
    assert!(failure.contains("Economic"));
    assert_eq!(gateway.synthesize_calls.load(Ordering::SeqCst), 0);

    // Full join: every branch still reached a terminal phase
    assert_eq!(state.branches[0].phase, BranchPhase::Failed);
    assert_eq!(state.branches[1].phase, BranchPhase::Succeeded);
    assert_eq!(state.branches[2].phase, BranchPhase::Succeeded);
}

#[tokio::test]
async fn scenario_audit_parse_failure_fails_open() {
    // Fail-open policy: an unusable audit becomes a synthetic DUMB verdict
    // and the branch proceeds to refinement instead of failing.
    let gateway = Arc::new(
        StubGateway::new(&["Economic", "Ethical", "Operational"]).with_audit_response(
            "Operational",
            Structured::ParseFailure {
                raw: "%%not json%%".to_string(),
                reason: "expected value at line 1".to_string(),
            },
        ),
    );
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Complete);
    assert_eq!(gateway.refine_calls(), vec!["Operational".to_string()]);

    let operational = &state.branches[2];
    let audit = operational.audit.as_ref().unwrap();
    assert_eq!(audit.verdict, AuditVerdict::Dumb);
    assert!(audit.rationale.contains("audit response unusable"));
    assert_eq!(operational.phase, BranchPhase::Succeeded);
    assert!(operational.refined_artifact.is_some());
}

#[tokio::test]
async fn scenario_fragments_concatenate_in_order() {
    let gateway = Arc::new(StubGateway::new(&["Economic"]).with_fragments(vec![
        (0, Ok("## Plan".to_string())),
        (0, Ok("\n- Step 1".to_string())),
        (0, Ok("\n- Step 2".to_string())),
    ]));
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Complete);
    assert_eq!(state.synthesis, "## Plan\n- Step 1\n- Step 2");
}

#[tokio::test]
async fn mid_stream_error_fails_run_but_keeps_partial_text() {
    let gateway = Arc::new(StubGateway::new(&["Economic"]).with_fragments(vec![
        (0, Ok("## Par".to_string())),
        (0, Err("connection reset".to_string())),
    ]));
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(state.synthesis, "## Par");
    assert!(state.failure.unwrap().contains("Synthesis stream failed"));
}

#[tokio::test]
async fn join_barrier_holds_synthesis_until_all_branches_terminal() {
    // Staggered branch latencies; synthesis must still come last.
    let gateway = Arc::new(
        StubGateway::new(&["Economic", "Ethical", "Operational"])
            .with_generate_delay("Economic", 60)
            .with_generate_delay("Ethical", 10)
            .with_generate_delay("Operational", 90),
    );
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;
    assert_eq!(state.phase, RunPhase::Complete);

    let events = gateway.events();
    let synthesize_at = events.iter().position(|e| e == "synthesize").unwrap();
    assert_eq!(
        synthesize_at,
        events.len() - 1,
        "synthesis must be the last gateway call: {events:?}"
    );
    for name in ["Economic", "Ethical", "Operational"] {
        let audit_at = events.iter().position(|e| e == &format!("audit:{name}"));
        assert!(audit_at.unwrap() < synthesize_at);
    }
}

#[tokio::test]
async fn decomposition_of_zero_perspectives_is_fatal() {
    let gateway = Arc::new(
        StubGateway::new(&[]).with_decompose_override(Structured::Parsed(json!([]))),
    );
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Failed);
    assert!(state
        .failure
        .unwrap()
        .contains("zero perspectives"));
    assert!(state.branches.is_empty());
}

#[tokio::test]
async fn unparseable_decomposition_is_fatal() {
    let gateway = Arc::new(StubGateway::new(&[]).with_decompose_override(
        Structured::ParseFailure {
            raw: "oops".to_string(),
            reason: "expected value".to_string(),
        },
    ));
    let engine = engine(Arc::clone(&gateway));

    let state = run_to_end(&engine, "Allocate a $10k budget").await;

    assert_eq!(state.phase, RunPhase::Failed);
    assert!(state.failure.unwrap().contains("Decomposition failed"));
}

// ========================
// Observable surface
// ========================

#[tokio::test]
async fn start_is_rejected_while_run_active_and_until_reset() {
    let gateway = Arc::new(
        StubGateway::new(&["Economic"]).with_generate_delay("Economic", 100),
    );
    let engine = engine(gateway);

    engine.start_run("task one").await.unwrap();
    let rejected = engine.start_run("task two").await;
    assert!(matches!(rejected, Err(EngineError::RunActive)));

    let state = engine.wait().await;
    assert_eq!(state.phase, RunPhase::Complete);

    // Terminal but not reset: still rejected
    let rejected = engine.start_run("task three").await;
    assert!(matches!(rejected, Err(EngineError::RunActive)));

    engine.reset_to_idle().await.unwrap();
    let snapshot = engine.current_snapshot().await;
    assert_eq!(snapshot.phase, RunPhase::Idle);
    assert!(snapshot.branches.is_empty());
    assert!(snapshot.synthesis.is_empty());

    engine.start_run("task four").await.unwrap();
    let state = engine.wait().await;
    assert_eq!(state.phase, RunPhase::Complete);
}

#[tokio::test]
async fn reset_is_rejected_while_run_active() {
    let gateway = Arc::new(
        StubGateway::new(&["Economic"]).with_generate_delay("Economic", 100),
    );
    let engine = engine(gateway);

    engine.start_run("task").await.unwrap();
    assert!(matches!(
        engine.reset_to_idle().await,
        Err(EngineError::ResetWhileActive)
    ));
    let state = engine.wait().await;
    assert_eq!(state.phase, RunPhase::Complete);
}

#[tokio::test]
async fn snapshots_are_idempotent_without_mutation() {
    let gateway = Arc::new(StubGateway::new(&["Economic"]));
    let engine = engine(gateway);

    let state = run_to_end(&engine, "Allocate a $10k budget").await;
    let a = engine.current_snapshot().await;
    let b = engine.current_snapshot().await;
    assert_eq!(a, b);
    assert_eq!(a, state);
}

#[tokio::test]
async fn synthesis_buffer_grows_monotonically() {
    let gateway = Arc::new(StubGateway::new(&["Economic"]).with_fragments(vec![
        (20, Ok("one ".to_string())),
        (20, Ok("two ".to_string())),
        (20, Ok("three".to_string())),
    ]));
    let engine = Arc::new(ConsensusEngine::new(gateway, EngineConfig::default()));

    engine.start_run("Allocate a $10k budget").await.unwrap();

    let observer = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let mut lengths = Vec::new();
            loop {
                let snapshot = engine.current_snapshot().await;
                lengths.push(snapshot.synthesis.len());
                if snapshot.phase.is_terminal() {
                    return lengths;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let state = engine.wait().await;
    assert_eq!(state.phase, RunPhase::Complete);
    assert_eq!(state.synthesis, "one two three");

    let lengths = observer.await.unwrap();
    assert!(lengths.windows(2).all(|w| w[0] <= w[1]), "got: {lengths:?}");
}

#[tokio::test]
async fn cancellation_fails_run_and_terminates_branches() {
    let gateway = Arc::new(
        StubGateway::new(&["Economic", "Ethical", "Operational"])
            .with_generate_delay("Economic", 5_000)
            .with_generate_delay("Ethical", 5_000)
            .with_generate_delay("Operational", 5_000),
    );
    let engine = engine(Arc::clone(&gateway));

    engine.start_run("Allocate a $10k budget").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.cancel().await;

    let state = engine.wait().await;
    assert_eq!(state.phase, RunPhase::Failed);
    assert!(state.failure.unwrap().contains("cancelled"));
    for branch in &state.branches {
        assert!(branch.phase.is_terminal());
        assert_eq!(branch.phase, BranchPhase::Failed);
    }
    assert_eq!(gateway.synthesize_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_task_is_rejected_synchronously() {
    let gateway = Arc::new(StubGateway::new(&["Economic"]));
    let engine = engine(gateway);

    assert!(engine.start_run("   ").await.is_err());
    assert_eq!(engine.current_snapshot().await.phase, RunPhase::Idle);
}
