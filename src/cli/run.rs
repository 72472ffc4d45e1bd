//! The `run` command: drive one engine run with live progress rendering.

use anyhow::{bail, Result};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::application::ConsensusEngine;
use crate::domain::models::{BranchPhase, Config, RunPhase, RunState};
use crate::infrastructure::HttpGateway;

use super::RunArgs;

const POLL_INTERVAL: Duration = Duration::from_millis(120);

pub async fn execute(args: RunArgs, config: Config) -> Result<()> {
    let gateway = Arc::new(HttpGateway::from_config(&config.gateway)?);
    let engine = Arc::new(ConsensusEngine::new(gateway, config.engine));

    engine.start_run(&args.task).await?;

    // Ctrl-C cancels the run; the render loop then sees the Failed phase.
    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling run");
                engine.cancel().await;
            }
        });
    }

    render_progress(&engine).await;
    let final_state = engine.wait().await;
    report(&final_state)
}

/// Poll snapshots and keep one spinner per branch plus a phase header until
/// the run reaches a terminal phase.
async fn render_progress(engine: &ConsensusEngine) {
    let multi = MultiProgress::new();
    let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let header = multi.add(ProgressBar::new_spinner().with_style(spinner_style.clone()));
    header.enable_steady_tick(Duration::from_millis(100));
    let mut branch_bars: Vec<ProgressBar> = Vec::new();

    loop {
        let snapshot = engine.current_snapshot().await;
        header.set_message(format!(
            "{} {}",
            style("phase:").dim(),
            style(snapshot.phase.as_str()).cyan().bold()
        ));

        if branch_bars.is_empty() && !snapshot.branches.is_empty() {
            for _ in &snapshot.branches {
                let bar = multi.add(ProgressBar::new_spinner().with_style(spinner_style.clone()));
                bar.enable_steady_tick(Duration::from_millis(100));
                branch_bars.push(bar);
            }
        }
        for (bar, branch) in branch_bars.iter().zip(&snapshot.branches) {
            let label = format!(
                "{} {}",
                style(&branch.perspective.name).bold(),
                style(format!("[{}]", branch.phase.as_str())).dim()
            );
            if branch.phase.is_terminal() && !bar.is_finished() {
                let mark = if branch.phase == BranchPhase::Succeeded {
                    style("ok").green()
                } else {
                    style("failed").red()
                };
                bar.finish_with_message(format!("{label} {mark}"));
            } else if !bar.is_finished() {
                bar.set_message(label);
            }
        }

        if snapshot.phase.is_terminal() {
            for bar in &branch_bars {
                bar.finish();
            }
            header.finish_and_clear();
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn report(state: &RunState) -> Result<()> {
    match state.phase {
        RunPhase::Complete => {
            println!("{}", state.synthesis);
            Ok(())
        }
        RunPhase::Failed => {
            if !state.synthesis.is_empty() {
                eprintln!(
                    "{}",
                    style("partial synthesis before failure:").yellow().bold()
                );
                eprintln!("{}", state.synthesis);
            }
            let reason = state.failure.as_deref().unwrap_or("unknown failure");
            bail!("run failed: {reason}");
        }
        other => bail!("run ended in unexpected phase: {}", other.as_str()),
    }
}
