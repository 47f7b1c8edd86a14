//! Execution of a single phase against a run record.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::core::json_extract::parse_json_as;
use crate::core::phase::Phase;
use crate::core::run::Run;
use crate::core::types::{ClassifyOutput, GenerateOutput, PlanOutput, ShipOutput};
use crate::error::{MissingInputs, TestsFailed};
use crate::io::prompt::{PromptEngine, PromptInputs};
use crate::io::provider::LlmProvider;
use crate::io::shipper::{ShipRequest, Shipper};
use crate::io::store;
use crate::io::tester::{TestRequest, TestRunner};

/// Collaborators a phase needs. Borrowed so one set can serve a whole workflow.
pub struct PhaseContext<'a> {
    pub store_dir: &'a Path,
    pub provider: &'a dyn LlmProvider,
    pub tester: &'a dyn TestRunner,
    pub shipper: &'a dyn Shipper,
    pub prompts: &'a PromptEngine,
    /// File name the test phase writes the generated code to.
    pub script_name: &'a str,
}

impl PhaseContext<'_> {
    fn run_dir(&self, run: &Run) -> PathBuf {
        store::run_dir(self.store_dir, run.run_id())
    }
}

/// Run `phase` once and save the run, recording `phase` as completed.
///
/// Fails with [`MissingInputs`] before doing any work when prerequisites are
/// absent. On any failure `run` is left exactly as it was.
#[instrument(skip_all, fields(run_id = %run.run_id(), %phase))]
pub fn run_phase(phase: Phase, run: &mut Run, ctx: &PhaseContext<'_>) -> Result<PathBuf> {
    let missing = phase.missing_inputs(run);
    if !missing.is_empty() {
        return Err(MissingInputs {
            phase,
            run_id: run.run_id().to_string(),
            missing,
        }
        .into());
    }

    let run_dir = ctx.run_dir(run);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create run dir {}", run_dir.display()))?;

    let updates = match phase {
        Phase::Classify => {
            let out: ClassifyOutput = ask(phase, run, ctx)?;
            vec![
                ("task_type", json!(out.task_type.as_str())),
                ("classify_reason", json!(out.reason)),
            ]
        }
        Phase::Plan => {
            let out: PlanOutput = ask(phase, run, ctx)?;
            vec![("plan", json!(out.plan))]
        }
        Phase::Generate => {
            let out: GenerateOutput = ask(phase, run, ctx)?;
            vec![("code", json!(out.code))]
        }
        Phase::Test => execute_tests(run, ctx, run_dir)?,
        Phase::Ship => publish(run, ctx, run_dir)?,
    };
    debug_assert!(updates.iter().all(|(key, _)| phase.writes().contains(key)));

    let mut next = run.clone();
    next.update(updates)
        .with_context(|| format!("record {phase} output for run {}", run.run_id()))?;
    let path = store::save(&mut next, ctx.store_dir, Some(phase))
        .with_context(|| format!("save run {} after {phase}", run.run_id()))?;
    *run = next;
    info!(path = %path.display(), "phase complete");
    Ok(path)
}

/// Render the phase prompt, call the provider and parse its answer as `T`.
///
/// Prompt and raw response are kept next to `state.json` for inspection.
fn ask<T: DeserializeOwned>(phase: Phase, run: &Run, ctx: &PhaseContext<'_>) -> Result<T> {
    let run_dir = ctx.run_dir(run);
    let inputs = PromptInputs::from_run(run)?;
    let prompt = ctx.prompts.render(phase, &inputs)?;
    write_transcript(&run_dir.join(format!("{phase}.prompt.md")), &prompt)?;

    let response = ctx
        .provider
        .complete(&prompt)
        .with_context(|| format!("{phase} provider call failed for run {}", run.run_id()))?;
    write_transcript(&run_dir.join(format!("{phase}.response.txt")), &response)?;

    parse_json_as(&response)
        .with_context(|| format!("parse {phase} output for run {}", run.run_id()))
}

type Updates = Vec<(&'static str, Value)>;

fn execute_tests(run: &Run, ctx: &PhaseContext<'_>, run_dir: PathBuf) -> Result<Updates> {
    let request = TestRequest {
        run_id: run.run_id().to_string(),
        run_dir,
        code: run.code().unwrap_or_default().to_string(),
    };
    let result = ctx
        .tester
        .run(&request)
        .with_context(|| format!("test runner failed for run {}", run.run_id()))?;
    if !result.passed {
        warn!(exit_code = ?result.exit_code, "generated code failed its test");
    }
    Ok(vec![("test_result", serde_json::to_value(result)?)])
}

fn publish(run: &Run, ctx: &PhaseContext<'_>, run_dir: PathBuf) -> Result<Updates> {
    if !run.test_result().is_some_and(|result| result.passed) {
        return Err(TestsFailed {
            run_id: run.run_id().to_string(),
        }
        .into());
    }

    let out: ShipOutput = ask(Phase::Ship, run, ctx)?;
    let request = ShipRequest {
        run_id: run.run_id().to_string(),
        file: run_dir.join(ctx.script_name),
        run_dir,
        commit_message: out.commit_message.clone(),
    };
    let pr_url = ctx
        .shipper
        .ship(&request)
        .with_context(|| format!("ship failed for run {}", run.run_id()))?;

    let mut updates = vec![("commit_message", json!(out.commit_message))];
    if let Some(url) = pr_url {
        updates.push(("pr_url", json!(url)));
    }
    Ok(updates)
}

fn write_transcript(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
