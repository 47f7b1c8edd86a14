//! Prompt rendering for the LLM-backed phases.

use std::fs;

use anyhow::{Context, Result, anyhow};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::phase::Phase;
use crate::core::run::Run;

const CLASSIFY_TEMPLATE: &str = include_str!("prompts/classify.md");
const PLAN_TEMPLATE: &str = include_str!("prompts/plan.md");
const GENERATE_TEMPLATE: &str = include_str!("prompts/generate.md");
const SHIP_TEMPLATE: &str = include_str!("prompts/ship.md");

/// Everything a phase prompt may reference, gathered from the run record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptInputs {
    pub prompt: String,
    pub plan_file: Option<String>,
    /// Contents of `plan_file`, when one was given.
    pub plan_spec: Option<String>,
    pub task_type: Option<String>,
    pub plan: Option<String>,
    pub code: Option<String>,
    /// Diagnostic of the last failing test, fed back into `generate`.
    pub previous_failure: Option<String>,
}

impl PromptInputs {
    /// Collect inputs from `run`, reading the plan file if one is set.
    pub fn from_run(run: &Run) -> Result<Self> {
        let plan_spec = match run.plan_file() {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("read plan file {path}"))?
                    .trim()
                    .to_string(),
            ),
            None => None,
        };
        let previous_failure = run
            .test_result()
            .filter(|result| !result.passed)
            .map(|result| result.diagnostic);

        Ok(Self {
            prompt: run.prompt().to_string(),
            plan_file: run.plan_file().map(str::to_string),
            plan_spec,
            task_type: run.task_type().map(str::to_string),
            plan: run.plan().map(str::to_string),
            code: run.code().map(str::to_string),
            previous_failure,
        })
    }
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (phase, source) in [
            (Phase::Classify, CLASSIFY_TEMPLATE),
            (Phase::Plan, PLAN_TEMPLATE),
            (Phase::Generate, GENERATE_TEMPLATE),
            (Phase::Ship, SHIP_TEMPLATE),
        ] {
            env.add_template(phase.as_str(), source)
                .with_context(|| format!("load {phase} template"))?;
        }
        Ok(Self { env })
    }

    /// Render the prompt for `phase`. `test` is not model-backed and has no template.
    pub fn render(&self, phase: Phase, inputs: &PromptInputs) -> Result<String> {
        if phase == Phase::Test {
            return Err(anyhow!("phase {phase} does not use a prompt"));
        }
        let template = self.env.get_template(phase.as_str())?;
        let rendered = template.render(context! {
            prompt => inputs.prompt.trim(),
            plan_file => inputs.plan_file.as_deref(),
            plan_spec => non_blank(inputs.plan_spec.as_deref()),
            task_type => inputs.task_type.as_deref(),
            plan => non_blank(inputs.plan.as_deref()),
            code => inputs.code.as_deref().map(str::trim_end),
            previous_failure => non_blank(inputs.previous_failure.as_deref()),
        })?;
        debug!(%phase, bytes = rendered.len(), "rendered prompt");
        Ok(rendered)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
