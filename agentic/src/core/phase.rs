//! The ordered phase protocol and each phase's inputs and outputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::run::Run;

/// One named step of the workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Classify,
    Plan,
    Generate,
    Test,
    Ship,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Classify,
        Phase::Plan,
        Phase::Generate,
        Phase::Test,
        Phase::Ship,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Classify => "classify",
            Phase::Plan => "plan",
            Phase::Generate => "generate",
            Phase::Test => "test",
            Phase::Ship => "ship",
        }
    }

    /// Phase that follows `self`, or `None` after `ship`.
    pub fn next(self) -> Option<Phase> {
        let idx = Phase::ALL.iter().position(|p| *p == self)?;
        Phase::ALL.get(idx + 1).copied()
    }

    /// Record keys this phase reads.
    pub fn reads(self) -> &'static [&'static str] {
        match self {
            Phase::Classify => &["prompt"],
            Phase::Plan => &["prompt", "task_type"],
            Phase::Generate => &["plan"],
            Phase::Test => &["code"],
            Phase::Ship => &["code", "test_result"],
        }
    }

    /// Record keys this phase owns. A phase only ever writes these.
    pub fn writes(self) -> &'static [&'static str] {
        match self {
            Phase::Classify => &["task_type", "classify_reason"],
            Phase::Plan => &["plan"],
            Phase::Generate => &["code"],
            Phase::Test => &["test_result"],
            Phase::Ship => &["commit_message", "pr_url"],
        }
    }

    /// Prerequisite keys not yet present on `run`.
    ///
    /// A plan file stands in for the upstream `task_type` and `plan` outputs,
    /// which lets an operator start from a written specification.
    pub fn missing_inputs(self, run: &Run) -> Vec<&'static str> {
        self.reads()
            .iter()
            .copied()
            .filter(|key| !satisfied(run, key))
            .collect()
    }
}

fn satisfied(run: &Run, key: &str) -> bool {
    match key {
        "prompt" => true,
        "task_type" | "plan" if run.plan_file().is_some() => true,
        _ => run.has(key),
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Phase::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown phase '{s}' (expected one of {})", names.join(", "))
            })
    }
}
