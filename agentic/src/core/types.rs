//! JSON contracts for phase outputs.
//!
//! The LLM-backed phases are prompted to answer with exactly these shapes;
//! the tolerant parser validates responses against them.

use serde::{Deserialize, Serialize};

/// Classification vocabulary for incoming requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Feature,
    Bug,
    Chore,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Feature => "feature",
            TaskType::Bug => "bug",
            TaskType::Chore => "chore",
        }
    }
}

/// Output of `classify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyOutput {
    pub task_type: TaskType,
    #[serde(default)]
    pub reason: String,
}

/// Output of `plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutput {
    pub plan: String,
}

/// Output of `generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOutput {
    pub code: String,
}

/// Output of `ship` (the PR URL comes from the shipper, not the model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOutput {
    pub commit_message: String,
}

/// Outcome recorded by `test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    /// Captured output or failure reason, free-form.
    pub diagnostic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub duration_ms: u64,
}
