//! The run record: a fixed identity plus an open bag of phase outputs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::phase::Phase;
use crate::core::types::TestResult;
use crate::error::RunError;

/// Prompt recorded when a plan file provides the intent instead of a request.
pub const FROM_PLAN_FILE: &str = "(from plan file)";

/// Keys stored as typed fields; `update` refuses to touch them.
const RESERVED_KEYS: [&str; 4] = ["run_id", "prompt", "plan_file", "phase"];

/// One invocation of the end-to-end task, persisted as `state.json`.
///
/// Phases evolve independently, so everything past the identity lives in an
/// open map and unknown keys survive a save/load cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    run_id: String,
    prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan_file: Option<String>,
    /// Last phase that completed and was saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Run {
    pub fn new(
        run_id: impl Into<String>,
        prompt: impl Into<String>,
        plan_file: Option<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            prompt: prompt.into(),
            plan_file,
            phase: None,
            fields: Map::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn plan_file(&self) -> Option<&str> {
        self.plan_file.as_deref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = Some(phase);
    }

    /// Store-owned metadata such as `created_at`; never a reserved key.
    pub(crate) fn insert_meta(&mut self, key: &str, value: Value) {
        debug_assert!(!RESERVED_KEYS.contains(&key));
        self.fields.insert(key.to_string(), value);
    }

    /// Value of any key, including the fixed identity keys.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "run_id" => Some(Value::String(self.run_id.clone())),
            "prompt" => Some(Value::String(self.prompt.clone())),
            "plan_file" => self.plan_file.clone().map(Value::String),
            "phase" => self.phase.map(|p| Value::String(p.as_str().to_string())),
            _ => self.fields.get(key).cloned(),
        }
    }

    /// True when `key` holds a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// Merge keys into the record in memory. Nothing is written to disk.
    ///
    /// Rejects the whole batch if any key is reserved.
    pub fn update<I, K>(&mut self, pairs: I) -> Result<(), RunError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let pairs: Vec<(String, Value)> = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if let Some((key, _)) = pairs
            .iter()
            .find(|(key, _)| RESERVED_KEYS.contains(&key.as_str()))
        {
            return Err(RunError::ReservedKey(key.clone()));
        }
        self.fields.extend(pairs);
        Ok(())
    }

    /// Phase output keys in insertion-independent (sorted) order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn task_type(&self) -> Option<&str> {
        self.str_field("task_type")
    }

    pub fn classify_reason(&self) -> Option<&str> {
        self.str_field("classify_reason")
    }

    pub fn plan(&self) -> Option<&str> {
        self.str_field("plan")
    }

    pub fn code(&self) -> Option<&str> {
        self.str_field("code")
    }

    /// Typed view of `test_result`; `None` when absent or malformed.
    pub fn test_result(&self) -> Option<TestResult> {
        let value = self.fields.get("test_result")?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn commit_message(&self) -> Option<&str> {
        self.str_field("commit_message")
    }

    pub fn pr_url(&self) -> Option<&str> {
        self.str_field("pr_url")
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}
