//! Typed errors that callers branch on.
//!
//! Orchestration code carries these inside `anyhow::Error`; the binary uses
//! `downcast_ref` to map them onto exit codes.

use std::path::PathBuf;

use crate::core::phase::Phase;

/// JSON could not be extracted from model output, or had the wrong shape.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No valid JSON found")]
    NoJson,
    #[error("JSON did not match the expected shape: {0}")]
    Invalid(#[source] serde_json::Error),
    #[error("expected a single JSON value, found a list of {0}")]
    UnexpectedList(usize),
}

/// Failures of the on-disk state store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("run {run_id} not found in {}", store_dir.display())]
    NotFound { run_id: String, store_dir: PathBuf },
    #[error("run state {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("storage error at {}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// In-memory mutation of a run record was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RunError {
    #[error("key `{0}` is fixed at creation and cannot be updated")]
    ReservedKey(String),
}

/// The resolver could not determine which run to act on.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{message}{}", hint.as_deref().map(|h| format!("\n{h}")).unwrap_or_default())]
pub struct UsageError {
    pub message: String,
    pub hint: Option<String>,
}

/// A phase was invoked before its prerequisite keys were recorded.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("phase {phase} for run {run_id} is missing inputs: {}", missing.join(", "))]
pub struct MissingInputs {
    pub phase: Phase,
    pub run_id: String,
    pub missing: Vec<&'static str>,
}

/// The test phase recorded a failure, so the run cannot ship.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("tests did not pass for run {run_id}")]
pub struct TestsFailed {
    pub run_id: String,
}
