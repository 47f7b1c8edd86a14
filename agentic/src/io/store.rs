//! Run store: one directory per run under the store root, each holding
//! `state.json`.
//!
//! There is no index file; runs are enumerated by listing directories.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use jsonschema::{Draft, Validator};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::phase::Phase;
use crate::core::run::Run;
use crate::error::StoreError;

pub const STATE_FILE: &str = "state.json";

const RUN_STATE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/run_state.schema.json"
));

static RUN_STATE_VALIDATOR: LazyLock<Result<Validator, String>> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(RUN_STATE_SCHEMA)
        .map_err(|err| format!("parse run state schema: {err}"))?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| format!("compile run state schema: {err}"))
});

/// Mint a fresh run in memory. Nothing is written to disk.
pub fn create(prompt: &str, plan_file: Option<&str>) -> Run {
    let mut run = Run::new(new_run_id(), prompt, plan_file.map(str::to_string));
    run.insert_meta("created_at", Value::String(Utc::now().to_rfc3339()));
    info!(run_id = %run.run_id(), plan_file = ?plan_file, "created run");
    run
}

/// 48 random bits as 12 lowercase hex characters.
pub fn new_run_id() -> String {
    let bytes: [u8; 6] = rand::random();
    hex::encode(bytes)
}

/// Validate that an id is safe to use as a run directory name.
pub fn validate_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("run id must not be empty".to_string());
    }
    if id == "." || id == ".." {
        return Err(format!("run id must not be '{id}'"));
    }
    if id
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
    {
        return Err(format!("run id must be [A-Za-z0-9._-] only (got '{id}')"));
    }
    Ok(())
}

pub fn run_dir(store_dir: &Path, run_id: &str) -> PathBuf {
    store_dir.join(run_id)
}

pub fn state_path(store_dir: &Path, run_id: &str) -> PathBuf {
    run_dir(store_dir, run_id).join(STATE_FILE)
}

/// Persist `run` to `<store_dir>/<run_id>/state.json` and return the absolute path.
///
/// When `phase` is given it is recorded as the last completed phase. The
/// in-memory run only changes once the write has landed.
pub fn save(
    run: &mut Run,
    store_dir: &Path,
    phase: Option<Phase>,
) -> Result<PathBuf, StoreError> {
    let path = state_path(store_dir, run.run_id());
    validate_id(run.run_id()).map_err(|reason| StoreError::Storage {
        path: path.clone(),
        source: std::io::Error::new(ErrorKind::InvalidInput, reason),
    })?;

    let mut staged = run.clone();
    if let Some(phase) = phase {
        staged.set_phase(phase);
    }
    let mut buf = serde_json::to_string_pretty(&staged).map_err(|err| StoreError::Storage {
        path: path.clone(),
        source: std::io::Error::other(err),
    })?;
    buf.push('\n');

    debug!(path = %path.display(), phase = ?staged.phase(), "writing run state");
    write_atomic(&path, &buf)?;
    *run = staged;

    std::path::absolute(&path).map_err(|source| StoreError::Storage { path, source })
}

/// Load `<store_dir>/<run_id>/state.json`.
pub fn load(run_id: &str, store_dir: &Path) -> Result<Run, StoreError> {
    let not_found = || StoreError::NotFound {
        run_id: run_id.to_string(),
        store_dir: store_dir.to_path_buf(),
    };
    if validate_id(run_id).is_err() {
        return Err(not_found());
    }

    let path = state_path(store_dir, run_id);
    debug!(path = %path.display(), "loading run state");
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(source) => return Err(StoreError::Storage { path, source }),
    };

    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.clone(),
        reason,
    };
    let value: Value = serde_json::from_str(&contents).map_err(|err| corrupt(err.to_string()))?;
    let violations = schema_violations(&value);
    if !violations.is_empty() {
        return Err(corrupt(violations.join("; ")));
    }
    let run: Run = serde_json::from_value(value).map_err(|err| corrupt(err.to_string()))?;
    if run.run_id() != run_id {
        return Err(corrupt(format!(
            "record run_id '{}' does not match directory '{run_id}'",
            run.run_id()
        )));
    }
    debug!(run_id, phase = ?run.phase(), "run state loaded");
    Ok(run)
}

/// Sorted ids of every run directory that holds a `state.json`.
pub fn list_runs(store_dir: &Path) -> Result<Vec<String>, StoreError> {
    let entries = match fs::read_dir(store_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Storage {
                path: store_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Storage {
            path: store_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.join(STATE_FILE).is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            ids.push(name.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}

/// Validate a raw record against the run-state JSON Schema (Draft 2020-12).
///
/// Returns one message per violation; empty when the record conforms.
pub fn schema_violations(instance: &Value) -> Vec<String> {
    match &*RUN_STATE_VALIDATOR {
        Ok(validator) => validator
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect(),
        Err(reason) => vec![reason.clone()],
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Storage {
        path: path.to_path_buf(),
        source: std::io::Error::new(ErrorKind::InvalidInput, "state path has no parent"),
    })?;
    fs::create_dir_all(parent).map_err(storage(parent))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).map_err(storage(&tmp_path))?;
    fs::rename(&tmp_path, path).map_err(storage(path))?;
    Ok(())
}

fn storage(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Storage { path, source }
}
