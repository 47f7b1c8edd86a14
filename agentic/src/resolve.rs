//! Choosing which run a CLI invocation operates on.
//!
//! Three sources are tried in a fixed order: an explicit run id, a run record
//! piped on stdin, then a plan file. Their preconditions are mutually
//! exclusive at the point of decision, so no mode flag is needed.

use std::io::{IsTerminal, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::run::{FROM_PLAN_FILE, Run};
use crate::error::{StoreError, UsageError};
use crate::io::store;

/// Where a piped run record comes from.
pub trait InputSource {
    fn is_terminal(&self) -> bool;
    fn read_all(&mut self) -> std::io::Result<String>;
}

/// The process stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinSource;

impl InputSource for StdinSource {
    fn is_terminal(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    fn read_all(&mut self) -> std::io::Result<String> {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    }
}

/// Sink for operator-facing diagnostics.
pub trait Reporter {
    fn error(&self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Produce the run the operator intends to act on.
///
/// Never returns without a run unless it has already reported why: every
/// resolution failure is written through `reporter` and returned as a
/// [`UsageError`]. Storage failures other than a missing run propagate
/// unreported.
pub fn resolve_state(
    run_id: Option<&str>,
    store_dir: &Path,
    reporter: &dyn Reporter,
    input: &mut dyn InputSource,
    plan_file: Option<&str>,
    usage_hint: Option<&str>,
) -> Result<Run> {
    if let Some(run_id) = run_id {
        return match store::load(run_id, store_dir) {
            Ok(run) => {
                debug!(run_id, "resolved run from store");
                Ok(run)
            }
            Err(StoreError::NotFound { .. }) => Err(usage(
                reporter,
                format!("run not found: {run_id} (store {})", store_dir.display()),
                usage_hint,
            )),
            Err(err) => Err(err.into()),
        };
    }

    if !input.is_terminal() {
        let raw = input.read_all().context("read run record from stdin")?;
        if !raw.trim().is_empty() {
            return run_from_stdin(&raw).map_err(|reason| {
                usage(
                    reporter,
                    format!("stdin is not a valid run record: {reason}"),
                    usage_hint,
                )
            });
        }
        debug!("stdin was empty");
    }

    if let Some(plan_file) = plan_file {
        let run = store::create(FROM_PLAN_FILE, Some(plan_file));
        info!(run_id = %run.run_id(), plan_file, "resolved fresh run from plan file");
        return Ok(run);
    }

    Err(usage(
        reporter,
        "no input: pass a run id, pipe a run record on stdin, or give --plan-file".to_string(),
        usage_hint,
    ))
}

fn run_from_stdin(raw: &str) -> std::result::Result<Run, String> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|err| err.to_string())?;
    let violations = store::schema_violations(&value);
    if !violations.is_empty() {
        return Err(violations.join("; "));
    }
    let run: Run = serde_json::from_value(value).map_err(|err| err.to_string())?;
    debug!(run_id = %run.run_id(), "resolved run from stdin");
    Ok(run)
}

fn usage(reporter: &dyn Reporter, message: String, hint: Option<&str>) -> anyhow::Error {
    let err = UsageError {
        message,
        hint: hint.map(str::to_string),
    };
    reporter.error(&err.to_string());
    err.into()
}
