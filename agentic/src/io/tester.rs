//! Test runner adapter for generated scripts.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::types::TestResult;
use crate::io::config::TestConfig;
use crate::io::process::{command_from_template, run_command};

pub const TEST_LOG_FILE: &str = "test.log";

#[derive(Debug, Clone)]
pub struct TestRequest {
    pub run_id: String,
    /// Run directory; the script is written here and the command runs here.
    pub run_dir: PathBuf,
    pub code: String,
}

/// Executes generated code and reports pass/fail with a diagnostic.
///
/// A failing script is a successful `run` returning `passed: false`; errors
/// are reserved for the runner itself breaking.
pub trait TestRunner {
    fn run(&self, request: &TestRequest) -> Result<TestResult>;
}

/// Writes the script into the run directory and runs the configured command.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    config: TestConfig,
}

impl CommandTestRunner {
    pub fn new(config: &TestConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl TestRunner for CommandTestRunner {
    #[instrument(skip_all, fields(run_id = %request.run_id))]
    fn run(&self, request: &TestRequest) -> Result<TestResult> {
        fs::create_dir_all(&request.run_dir)
            .with_context(|| format!("create run dir {}", request.run_dir.display()))?;
        let script = request.run_dir.join(&self.config.file_name);
        fs::write(&script, &request.code)
            .with_context(|| format!("write script {}", script.display()))?;
        let script = std::path::absolute(&script).context("resolve script path")?;

        let file = script.to_string_lossy().into_owned();
        let mut cmd = command_from_template(
            &self.config.command,
            &[("file", file.as_str()), ("run_id", request.run_id.as_str())],
        )?;
        cmd.current_dir(&request.run_dir);

        info!(script = %script.display(), "running test command");
        let start = Instant::now();
        let output = run_command(
            cmd,
            None,
            Some(Duration::from_secs(self.config.timeout_secs)),
            self.config.output_limit_bytes,
        )?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let diagnostic = output.transcript("test");
        let log_path = request.run_dir.join(TEST_LOG_FILE);
        fs::write(&log_path, &diagnostic)
            .with_context(|| format!("write test log {}", log_path.display()))?;

        let passed = output.status.success() && !output.timed_out;
        if !passed {
            warn!(exit_code = ?output.status.code(), timed_out = output.timed_out, "test failed");
        }
        Ok(TestResult {
            passed,
            diagnostic,
            exit_code: output.status.code(),
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(command: &[&str]) -> CommandTestRunner {
        CommandTestRunner::new(&TestConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            file_name: "plot.sh".to_string(),
            timeout_secs: 5,
            output_limit_bytes: 4096,
        })
    }

    fn request(dir: &std::path::Path, code: &str) -> TestRequest {
        TestRequest {
            run_id: "run-1".to_string(),
            run_dir: dir.join("run-1"),
            code: code.to_string(),
        }
    }

    #[test]
    fn passing_script_records_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let result = runner(&["sh", "{file}"])
            .run(&request(temp.path(), "echo rendered plot.png\n"))
            .expect("run");
        assert!(result.passed);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.diagnostic.contains("rendered plot.png"));
        assert!(temp.path().join("run-1/plot.sh").exists());
        assert!(temp.path().join("run-1").join(TEST_LOG_FILE).exists());
    }

    #[test]
    fn failing_script_is_not_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let result = runner(&["sh", "{file}"])
            .run(&request(temp.path(), "echo boom >&2\nexit 1\n"))
            .expect("run");
        assert!(!result.passed);
        assert_eq!(result.exit_code, Some(1));
        assert!(result.diagnostic.contains("boom"));
    }

    #[test]
    fn runs_inside_the_run_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        runner(&["sh", "{file}"])
            .run(&request(temp.path(), "touch plot.png\n"))
            .expect("run");
        assert!(temp.path().join("run-1/plot.png").exists());
    }
}
