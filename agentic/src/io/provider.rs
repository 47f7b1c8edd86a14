//! LLM provider abstraction.
//!
//! The [`LlmProvider`] trait decouples phase orchestration from the model
//! backend (by default a CLI that reads a prompt on stdin). Tests use scripted
//! providers that return predetermined responses without spawning processes.

use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::config::LlmConfig;
use crate::io::process::{command_from_template, run_command};

/// Anything that turns a prompt into a free-form text response.
pub trait LlmProvider {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Provider that spawns a configured command, writes the prompt to its stdin
/// and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    command: Vec<String>,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl CommandProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

impl LlmProvider for CommandProvider {
    #[instrument(skip_all, fields(program = ?self.command.first(), prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        info!("requesting completion");
        let cmd = command_from_template(&self.command, &[])?;
        let output = run_command(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )?;

        if output.timed_out {
            warn!("provider timed out");
            return Err(anyhow!(
                "provider {:?} timed out after {:?}",
                self.command,
                self.timeout
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "provider failed");
            return Err(anyhow!(
                "provider {:?} failed with status {:?}\n{}",
                self.command,
                output.status.code(),
                output.transcript("provider")
            ));
        }
        if output.stdout_truncated > 0 {
            warn!(
                truncated = output.stdout_truncated,
                "provider response truncated"
            );
        }

        debug!(bytes = output.stdout.len(), "provider completed");
        Ok(output.stdout_lossy())
    }
}
