//! Publishing adapter for the `ship` phase.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::io::config::ShipConfig;
use crate::io::process::{command_from_template, run_command};

const SHIP_OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ShipRequest {
    pub run_id: String,
    pub run_dir: PathBuf,
    /// Path of the generated script that passed its tests.
    pub file: PathBuf,
    pub commit_message: String,
}

/// Publishes a tested change, returning the PR URL when one was opened.
pub trait Shipper {
    fn ship(&self, request: &ShipRequest) -> Result<Option<String>>;
}

/// Runs the configured publish command; its last non-empty stdout line is the PR URL.
#[derive(Debug, Clone)]
pub struct CommandShipper {
    config: ShipConfig,
}

impl CommandShipper {
    pub fn new(config: &ShipConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Shipper for CommandShipper {
    #[instrument(skip_all, fields(run_id = %request.run_id))]
    fn ship(&self, request: &ShipRequest) -> Result<Option<String>> {
        if self.config.command.is_empty() {
            debug!("no ship command configured, recording commit message only");
            return Ok(None);
        }
        let file = request.file.to_string_lossy().into_owned();
        let mut cmd = command_from_template(
            &self.config.command,
            &[
                ("message", request.commit_message.as_str()),
                ("file", file.as_str()),
                ("run_id", request.run_id.as_str()),
            ],
        )?;
        cmd.current_dir(&request.run_dir);

        info!("running ship command");
        let output = run_command(
            cmd,
            None,
            Some(Duration::from_secs(self.config.timeout_secs)),
            SHIP_OUTPUT_LIMIT_BYTES,
        )?;
        if output.timed_out || !output.status.success() {
            return Err(anyhow!(
                "ship command {:?} failed with status {:?}\n{}",
                self.config.command,
                output.status.code(),
                output.transcript("ship")
            ));
        }
        Ok(last_line(&output.stdout_lossy()))
    }
}

fn last_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(str::to_string)
}
