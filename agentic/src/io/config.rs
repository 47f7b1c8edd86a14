//! Harness configuration stored in `agentic.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "agentic.toml";

/// Harness configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding one subdirectory per run.
    pub store_dir: PathBuf,

    pub llm: LlmConfig,

    pub test: TestConfig,

    pub ship: ShipConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    /// Command that reads a prompt on stdin and answers on stdout.
    pub command: Vec<String>,
    /// Kill the provider after this many seconds. Unset means wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Keep at most this many bytes of provider stdout/stderr.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestConfig {
    /// Command that exercises the generated script. `{file}` is replaced with its path.
    pub command: Vec<String>,
    /// Name of the generated script inside the run directory.
    pub file_name: String,
    pub timeout_secs: u64,
    /// Truncate the recorded diagnostic beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShipConfig {
    /// Command that publishes the change and prints a PR URL as its last line.
    /// Supports `{message}`, `{file}` and `{run_id}`. Empty disables publishing.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("agents"),
            llm: LlmConfig::default(),
            test: TestConfig::default(),
            ship: ShipConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            command: vec!["claude".to_string(), "-p".to_string()],
            timeout_secs: None,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: vec!["python".to_string(), "{file}".to_string()],
            file_name: "plot.py".to_string(),
            timeout_secs: 5 * 60,
            output_limit_bytes: 20_000,
        }
    }
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 2 * 60,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.store_dir.as_os_str().is_empty() {
            return Err(anyhow!("store_dir must not be empty"));
        }
        if is_blank_command(&self.llm.command) {
            return Err(anyhow!("llm.command must be a non-empty array"));
        }
        if self.llm.timeout_secs == Some(0) {
            return Err(anyhow!("llm.timeout_secs must be > 0 when set"));
        }
        if self.llm.output_limit_bytes == 0 {
            return Err(anyhow!("llm.output_limit_bytes must be > 0"));
        }
        if is_blank_command(&self.test.command) {
            return Err(anyhow!("test.command must be a non-empty array"));
        }
        if self.test.file_name.trim().is_empty() || self.test.file_name.contains(['/', '\\']) {
            return Err(anyhow!("test.file_name must be a plain file name"));
        }
        if self.test.timeout_secs == 0 {
            return Err(anyhow!("test.timeout_secs must be > 0"));
        }
        if self.test.output_limit_bytes == 0 {
            return Err(anyhow!("test.output_limit_bytes must be > 0"));
        }
        if !self.ship.command.is_empty() && is_blank_command(&self.ship.command) {
            return Err(anyhow!("ship.command must start with a program name"));
        }
        if self.ship.timeout_secs == 0 {
            return Err(anyhow!("ship.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

fn is_blank_command(command: &[String]) -> bool {
    command.first().is_none_or(|program| program.trim().is_empty())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &HarnessConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
