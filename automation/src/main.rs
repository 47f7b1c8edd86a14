//! Branch, label and path parsing for shell automation.
//!
//! Each subcommand prints a single line. Exit code 0 means a match, 1 means
//! no match (with `null` or an empty line on stdout).

use std::io::{Read, Write};

use anyhow::{Context, Result};
use automation::noqa::strip_noqa;
use automation::{
    attempt_count, extract_branch, extract_sub_issue, parse_plot_path, quality_label,
    status_transition,
};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const MATCH: i32 = 0;
const NO_MATCH: i32 = 1;
const FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "automation", version, about = "Parsing helpers for CI scripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse `auto/<spec-id>/<library>` into JSON.
    ExtractBranch { branch: String },
    /// Find `Sub-Issue: #<n>` and print `n`.
    ExtractSubIssue { text: String },
    /// Print the highest `ai-attempt-<n>` among comma-separated labels.
    GetAttemptCount { labels: String },
    /// Parse `plots/<library>/<category>/<spec>/<variant>.py` into JSON.
    ParsePlotPath { path: String },
    /// Print `--remove-label`/`--add-label` arguments to reach a status.
    StatusTransition { labels: String, target: String },
    /// Map a review score to a `quality:*` label.
    QualityLabel { score: String },
    /// Read source on stdin and print it without `# noqa` comments.
    StripNoqa,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();

    let code = match run(Cli::parse().command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            FAILED
        }
    };
    std::process::exit(code);
}

fn run(command: Command) -> Result<i32> {
    let code = match command {
        Command::ExtractBranch { branch } => match extract_branch(&branch) {
            Some(parsed) => emit(&serde_json::to_string(&parsed)?, MATCH),
            None => emit("null", NO_MATCH),
        },
        Command::ExtractSubIssue { text } => match extract_sub_issue(&text) {
            Some(number) => emit(&number.to_string(), MATCH),
            None => emit("", NO_MATCH),
        },
        Command::GetAttemptCount { labels } => emit(&attempt_count(&labels).to_string(), MATCH),
        Command::ParsePlotPath { path } => match parse_plot_path(&path) {
            Some(parsed) => emit(&serde_json::to_string(&parsed)?, MATCH),
            None => emit("null", NO_MATCH),
        },
        Command::StatusTransition { labels, target } => match status_transition(&labels, &target) {
            Some(args) => emit(&args, MATCH),
            None => {
                debug!(%target, "unknown status");
                emit("", NO_MATCH)
            }
        },
        Command::QualityLabel { score } => match score.trim().parse::<i64>() {
            Ok(score) => emit(quality_label(score), MATCH),
            Err(err) => {
                eprintln!("error: score must be an integer (got '{score}'): {err}");
                NO_MATCH
            }
        },
        Command::StripNoqa => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("read source from stdin")?;
            let stripped = strip_noqa(Some(&source)).unwrap_or_default();
            std::io::stdout()
                .write_all(stripped.as_bytes())
                .context("write stripped source")?;
            MATCH
        }
    };
    Ok(code)
}

fn emit(line: &str, code: i32) -> i32 {
    println!("{line}");
    code
}
