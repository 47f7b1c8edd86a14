//! Diagnostic tracing for the harness, written to stderr.
//!
//! stdout carries only the run record a phase command prints, so
//! `agentic plan | agentic generate` keeps working at any verbosity. The
//! prompt and response transcripts (`<phase>.prompt.md`,
//! `<phase>.response.txt`) and `test.log` under the run directory are always
//! written and do not depend on the filter.

use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Harness-specific filter variable, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "AGENTIC_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Install the stderr subscriber.
///
/// # Example
/// ```bash
/// AGENTIC_LOG=agentic::phases=debug agentic run --plan-file spec.md
/// ```
pub fn init() {
    let directives = env::var(LOG_ENV)
        .ok()
        .or_else(|| env::var(EnvFilter::DEFAULT_ENV).ok());

    tracing_subscriber::registry()
        .with(filter_from(directives))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Unset or unparsable directives fall back to `warn`.
fn filter_from(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
