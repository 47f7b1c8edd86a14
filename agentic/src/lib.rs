//! Resumable, file-backed workflow harness for LLM-driven plot generation.
//!
//! A run moves through the fixed phases `classify → plan → generate → test →
//! ship`. Each phase reads the run record, asks an LLM provider for a JSON
//! answer, writes the parsed result back under a well-known key, and saves the
//! record atomically so a later invocation can resume from the run id alone.
//!
//! - **[`core`]**: Pure, deterministic logic (phase protocol, tolerant JSON
//!   extraction, phase output types). No I/O.
//! - **[`io`]**: Side-effecting operations (state store, config, child
//!   processes, prompt rendering).
//!
//! Orchestration modules ([`resolve`], [`phases`], [`workflow`]) coordinate
//! core logic with I/O to implement CLI commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod phases;
pub mod resolve;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
