//! Stable exit codes for `agentic` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Unknown run, no input source, or a phase whose prerequisites are missing.
pub const INVALID: i32 = 1;
/// Unexpected failure: storage, corrupt state, phase error, or failing tests.
pub const FAILED: i32 = 2;
