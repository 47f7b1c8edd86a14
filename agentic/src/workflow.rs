//! Driving a run through its remaining phases.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::phase::Phase;
use crate::core::run::Run;
use crate::phases::{PhaseContext, run_phase};

/// Reason why `run_workflow` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStop {
    /// `ship` completed.
    Shipped,
    /// `test` recorded a failure; the run is left at `test` for another `generate`.
    TestsFailed,
}

/// Summary of a workflow invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub run_id: String,
    pub phases_executed: Vec<Phase>,
    pub stop: WorkflowStop,
}

/// The phase a workflow starts at: `from` if given, otherwise the one after
/// the last completed phase, otherwise `classify`. `None` when the run has
/// already shipped.
pub fn first_phase(run: &Run, from: Option<Phase>) -> Option<Phase> {
    match (from, run.phase()) {
        (Some(phase), _) => Some(phase),
        (None, Some(done)) => done.next(),
        (None, None) => Some(Phase::Classify),
    }
}

/// Run phases in order through `ship`, saving after each.
///
/// Stops on the first error (the run stays at the last saved phase), or
/// early when the test phase records a failure.
#[instrument(skip_all, fields(run_id = %run.run_id()))]
pub fn run_workflow<F: FnMut(Phase, &Run)>(
    run: &mut Run,
    ctx: &PhaseContext<'_>,
    from: Option<Phase>,
    mut on_phase: F,
) -> Result<WorkflowOutcome> {
    let mut phases_executed = Vec::new();
    let mut next = first_phase(run, from);

    while let Some(phase) = next {
        run_phase(phase, run, ctx)?;
        phases_executed.push(phase);
        on_phase(phase, run);

        if phase == Phase::Test && !run.test_result().is_some_and(|result| result.passed) {
            warn!("stopping before ship: tests failed");
            return Ok(WorkflowOutcome {
                run_id: run.run_id().to_string(),
                phases_executed,
                stop: WorkflowStop::TestsFailed,
            });
        }
        next = phase.next();
    }

    info!(phases = phases_executed.len(), "workflow complete");
    Ok(WorkflowOutcome {
        run_id: run.run_id().to_string(),
        phases_executed,
        stop: WorkflowStop::Shipped,
    })
}
