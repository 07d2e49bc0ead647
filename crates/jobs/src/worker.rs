//! The loop executed on a job's dedicated worker thread.

use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};

use commons_core::RunId;

use crate::error::{FaultOrigin, JobFault};
use crate::error_box::ErrorBox;
use crate::job::JobWork;
use crate::signal::StopSignal;

/// Per-run state shared between the controller and the worker.
///
/// Replaced wholesale on every start, which resets both the stop signal and
/// the captured fault.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) id: RunId,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) signal: StopSignal,
    pub(crate) errors: ErrorBox,
}

impl RunContext {
    pub(crate) fn new() -> Self {
        Self {
            id: RunId::new(),
            started_at: Utc::now(),
            signal: StopSignal::new(),
            errors: ErrorBox::new(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// The completion predicate returned true.
    Completed,
    /// A stop was requested before the next iteration began.
    Cancelled,
    /// The step or predicate failed; the fault is in the run's `ErrorBox`.
    Faulted,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RunReport {
    pub(crate) outcome: RunOutcome,
    /// Number of step invocations in this run.
    pub(crate) iterations: u64,
}

/// Run `work` until the predicate is satisfied, a stop is requested, or
/// either call fails.
///
/// The stop flag is consulted once per iteration, before the step; an
/// in-flight step is never interrupted.
pub(crate) fn run_loop<W: JobWork + ?Sized>(work: &mut W, run: &RunContext) -> RunReport {
    let mut iterations = 0u64;

    let outcome = loop {
        if run.signal.is_stop_requested() {
            break RunOutcome::Cancelled;
        }

        iterations += 1;
        let step = guarded(run.id, FaultOrigin::Step, || work.step())
            .and_then(|()| guarded(run.id, FaultOrigin::Predicate, || work.is_complete()));

        match step {
            Ok(true) => break RunOutcome::Completed,
            Ok(false) => continue,
            Err(fault) => {
                run.errors.record(fault);
                break RunOutcome::Faulted;
            }
        }
    };

    RunReport {
        outcome,
        iterations,
    }
}

/// Invoke user code, turning both returned errors and panics into a fault.
///
/// Returned errors are tagged with `origin`; panics with [`FaultOrigin::Panic`].
fn guarded<T>(
    run_id: RunId,
    origin: FaultOrigin,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> Result<T, JobFault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(JobFault::new(run_id, origin, err)),
        Err(payload) => Err(JobFault::from_panic(run_id, payload)),
    }
}
