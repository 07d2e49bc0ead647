//! The `AsyncJob` façade: lifecycle control of a background worker.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use commons_core::{JobId, RunId};

use crate::config::JobConfig;
use crate::error::{JobError, JobFault};
use crate::state::{Action, Event, JobState};
use crate::stats::JobStats;
use crate::worker::{self, RunContext, RunOutcome};

/// The unit of work a job repeats.
///
/// Both methods run only on the worker thread, which holds the work object
/// exclusively for the whole run. An error (or panic) from either one ends
/// the run and becomes the job's [`error`](AsyncJob::error).
pub trait JobWork: Send + 'static {
    /// One iteration of work. Keep it short if fast cancellation matters:
    /// a stop request is only observed between iterations.
    fn step(&mut self) -> anyhow::Result<()>;

    /// Checked after every step; `true` ends the run normally.
    fn is_complete(&mut self) -> anyhow::Result<bool>;
}

type StepFn = Box<dyn FnMut() -> anyhow::Result<()> + Send>;
type PredicateFn = Box<dyn FnMut() -> anyhow::Result<bool> + Send>;

/// [`JobWork`] assembled from closures by [`JobBuilder`].
pub struct FnWork {
    step: StepFn,
    until: PredicateFn,
}

impl JobWork for FnWork {
    fn step(&mut self) -> anyhow::Result<()> {
        (self.step)()
    }

    fn is_complete(&mut self) -> anyhow::Result<bool> {
        (self.until)()
    }
}

impl core::fmt::Debug for FnWork {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnWork").finish_non_exhaustive()
    }
}

/// Builds a closure-driven [`AsyncJob`].
#[derive(Default)]
pub struct JobBuilder {
    config: JobConfig,
    step: Option<StepFn>,
    until: Option<PredicateFn>,
}

impl JobBuilder {
    pub fn config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn step<F>(mut self, step: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.step = Some(Box::new(step));
        self
    }

    /// Completion predicate.
    pub fn until<F>(mut self, predicate: F) -> Self
    where
        F: FnMut() -> anyhow::Result<bool> + Send + 'static,
    {
        self.until = Some(Box::new(predicate));
        self
    }

    pub fn build(self) -> Result<AsyncJob<FnWork>, JobError> {
        let step = self.step.ok_or(JobError::MissingStep)?;
        let until = self.until.ok_or(JobError::MissingPredicate)?;
        Ok(AsyncJob::with_config(FnWork { step, until }, self.config))
    }
}

impl core::fmt::Debug for JobBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobBuilder")
            .field("config", &self.config)
            .field("has_step", &self.step.is_some())
            .field("has_until", &self.until.is_some())
            .finish()
    }
}

/// Lifecycle data guarded by the job's state lock.
#[derive(Debug)]
struct Lifecycle {
    state: JobState,
    /// Current (or most recent) run. A placeholder before the first start.
    run: Arc<RunContext>,
    stats: JobStats,
}

/// State shared with the worker thread.
struct Shared<W> {
    name: String,
    lifecycle: Mutex<Lifecycle>,
    work: Mutex<W>,
}

impl<W: JobWork> Shared<W> {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Body of the worker thread.
    fn run_worker(&self, run: &RunContext) {
        info!(job = %self.name, run_id = %run.id, "job started");

        let report = {
            let mut work = self.work.lock().unwrap_or_else(PoisonError::into_inner);
            worker::run_loop(&mut *work, run)
        };

        // Publish the terminal state and signal "stopped" in one critical
        // section: a caller that sees `is_running() == false` also sees
        // `wait_to_stop` succeed, and vice versa.
        let mut life = self.lifecycle();
        let event = match report.outcome {
            RunOutcome::Faulted => Event::Faulted,
            RunOutcome::Completed | RunOutcome::Cancelled => Event::Completed,
        };
        let (next, _) = life.state.transition(event);
        life.state = next;
        life.stats.record_finish(&report, Utc::now());
        run.signal.mark_stopped();
        drop(life);

        debug!(
            job = %self.name,
            run_id = %run.id,
            iterations = report.iterations,
            outcome = ?report.outcome,
            "run loop exited"
        );

        match report.outcome {
            RunOutcome::Completed => info!(job = %self.name, run_id = %run.id, "job completed"),
            RunOutcome::Cancelled => {
                info!(job = %self.name, run_id = %run.id, "job stopped on request")
            }
            RunOutcome::Faulted => {
                let fault = run.errors.get();
                warn!(
                    job = %self.name,
                    run_id = %run.id,
                    origin = ?fault.as_ref().map(JobFault::origin),
                    error = fault.as_ref().map(JobFault::message).unwrap_or_default(),
                    "job faulted"
                );
            }
        }
    }
}

/// A repeated, cancellable unit of work on a dedicated thread.
///
/// - [`start`](Self::start) spawns one worker thread per run; calling it while
///   running is a no-op.
/// - [`stop`](Self::stop) requests a cooperative stop and returns immediately.
/// - [`wait_to_stop`](Self::wait_to_stop) blocks for a bounded time.
/// - [`dispose`](Self::dispose) (also run on drop) stops the job, joins the
///   worker and makes the job unusable.
///
/// Faults raised by the work are never returned from these calls; they are
/// read through [`error`](Self::error).
pub struct AsyncJob<W: JobWork> {
    id: JobId,
    config: JobConfig,
    shared: Arc<Shared<W>>,
    /// Handle of the most recent worker thread. Held across joins, which
    /// serialises `start` and `dispose`.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncJob<FnWork> {
    /// Start building a job from closures.
    pub fn builder() -> JobBuilder {
        JobBuilder::default()
    }
}

impl<W: JobWork> AsyncJob<W> {
    pub fn new(work: W) -> Self {
        Self::with_config(work, JobConfig::default())
    }

    pub fn with_config(work: W, config: JobConfig) -> Self {
        let shared = Shared {
            name: config.name.clone(),
            lifecycle: Mutex::new(Lifecycle {
                state: JobState::NotStarted,
                run: Arc::new(RunContext::new()),
                stats: JobStats::default(),
            }),
            work: Mutex::new(work),
        };

        Self {
            id: JobId::new(),
            config,
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn worker_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a run on a new worker thread.
    ///
    /// No-op while running. After a finished run the previous fault is
    /// cleared and a fresh run begins. Fails only once disposed, or if the OS
    /// refuses to create a thread (the job is then left as it was).
    pub fn start(&self) -> Result<(), JobError> {
        let mut slot = self.worker_slot();
        let mut life = self.shared.lifecycle();

        let (next, action) = life.state.transition(Event::Start);
        match action {
            Action::Spawn => {}
            Action::Reject => return Err(JobError::Disposed),
            Action::Noop | Action::RequestStop => {
                debug!(job = %self.config.name, "start ignored; job already running");
                return Ok(());
            }
        }

        // The previous worker published its terminal state before releasing
        // the state lock, so it has nothing left to do but exit.
        if let Some(previous) = slot.take() {
            join_worker(&self.config.name, previous);
        }

        let run = Arc::new(RunContext::new());
        let previous_state = life.state;
        let previous_run = std::mem::replace(&mut life.run, run.clone());
        life.state = next;

        match self.spawn_worker(run.clone()) {
            Ok(handle) => {
                life.stats.record_start(run.started_at);
                *slot = Some(handle);
                Ok(())
            }
            Err(err) => {
                life.state = previous_state;
                life.run = previous_run;
                error!(job = %self.config.name, error = %err, "failed to spawn worker thread");
                Err(JobError::Spawn(err.to_string()))
            }
        }
    }

    fn spawn_worker(&self, run: Arc<RunContext>) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(self.config.name.clone());
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }

        let shared = Arc::clone(&self.shared);
        builder.spawn(move || shared.run_worker(&run))
    }

    /// Request a cooperative stop; does not wait.
    ///
    /// The worker finishes its current iteration and exits before the next
    /// one. No-op unless running.
    pub fn stop(&self) -> Result<(), JobError> {
        let life = self.shared.lifecycle();
        let (_, action) = life.state.transition(Event::Stop);
        match action {
            Action::RequestStop => {
                if life.run.signal.request_stop() {
                    debug!(job = %self.config.name, run_id = %life.run.id, "stop requested");
                }
                Ok(())
            }
            Action::Reject => Err(JobError::Disposed),
            Action::Noop | Action::Spawn => Ok(()),
        }
    }

    /// Wait up to `timeout` for the current run to stop.
    ///
    /// Returns true iff the run had stopped when the wait ended. A zero
    /// timeout polls without blocking. Never requests a stop itself. Before
    /// the first start there is nothing to stop, so this waits out the
    /// timeout and returns false. A disposed job reports true immediately.
    pub fn wait_to_stop(&self, timeout: Duration) -> bool {
        let run = {
            let life = self.shared.lifecycle();
            if life.state == JobState::Disposed {
                return true;
            }
            Arc::clone(&life.run)
        };
        run.signal.wait(timeout)
    }

    pub fn is_running(&self) -> bool {
        self.shared.lifecycle().state.is_running()
    }

    pub fn state(&self) -> JobState {
        self.shared.lifecycle().state
    }

    /// The fault that ended the last run; `None` unless the job is faulted.
    pub fn error(&self) -> Option<JobFault> {
        let life = self.shared.lifecycle();
        match life.state {
            JobState::Faulted => life.run.errors.get(),
            _ => None,
        }
    }

    /// Id of the current or most recent run; `None` before the first start.
    pub fn current_run(&self) -> Option<RunId> {
        let life = self.shared.lifecycle();
        (life.stats.runs_started > 0).then_some(life.run.id)
    }

    pub fn stats(&self) -> JobStats {
        self.shared.lifecycle().stats.clone()
    }

    /// Borrow the work object, e.g. to inspect results after a run.
    ///
    /// Blocks while a run is in progress, since the worker holds the work for
    /// the whole run.
    pub fn with_work<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        let mut work = self.shared.work.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut work)
    }

    /// Stop the job, wait for the worker thread to exit, and release it.
    ///
    /// Blocks until the in-flight iteration (if any) returns. Idempotent;
    /// concurrent callers all return after the worker has exited.
    pub fn dispose(&self) {
        let mut slot = self.worker_slot();

        {
            let life = self.shared.lifecycle();
            if life.state == JobState::Disposed {
                return;
            }
            if let (_, Action::RequestStop) = life.state.transition(Event::Stop) {
                life.run.signal.request_stop();
            }
        }

        if let Some(handle) = slot.take() {
            join_worker(&self.config.name, handle);
        }

        let mut life = self.shared.lifecycle();
        let (next, _) = life.state.transition(Event::Dispose);
        life.state = next;
        info!(job = %self.config.name, "job disposed");
    }
}

impl<W: JobWork> Drop for AsyncJob<W> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<W: JobWork> core::fmt::Debug for AsyncJob<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncJob")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn join_worker(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        // Step and predicate panics are captured; this is a bug in the loop.
        error!(job = %name, "worker thread panicked outside the step guard");
    }
}
