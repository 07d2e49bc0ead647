//! Stop handshake between the controlling thread and the worker.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Flags {
    stop_requested: bool,
    stopped: bool,
}

/// Two one-shot flags shared by the controller and the worker of one run.
///
/// - "stop requested": set by the controller, polled by the worker between
///   iterations.
/// - "stopped": set by the worker as its last act, waited on by the controller.
///
/// Both flags live behind one mutex, so anything written before
/// [`mark_stopped`](Self::mark_stopped) is visible to a thread that observes
/// [`is_stopped`](Self::is_stopped) or a successful [`wait`](Self::wait).
#[derive(Debug, Default)]
pub struct StopSignal {
    flags: Mutex<Flags>,
    stopped_cv: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the worker to stop. Returns true on the first request only.
    pub fn request_stop(&self) -> bool {
        let mut flags = self.lock();
        let first = !flags.stop_requested;
        flags.stop_requested = true;
        first
    }

    pub fn is_stop_requested(&self) -> bool {
        self.lock().stop_requested
    }

    /// Mark the run as stopped and wake every waiter.
    pub fn mark_stopped(&self) {
        let mut flags = self.lock();
        flags.stopped = true;
        drop(flags);
        self.stopped_cv.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Block until stopped or `timeout` elapses; returns whether it stopped.
    ///
    /// A zero timeout is a non-blocking check. Spurious wakeups are absorbed.
    pub fn wait(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return self.is_stopped();
        }

        let flags = self.lock();
        let (flags, _) = self
            .stopped_cv
            .wait_timeout_while(flags, timeout, |f| !f.stopped)
            .unwrap_or_else(PoisonError::into_inner);
        flags.stopped
    }
}
