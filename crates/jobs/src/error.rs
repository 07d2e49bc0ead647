//! Job error model.
//!
//! Two kinds of failure exist and they never mix:
//!
//! - [`JobError`]: misuse of the job API, returned synchronously to the caller.
//! - [`JobFault`]: a failure raised by user code on the worker thread, captured
//!   there and only ever read back through [`AsyncJob::error`](crate::AsyncJob::error).

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use commons_core::RunId;

/// Usage error of the job API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job has no step operation")]
    MissingStep,

    #[error("job has no completion predicate")]
    MissingPredicate,

    /// The job was disposed; only status queries and `dispose` remain valid.
    #[error("job has been disposed")]
    Disposed,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Which part of the loop raised a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultOrigin {
    /// The step returned an error.
    Step,
    /// The completion predicate returned an error.
    Predicate,
    /// The step or the predicate panicked.
    Panic,
}

impl core::fmt::Display for FaultOrigin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FaultOrigin::Step => f.write_str("step"),
            FaultOrigin::Predicate => f.write_str("predicate"),
            FaultOrigin::Panic => f.write_str("panic"),
        }
    }
}

/// A panic raised by a step or predicate, captured as an error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct WorkerPanic(pub String);

impl WorkerPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_string(),
                Err(_) => "worker panicked with a non-string payload".to_string(),
            },
        };
        Self(message)
    }
}

/// The failure that ended a run.
///
/// Cheap to clone: every clone shares the original error object, so readers
/// on any thread observe the exact failure that stopped the worker.
#[derive(Debug, Clone)]
pub struct JobFault {
    run_id: RunId,
    origin: FaultOrigin,
    message: String,
    error: Arc<anyhow::Error>,
}

impl JobFault {
    pub(crate) fn new(run_id: RunId, origin: FaultOrigin, error: anyhow::Error) -> Self {
        Self {
            run_id,
            origin,
            message: error.to_string(),
            error: Arc::new(error),
        }
    }

    pub(crate) fn from_panic(run_id: RunId, payload: Box<dyn Any + Send>) -> Self {
        Self::new(
            run_id,
            FaultOrigin::Panic,
            WorkerPanic::from_payload(payload).into(),
        )
    }

    /// Message of the original error (its `Display`, without the cause chain).
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin(&self) -> FaultOrigin {
        self.origin
    }

    /// Run this fault ended.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The original error raised by user code.
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Attempt to recover the concrete error type raised by user code.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: core::fmt::Display + core::fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    /// True when the fault is a caught panic rather than a returned error.
    pub fn is_panic(&self) -> bool {
        self.error.is::<WorkerPanic>()
    }

    /// True when both values refer to the same captured error object.
    pub fn same_as(&self, other: &JobFault) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }
}

impl core::fmt::Display for JobFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for JobFault {
    /// The cause of the original error; the original error itself is what
    /// this fault displays.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + Send + Sync + 'static) = (*self.error).as_ref();
        inner.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk full on {volume}")]
    struct DiskFull {
        volume: String,
    }

    #[test]
    fn fault_keeps_message_and_concrete_type() {
        let fault = JobFault::new(
            RunId::new(),
            FaultOrigin::Step,
            DiskFull {
                volume: "/var".to_string(),
            }
            .into(),
        );

        assert_eq!(fault.message(), "disk full on /var");
        assert_eq!(fault.to_string(), "disk full on /var");
        assert_eq!(fault.downcast_ref::<DiskFull>().unwrap().volume, "/var");
        assert!(!fault.is_panic());
    }

    #[test]
    fn message_excludes_context_chain() {
        let err = anyhow::anyhow!("root cause").context("while draining");
        let fault = JobFault::new(RunId::new(), FaultOrigin::Predicate, err);
        assert_eq!(fault.message(), "while draining");
        assert_eq!(fault.origin(), FaultOrigin::Predicate);
    }

    #[test]
    fn clones_share_identity() {
        let fault = JobFault::new(RunId::new(), FaultOrigin::Step, anyhow::anyhow!("boom"));
        let copy = fault.clone();
        assert!(fault.same_as(&copy));

        let other = JobFault::new(fault.run_id(), FaultOrigin::Step, anyhow::anyhow!("boom"));
        assert!(!fault.same_as(&other));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let from_str = JobFault::from_panic(RunId::new(), Box::new("static"));
        assert_eq!(from_str.message(), "static");
        assert!(from_str.is_panic());
        assert_eq!(from_str.origin(), FaultOrigin::Panic);

        let from_string = JobFault::from_panic(RunId::new(), Box::new(String::from("owned")));
        assert_eq!(from_string.message(), "owned");

        let opaque = JobFault::from_panic(RunId::new(), Box::new(42u8));
        assert_eq!(opaque.message(), "worker panicked with a non-string payload");
    }

    #[test]
    fn source_starts_at_the_underlying_cause() {
        use std::error::Error as _;

        let err = anyhow::anyhow!("connection reset").context("while draining");
        let fault = JobFault::new(RunId::new(), FaultOrigin::Step, err);

        assert_eq!(fault.to_string(), "while draining");
        assert_eq!(fault.source().unwrap().to_string(), "connection reset");
    }

    #[test]
    fn plain_error_has_no_source() {
        use std::error::Error as _;

        let fault = JobFault::new(RunId::new(), FaultOrigin::Step, anyhow::anyhow!("inner"));
        assert!(fault.source().is_none());
    }
}
