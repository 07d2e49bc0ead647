//! Background jobs: a repeated, cancellable unit of work on a dedicated thread.
//!
//! ## Design
//!
//! - One OS thread per run, owned by the job and never exposed
//! - Cooperative cancellation: the stop flag is checked once per iteration
//! - Faults (errors and panics) from user code are captured on the worker and
//!   surfaced only through [`AsyncJob::error`]
//! - Lifecycle is an explicit state machine; redundant calls are no-ops
//!
//! ## Components
//!
//! - `AsyncJob`: lifecycle façade (start, stop, wait, dispose)
//! - `JobWork`: the step operation + completion predicate a job runs
//! - `StopSignal`: "stop requested" / "stopped" handshake between threads
//! - `ErrorBox`: write-once holder for the fault that ended a run
//!
//! ```no_run
//! use std::time::Duration;
//! use commons_jobs::AsyncJob;
//!
//! let mut remaining = 3u32;
//! let job = AsyncJob::builder()
//!     .name("countdown")
//!     .step(|| Ok(()))
//!     .until(move || {
//!         remaining -= 1;
//!         Ok(remaining == 0)
//!     })
//!     .build()?;
//!
//! job.start()?;
//! assert!(job.wait_to_stop(Duration::from_secs(1)));
//! assert!(job.error().is_none());
//! # Ok::<(), commons_jobs::JobError>(())
//! ```

pub mod config;
pub mod error;
pub mod error_box;
pub mod job;
pub mod signal;
pub mod state;
pub mod stats;
mod worker;

pub use config::JobConfig;
pub use error::{FaultOrigin, JobError, JobFault, WorkerPanic};
pub use error_box::ErrorBox;
pub use job::{AsyncJob, FnWork, JobBuilder, JobWork};
pub use signal::StopSignal;
pub use state::JobState;
pub use stats::JobStats;

pub use commons_core::{JobId, RunId};
