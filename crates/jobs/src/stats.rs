//! Job runtime statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::worker::{RunOutcome, RunReport};

/// Counters across every run of one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_cancelled: u64,
    pub runs_faulted: u64,
    /// Step invocations across all runs.
    pub iterations: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_stopped_at: Option<DateTime<Utc>>,
}

impl JobStats {
    pub(crate) fn record_start(&mut self, at: DateTime<Utc>) {
        self.runs_started += 1;
        self.last_started_at = Some(at);
    }

    pub(crate) fn record_finish(&mut self, report: &RunReport, at: DateTime<Utc>) {
        match report.outcome {
            RunOutcome::Completed => self.runs_completed += 1,
            RunOutcome::Cancelled => self.runs_cancelled += 1,
            RunOutcome::Faulted => self.runs_faulted += 1,
        }
        self.iterations += report.iterations;
        self.last_stopped_at = Some(at);
    }

    /// Runs started but not yet finished (0 or 1).
    pub fn runs_in_flight(&self) -> u64 {
        self.runs_started
            - (self.runs_completed + self.runs_cancelled + self.runs_faulted)
    }
}
