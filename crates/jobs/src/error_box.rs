//! Write-once holder for the fault that ended a run.

use std::sync::OnceLock;

use crate::error::JobFault;

/// Holds at most one [`JobFault`] per run.
///
/// Only the worker writes, once, after catching a failure. Any thread may read
/// any number of times; a successful read always observes the complete value.
/// A new run gets a new box, which is how the fault is cleared on restart.
#[derive(Debug, Default)]
pub struct ErrorBox {
    slot: OnceLock<JobFault>,
}

impl ErrorBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fault`. Returns false (and keeps the first fault) if one is
    /// already recorded.
    pub fn record(&self, fault: JobFault) -> bool {
        self.slot.set(fault).is_ok()
    }

    pub fn get(&self) -> Option<JobFault> {
        self.slot.get().cloned()
    }

    pub fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }
}
