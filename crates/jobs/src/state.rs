//! Job lifecycle state machine.
//!
//! Every lifecycle event is defined for every state. Most combinations are
//! harmless no-ops, which is what makes redundant `start`/`stop`/`dispose`
//! calls safe.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an [`AsyncJob`](crate::AsyncJob).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, never started.
    #[default]
    NotStarted,
    /// A worker thread is executing the loop.
    Running,
    /// The last run ended normally (predicate satisfied or stop requested).
    Stopped,
    /// The last run ended because the step or predicate failed.
    Faulted,
    /// Released; no further runs are possible.
    Disposed,
}

impl JobState {
    pub fn is_running(self) -> bool {
        matches!(self, JobState::Running)
    }

    /// True for states reached by a finished run (`Stopped`, `Faulted`).
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Stopped | JobState::Faulted)
    }

    /// Total transition function: the next state and the side effect the
    /// owner must carry out.
    pub(crate) fn transition(self, event: Event) -> (JobState, Action) {
        use JobState::*;

        match (self, event) {
            (Disposed, Event::Start | Event::Stop) => (Disposed, Action::Reject),
            (Disposed, _) => (Disposed, Action::Noop),

            (NotStarted | Stopped | Faulted, Event::Start) => (Running, Action::Spawn),
            (Running, Event::Start) => (Running, Action::Noop),

            (Running, Event::Stop) => (Running, Action::RequestStop),
            (state, Event::Stop) => (state, Action::Noop),

            (Running, Event::Completed) => (Stopped, Action::Noop),
            (Running, Event::Faulted) => (Faulted, Action::Noop),
            (state, Event::Completed | Event::Faulted) => (state, Action::Noop),

            (_, Event::Dispose) => (Disposed, Action::Noop),
        }
    }
}

impl core::fmt::Display for JobState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            JobState::NotStarted => "not_started",
            JobState::Running => "running",
            JobState::Stopped => "stopped",
            JobState::Faulted => "faulted",
            JobState::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

/// Lifecycle events, raised by the controller (`Start`, `Stop`, `Dispose`)
/// or by the worker when a run ends (`Completed`, `Faulted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Start,
    Stop,
    Completed,
    Faulted,
    Dispose,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Noop,
    Spawn,
    RequestStop,
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [JobState; 5] = [
        JobState::NotStarted,
        JobState::Running,
        JobState::Stopped,
        JobState::Faulted,
        JobState::Disposed,
    ];

    #[test]
    fn start_spawns_only_from_idle_or_finished_states() {
        for state in ALL {
            let (next, action) = state.transition(Event::Start);
            match state {
                JobState::NotStarted | JobState::Stopped | JobState::Faulted => {
                    assert_eq!((next, action), (JobState::Running, Action::Spawn));
                }
                JobState::Running => assert_eq!((next, action), (JobState::Running, Action::Noop)),
                JobState::Disposed => {
                    assert_eq!((next, action), (JobState::Disposed, Action::Reject));
                }
            }
        }
    }

    #[test]
    fn stop_never_changes_state() {
        for state in ALL {
            let (next, _) = state.transition(Event::Stop);
            assert_eq!(next, state);
        }
        assert_eq!(
            JobState::Running.transition(Event::Stop).1,
            Action::RequestStop
        );
        assert_eq!(JobState::Stopped.transition(Event::Stop).1, Action::Noop);
    }

    #[test]
    fn run_end_only_moves_a_running_job() {
        assert_eq!(
            JobState::Running.transition(Event::Completed).0,
            JobState::Stopped
        );
        assert_eq!(
            JobState::Running.transition(Event::Faulted).0,
            JobState::Faulted
        );
        for state in ALL.into_iter().filter(|s| !s.is_running()) {
            assert_eq!(state.transition(Event::Completed).0, state);
            assert_eq!(state.transition(Event::Faulted).0, state);
        }
    }

    #[test]
    fn dispose_is_absorbing() {
        for state in ALL {
            assert_eq!(state.transition(Event::Dispose).0, JobState::Disposed);
        }
        for event in [
            Event::Start,
            Event::Stop,
            Event::Completed,
            Event::Faulted,
            Event::Dispose,
        ] {
            assert_eq!(JobState::Disposed.transition(event).0, JobState::Disposed);
        }
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&JobState::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
        assert_eq!(JobState::Faulted.to_string(), "faulted");
    }
}
