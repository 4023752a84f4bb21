//! The per-worker state machine of spec.md §4.5: `UNINIT → VALIDATED →
//! RESOURCES_OPEN → RUNNING → DRAINING → FINALIZED`. Any validation or
//! resource-open failure is fatal; `DRAINING` is the post-user-code phase
//! that flushes buffers and sends end-of-stream signals.

use slog::{info, Logger};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WorkerState {
    Uninit,
    Validated,
    ResourcesOpen,
    Running,
    Draining,
    Finalized,
}

impl WorkerState {
    fn next(self) -> Option<WorkerState> {
        match self {
            WorkerState::Uninit => Some(WorkerState::Validated),
            WorkerState::Validated => Some(WorkerState::ResourcesOpen),
            WorkerState::ResourcesOpen => Some(WorkerState::Running),
            WorkerState::Running => Some(WorkerState::Draining),
            WorkerState::Draining => Some(WorkerState::Finalized),
            WorkerState::Finalized => None,
        }
    }
}

/// Tracks a worker's progress through the state machine and logs each
/// transition at `info!`, tagged with the role/index the caller's logger
/// already carries (see `mrlite_base::logging::init`).
pub struct StateMachine {
    state: WorkerState,
    log: Logger,
}

impl StateMachine {
    pub fn new(log: Logger) -> StateMachine {
        let machine = StateMachine {
            state: WorkerState::Uninit,
            log,
        };
        info!(machine.log, "worker state"; "state" => "UNINIT");
        machine
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Advances to the next state in sequence. Panics on a skipped or
    /// backward transition — a driver bug, not a runtime condition.
    pub fn advance(&mut self, to: WorkerState) {
        let expected = self.state.next().expect("advance called from a terminal state");
        assert_eq!(to, expected, "invalid state transition from {:?} to {:?}", self.state, to);
        self.state = to;
        info!(self.log, "worker state"; "state" => format!("{:?}", self.state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_in_sequence() {
        let mut sm = StateMachine::new(mrlite_base::logging::discard());
        sm.advance(WorkerState::Validated);
        sm.advance(WorkerState::ResourcesOpen);
        sm.advance(WorkerState::Running);
        sm.advance(WorkerState::Draining);
        sm.advance(WorkerState::Finalized);
        assert_eq!(sm.state(), WorkerState::Finalized);
    }

    #[test]
    #[should_panic(expected = "invalid state transition")]
    fn skipping_a_state_panics() {
        let mut sm = StateMachine::new(mrlite_base::logging::discard());
        sm.advance(WorkerState::ResourcesOpen);
    }
}
