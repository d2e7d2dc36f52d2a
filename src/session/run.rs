//! Run flag for the autonomous step loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// The run flag of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// How an autonomous run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The machine reported its state as finished.
    Finished { steps: usize },
    /// `stop()` was observed at a step boundary.
    Stopped { steps: usize },
    /// A stopped run was still finishing its last step and has been
    /// re-armed; it continues on its own task.
    Resumed,
    /// The session was already running; nothing was done.
    AlreadyRunning,
}

impl RunOutcome {
    /// Steps pushed by this run.
    pub fn steps(&self) -> usize {
        match self {
            RunOutcome::Finished { steps } | RunOutcome::Stopped { steps } => *steps,
            RunOutcome::Resumed | RunOutcome::AlreadyRunning => 0,
        }
    }
}

/// Result of asking for a run.
pub(crate) enum Begin {
    /// No loop was alive; the caller owns a new one.
    Started(RunGuard),
    /// A stopped loop was still finishing its last step and will continue.
    Rearmed,
    /// The run flag was already set.
    AlreadyRunning,
}

/// Run flag and loop slot shared by a session's handles.
///
/// The flag is the published [`RunState`]: `start` sets it, `stop` clears it
/// immediately. At most one loop is alive at a time. A loop that sees the
/// flag cleared at a step boundary releases the slot; if the flag is set
/// again before that, the same loop carries on.
pub(crate) struct RunControl {
    state: watch::Sender<RunState>,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    next_id: u64,
    live: Option<u64>,
}

fn clear(state: &mut RunState) -> bool {
    let was_running = *state == RunState::Running;
    *state = RunState::Idle;
    was_running
}

impl RunControl {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            state,
            slot: Mutex::new(Slot::default()),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the run flag, taking the loop slot if no loop is alive.
    pub(crate) fn begin(self: &Arc<Self>) -> Begin {
        let mut slot = self.slot();
        if self.state() == RunState::Running {
            return Begin::AlreadyRunning;
        }
        self.state.send_replace(RunState::Running);
        if slot.live.is_some() {
            return Begin::Rearmed;
        }
        let id = slot.next_id;
        slot.next_id += 1;
        slot.live = Some(id);
        Begin::Started(RunGuard {
            control: Arc::clone(self),
            id,
        })
    }

    /// Clear the run flag.
    ///
    /// Returns whether the flag was set.
    pub(crate) fn stop(&self) -> bool {
        let _slot = self.slot();
        self.state.send_if_modified(clear)
    }

    pub(crate) fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }
}

/// Ownership of the loop slot for the lifetime of one loop.
///
/// Dropping the guard releases the slot and clears the flag, so the flag is
/// cleared even if the loop's future is dropped mid-step.
pub(crate) struct RunGuard {
    control: Arc<RunControl>,
    id: u64,
}

impl RunGuard {
    /// Check the flag at a step boundary.
    ///
    /// When the flag is cleared the slot is released in the same critical
    /// section, so a later `begin` starts a fresh loop instead of re-arming
    /// this one.
    pub(crate) fn exit_if_stopped(&self) -> bool {
        let mut slot = self.control.slot();
        if slot.live != Some(self.id) {
            return true;
        }
        if self.control.state() == RunState::Idle {
            slot.live = None;
            true
        } else {
            false
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut slot = self.control.slot();
        if slot.live == Some(self.id) {
            slot.live = None;
            self.control.state.send_if_modified(clear);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(control: &Arc<RunControl>) -> RunGuard {
        match control.begin() {
            Begin::Started(guard) => guard,
            Begin::Rearmed => panic!("expected a new loop, got a re-arm"),
            Begin::AlreadyRunning => panic!("expected a new loop, already running"),
        }
    }

    #[test]
    fn slot_is_exclusive_until_guard_drops() {
        let control = Arc::new(RunControl::new());
        assert_eq!(control.state(), RunState::Idle);

        let guard = started(&control);
        assert_eq!(control.state(), RunState::Running);
        assert!(matches!(control.begin(), Begin::AlreadyRunning));

        drop(guard);
        assert_eq!(control.state(), RunState::Idle);
        started(&control);
    }

    #[test]
    fn stop_without_run_is_a_noop() {
        let control = Arc::new(RunControl::new());
        assert!(!control.stop());
        assert!(!control.stop());
        assert_eq!(control.state(), RunState::Idle);
    }

    #[test]
    fn stop_clears_the_flag_immediately() {
        let control = Arc::new(RunControl::new());
        let guard = started(&control);

        assert!(control.stop());
        assert_eq!(control.state(), RunState::Idle);
        assert!(!control.stop());

        assert!(guard.exit_if_stopped());
        drop(guard);
        assert_eq!(control.state(), RunState::Idle);
    }

    #[test]
    fn begin_while_draining_rearms_the_live_loop() {
        let control = Arc::new(RunControl::new());
        let guard = started(&control);

        control.stop();
        assert!(matches!(control.begin(), Begin::Rearmed));
        assert_eq!(control.state(), RunState::Running);
        assert!(!guard.exit_if_stopped());

        drop(guard);
        assert_eq!(control.state(), RunState::Idle);
    }

    #[test]
    fn begin_after_loop_exit_starts_fresh() {
        let control = Arc::new(RunControl::new());
        let guard = started(&control);

        control.stop();
        assert!(guard.exit_if_stopped());
        let second = started(&control);

        // The old guard no longer owns the slot.
        drop(guard);
        assert_eq!(control.state(), RunState::Running);
        assert!(!second.exit_if_stopped());
    }

    #[test]
    fn subscribers_observe_transitions() {
        let control = Arc::new(RunControl::new());
        let mut rx = control.subscribe();
        assert_eq!(*rx.borrow_and_update(), RunState::Idle);

        let guard = started(&control);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), RunState::Running);

        control.stop();
        assert_eq!(*rx.borrow_and_update(), RunState::Idle);

        drop(guard);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn outcome_step_counts() {
        assert_eq!(RunOutcome::Finished { steps: 3 }.steps(), 3);
        assert_eq!(RunOutcome::Stopped { steps: 1 }.steps(), 1);
        assert_eq!(RunOutcome::Resumed.steps(), 0);
        assert_eq!(RunOutcome::AlreadyRunning.steps(), 0);
    }
}
