//! Linear history of applied transitions and resulting states.
//!
//! History is immutable: `record` returns a new history with the entry
//! appended. Entries are shared behind `Arc`, so a snapshot handed to a
//! renderer or a prompt builder stays valid no matter what is recorded
//! afterwards.

use super::machine::Machine;
use super::transition::Transition;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The transitions applied in one step and the state they produced.
#[derive(Debug)]
pub struct HistoryEntry<S, A> {
    transitions: Vec<Transition<A>>,
    state: S,
    recorded_at: DateTime<Utc>,
}

impl<S, A> HistoryEntry<S, A> {
    /// Transitions applied to reach this entry; empty for the initial entry.
    pub fn transitions(&self) -> &[Transition<A>] {
        &self.transitions
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Append-only sequence of history entries.
///
/// Entry 0 is always `([], initial_state)`; for every later index `i`,
/// `entries[i].state` is the reducer applied to `entries[i - 1].state` and
/// `entries[i].transitions`.
///
/// # Example
///
/// ```rust
/// use statecall::core::History;
///
/// let history: History<u32, ()> = History::new(0);
/// let history = history.record(Vec::new(), 1);
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.states().collect::<Vec<_>>(), [&0, &1]);
/// ```
pub struct History<S, A> {
    entries: Vec<Arc<HistoryEntry<S, A>>>,
}

impl<S, A> History<S, A> {
    /// Start a history at `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            entries: vec![Arc::new(HistoryEntry {
                transitions: Vec::new(),
                state: initial,
                recorded_at: Utc::now(),
            })],
        }
    }

    /// Record an entry, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transitions: Vec<Transition<A>>, state: S) -> Self {
        let mut entries = self.entries.clone();
        entries.push(Arc::new(HistoryEntry {
            transitions,
            state,
            recorded_at: Utc::now(),
        }));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: a history holds at least its initial entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<HistoryEntry<S, A>>> {
        self.entries.get(index)
    }

    pub fn initial(&self) -> &Arc<HistoryEntry<S, A>> {
        &self.entries[0]
    }

    pub fn latest(&self) -> &Arc<HistoryEntry<S, A>> {
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[Arc<HistoryEntry<S, A>>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<HistoryEntry<S, A>>> {
        self.entries.iter()
    }

    /// States in order, starting with the initial state.
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.entries.iter().map(|e| &e.state)
    }

    /// Time between the initial entry and the latest one.
    pub fn duration(&self) -> Duration {
        self.latest()
            .recorded_at
            .signed_duration_since(self.initial().recorded_at)
            .to_std()
            .unwrap_or_default()
    }
}

impl<S: PartialEq, A> History<S, A> {
    /// Re-run the reducer over every recorded step.
    ///
    /// Returns the index of the first entry whose state differs from
    /// `reduce(previous state, entry transitions)`, or `None` if the whole
    /// history is consistent with `machine`.
    pub fn replay<M>(&self, machine: &M) -> Option<usize>
    where
        M: Machine<State = S, Action = A>,
    {
        self.entries
            .windows(2)
            .position(|pair| machine.reduce(&pair[0].state, &pair[1].transitions) != pair[1].state)
            .map(|i| i + 1)
    }
}

impl<S, A> Clone for History<S, A> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<S: fmt::Debug, A: fmt::Debug> fmt::Debug for History<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Menu, Prompt};

    struct Doubler;

    impl Machine for Doubler {
        type State = u64;
        type Action = ();
        type View = String;

        fn name(&self) -> &str {
            "doubler"
        }

        fn initial_state(&self) -> u64 {
            1
        }

        fn is_finished(&self, state: &u64) -> bool {
            *state >= 8
        }

        fn menu(&self, _state: &u64) -> Menu<()> {
            Menu::new()
        }

        fn build_prompt(&self, _history: &History<u64, ()>, _state: &u64) -> Prompt {
            Prompt::new("double")
        }

        fn reduce(&self, state: &u64, transitions: &[Transition<()>]) -> u64 {
            transitions.iter().fold(*state, |s, _| s * 2)
        }

        fn render(&self, state: &u64, _transitions: &[Transition<()>]) -> String {
            state.to_string()
        }
    }

    fn double() -> Transition<()> {
        Transition::declared("double", ())
    }

    #[test]
    fn new_history_holds_initial_entry() {
        let history: History<u64, ()> = History::new(1);

        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
        assert!(history.initial().transitions().is_empty());
        assert_eq!(history.latest().state(), &1);
        assert_eq!(history.duration(), Duration::ZERO);
    }

    #[test]
    fn record_is_immutable() {
        let history: History<u64, ()> = History::new(1);
        let recorded = history.record(vec![double()], 2);

        assert_eq!(history.len(), 1);
        assert_eq!(recorded.len(), 2);
        assert!(Arc::ptr_eq(history.initial(), recorded.initial()));
    }

    #[test]
    fn states_follow_record_order() {
        let history = History::new(1)
            .record(vec![double()], 2)
            .record(vec![double(), double()], 8);

        assert_eq!(history.states().copied().collect::<Vec<_>>(), vec![1, 2, 8]);
        assert_eq!(history.get(2).unwrap().transitions().len(), 2);
        assert!(history.get(3).is_none());
    }

    #[test]
    fn replay_accepts_consistent_history() {
        let history = History::new(1)
            .record(vec![double()], 2)
            .record(vec![], 2)
            .record(vec![double(), double()], 8);

        assert_eq!(history.replay(&Doubler), None);
    }

    #[test]
    fn replay_finds_first_divergence() {
        let history = History::new(1)
            .record(vec![double()], 2)
            .record(vec![double()], 5)
            .record(vec![double()], 10);

        assert_eq!(history.replay(&Doubler), Some(2));
    }

    #[test]
    fn snapshots_survive_later_records() {
        let history = History::new(1).record(vec![double()], 2);
        let held = Arc::clone(history.latest());

        let _longer = history.record(vec![double()], 4);

        assert_eq!(held.state(), &2);
        assert_eq!(Doubler.render(held.state(), held.transitions()), "2");
    }
}
