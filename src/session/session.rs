//! Session controller: history, navigation and the autonomous run loop.

use super::run::{Begin, RunControl, RunGuard, RunOutcome, RunState};
use crate::core::{History, HistoryEntry, Machine, Transition};
use crate::generator::{GenerationError, TransitionGenerator};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

struct Timeline<S, A> {
    history: History<S, A>,
    viewing: usize,
}

struct Inner<M: Machine> {
    id: Uuid,
    machine: Arc<M>,
    generator: TransitionGenerator,
    timeline: Mutex<Timeline<M::State, M::Action>>,
    run: Arc<RunControl>,
}

/// One machine instance driven by a generator, with linear time-travel
/// history.
///
/// `Session` is a cheap handle; clones share the same history, viewing
/// index and run flag. History is append-only: entries are never removed
/// and entry 0 keeps its identity for the life of the session.
///
/// Manual [`update`](Session::update) calls and autonomous runs are expected
/// to be serialized by the caller. Only one autonomous run can hold the
/// session at a time.
pub struct Session<M: Machine> {
    inner: Arc<Inner<M>>,
}

impl<M: Machine> Clone for Session<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Machine> fmt::Debug for Session<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timeline = self.timeline();
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("machine", &self.inner.machine.name())
            .field("len", &timeline.history.len())
            .field("viewing", &timeline.viewing)
            .field("run_state", &self.inner.run.state())
            .finish()
    }
}

impl<M: Machine> Session<M> {
    /// Create a session whose history holds only the machine's initial state.
    pub fn new(machine: M, generator: TransitionGenerator) -> Self {
        Self::with_shared(Arc::new(machine), generator)
    }

    pub fn with_shared(machine: Arc<M>, generator: TransitionGenerator) -> Self {
        let history = History::new(machine.initial_state());
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, machine = %machine.name(), "Session created");

        Self {
            inner: Arc::new(Inner {
                id,
                machine,
                generator,
                timeline: Mutex::new(Timeline {
                    history,
                    viewing: 0,
                }),
                run: Arc::new(RunControl::new()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn machine(&self) -> &M {
        &self.inner.machine
    }

    fn timeline(&self) -> MutexGuard<'_, Timeline<M::State, M::Action>> {
        self.inner
            .timeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Append an entry and view it.
    pub fn push(
        &self,
        transitions: Vec<Transition<M::Action>>,
        state: M::State,
    ) -> Arc<HistoryEntry<M::State, M::Action>> {
        let mut timeline = self.timeline();
        timeline.history = timeline.history.record(transitions, state);
        timeline.viewing = timeline.history.len() - 1;

        tracing::info!(
            session = %self.inner.id,
            index = timeline.viewing,
            transitions = timeline.history.latest().transitions().len(),
            "Step pushed"
        );

        Arc::clone(timeline.history.latest())
    }

    /// Snapshot of the full history.
    pub fn history(&self) -> History<M::State, M::Action> {
        self.timeline().history.clone()
    }

    pub fn len(&self) -> usize {
        self.timeline().history.len()
    }

    /// Always `false`: the initial entry is never removed.
    pub fn is_empty(&self) -> bool {
        self.timeline().history.is_empty()
    }

    pub fn latest(&self) -> Arc<HistoryEntry<M::State, M::Action>> {
        Arc::clone(self.timeline().history.latest())
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn viewing_index(&self) -> usize {
        self.timeline().viewing
    }

    /// The entry at the viewing index.
    pub fn viewed(&self) -> Arc<HistoryEntry<M::State, M::Action>> {
        let timeline = self.timeline();
        match timeline.history.get(timeline.viewing) {
            Some(entry) => Arc::clone(entry),
            None => Arc::clone(timeline.history.latest()),
        }
    }

    /// Render the viewed state with the transitions that produced it.
    pub fn render(&self) -> M::View {
        let entry = self.viewed();
        self.inner.machine.render(entry.state(), entry.transitions())
    }

    /// View entry `index`. Out-of-range indices are ignored.
    pub fn view(&self, index: usize) {
        let mut timeline = self.timeline();
        if index < timeline.history.len() {
            timeline.viewing = index;
        }
    }

    pub fn step_forward(&self) {
        let next = self.viewing_index() + 1;
        self.view(next);
    }

    pub fn step_backward(&self) {
        if let Some(previous) = self.viewing_index().checked_sub(1) {
            self.view(previous);
        }
    }

    pub fn can_step_forward(&self) -> bool {
        let timeline = self.timeline();
        timeline.viewing + 1 < timeline.history.len()
    }

    pub fn can_step_backward(&self) -> bool {
        self.viewing_index() > 0
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Run one step from the viewed state and push the result.
    ///
    /// When an earlier entry is being viewed, the new entry is appended at
    /// the end as a branch from that point; later entries stay in history.
    pub async fn update(
        &self,
    ) -> Result<Arc<HistoryEntry<M::State, M::Action>>, GenerationError> {
        let (history, from) = {
            let timeline = self.timeline();
            let from = timeline
                .history
                .get(timeline.viewing)
                .unwrap_or_else(|| timeline.history.latest())
                .state()
                .clone();
            (timeline.history.clone(), from)
        };

        let span = tracing::info_span!(
            "update",
            session = %self.inner.id,
            machine = %self.inner.machine.name()
        );

        match self
            .inner
            .generator
            .step(self.inner.machine.as_ref(), &history, &from)
            .instrument(span)
            .await
        {
            Ok(outcome) => Ok(self.push(outcome.transitions, outcome.state)),
            Err(e) => {
                tracing::error!(session = %self.inner.id, error = %e, "Update failed");
                Err(e)
            }
        }
    }

    /// Step from the latest state until the machine is finished, `stop()` is
    /// called, or a step fails.
    ///
    /// The run flag is checked only between steps; a generation call already
    /// in flight completes and its result is pushed before the run stops.
    /// Calling `run` after `stop()` but before that step lands re-arms the
    /// live loop and returns [`RunOutcome::Resumed`]. A failed step ends the
    /// run and clears the flag.
    pub async fn run(&self) -> Result<RunOutcome, GenerationError> {
        match self.inner.run.begin() {
            Begin::Started(guard) => self.drive(guard).await,
            Begin::Rearmed => {
                tracing::debug!(session = %self.inner.id, "Run re-armed");
                Ok(RunOutcome::Resumed)
            }
            Begin::AlreadyRunning => {
                tracing::debug!(session = %self.inner.id, "Run already in progress");
                Ok(RunOutcome::AlreadyRunning)
            }
        }
    }

    /// Spawn [`run`](Session::run) on the tokio runtime.
    ///
    /// Returns `None` without spawning when the session is already running,
    /// or when a stopped loop was still finishing its last step and has been
    /// re-armed; that loop's existing handle reports the outcome.
    ///
    /// # Panics
    ///
    /// Panics if called from outside of a Tokio runtime.
    pub fn start(&self) -> Option<JoinHandle<Result<RunOutcome, GenerationError>>> {
        match self.inner.run.begin() {
            Begin::Started(guard) => {
                let session = self.clone();
                Some(tokio::spawn(async move { session.drive(guard).await }))
            }
            Begin::Rearmed => {
                tracing::debug!(session = %self.inner.id, "Run re-armed");
                None
            }
            Begin::AlreadyRunning => None,
        }
    }

    /// Clear the run flag. Safe to call at any time; idempotent.
    pub fn stop(&self) {
        if self.inner.run.stop() {
            tracing::debug!(session = %self.inner.id, "Stop requested");
        }
    }

    /// Whether the run flag is set. Cleared by `stop()` immediately, even
    /// while the last step is still in flight.
    pub fn is_running(&self) -> bool {
        self.inner.run.state() == RunState::Running
    }

    pub fn run_state(&self) -> RunState {
        self.inner.run.state()
    }

    /// Observe run state changes.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.inner.run.subscribe()
    }

    async fn drive(&self, guard: RunGuard) -> Result<RunOutcome, GenerationError> {
        let span = tracing::info_span!(
            "run",
            session = %self.inner.id,
            machine = %self.inner.machine.name()
        );
        self.drive_steps(&guard).instrument(span).await
    }

    async fn drive_steps(&self, guard: &RunGuard) -> Result<RunOutcome, GenerationError> {
        let machine = self.inner.machine.as_ref();
        let mut steps = 0;
        tracing::info!("Run started");

        loop {
            if guard.exit_if_stopped() {
                tracing::info!(steps, "Run stopped");
                return Ok(RunOutcome::Stopped { steps });
            }

            let (history, state) = {
                let timeline = self.timeline();
                let state = timeline.history.latest().state().clone();
                (timeline.history.clone(), state)
            };

            if machine.is_finished(&state) {
                tracing::info!(steps, "Run finished");
                return Ok(RunOutcome::Finished { steps });
            }

            match self.inner.generator.step(machine, &history, &state).await {
                Ok(outcome) => {
                    self.push(outcome.transitions, outcome.state);
                    steps += 1;
                }
                Err(e) => {
                    tracing::error!(steps, error = %e, "Run aborted");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::core::{Menu, Message, Prompt};
    use crate::generator::ServiceError;
    use crate::protocol::GenerationResponse;
    use crate::testing::ScriptedService;
    use crate::transition_args;
    use serde_json::json;
    use std::time::Duration;

    transition_args! {
        struct Increment {}
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Action {
        Increment(Increment),
    }

    struct Counter {
        limit: u32,
    }

    impl Machine for Counter {
        type State = u32;
        type Action = Action;
        type View = String;

        fn name(&self) -> &str {
            "counter"
        }

        fn initial_state(&self) -> u32 {
            0
        }

        fn is_finished(&self, state: &u32) -> bool {
            *state >= self.limit
        }

        fn menu(&self, _state: &u32) -> Menu<Action> {
            Menu::new().offer(
                "increment",
                "Add one to the count.",
                Increment::schema(),
                Action::Increment,
            )
        }

        fn build_prompt(&self, _history: &History<u32, Action>, state: &u32) -> Prompt {
            Prompt::new("You are counting.").with_message(Message::user(format!("Count: {state}")))
        }

        fn reduce(&self, state: &u32, transitions: &[Transition<Action>]) -> u32 {
            state + transitions.iter().filter(|t| t.is_declared()).count() as u32
        }

        fn render(&self, state: &u32, transitions: &[Transition<Action>]) -> String {
            format!("{state} after {} transition(s)", transitions.len())
        }
    }

    fn increment() -> GenerationResponse {
        GenerationResponse::from_invocations([("increment", json!({}))])
    }

    fn session_with(service: ScriptedService, limit: u32) -> (Session<Counter>, Arc<ScriptedService>) {
        let service = Arc::new(service);
        let generator =
            TransitionGenerator::new(service.clone(), GeneratorConfig::default()).unwrap();
        (Session::new(Counter { limit }, generator), service)
    }

    fn counting(limit: u32) -> (Session<Counter>, Arc<ScriptedService>) {
        session_with(ScriptedService::new().repeat(increment()), limit)
    }

    fn applied_increment() -> Transition<Action> {
        Transition::declared("increment", Action::Increment(Increment {}))
    }

    #[test]
    fn new_session_holds_initial_state() {
        let (session, _) = counting(3);
        assert_eq!(session.len(), 1);
        assert_eq!(session.viewing_index(), 0);
        assert_eq!(*session.latest().state(), 0);
        assert!(session.latest().transitions().is_empty());
        assert_eq!(session.run_state(), RunState::Idle);
    }

    #[test]
    fn three_pushes_give_four_entries() {
        let (session, _) = counting(3);
        for count in 1..=3 {
            session.push(vec![applied_increment()], count);
        }

        let history = session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(*history.get(3).unwrap().state(), 3);
        assert_eq!(session.viewing_index(), 3);
        assert_eq!(history.replay(session.machine()), None);
    }

    #[test]
    fn initial_entry_keeps_identity() {
        let (session, _) = counting(3);
        let initial = Arc::clone(session.history().initial());

        session.push(vec![applied_increment()], 1);
        session.push(Vec::new(), 1);

        assert!(Arc::ptr_eq(&initial, session.history().initial()));
    }

    #[test]
    fn earlier_snapshots_are_unaffected_by_push() {
        let (session, _) = counting(3);
        let before = session.history();
        session.push(vec![applied_increment()], 1);

        assert_eq!(before.len(), 1);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn view_out_of_range_is_ignored() {
        let (session, _) = counting(3);
        session.push(vec![applied_increment()], 1);
        session.view(0);

        session.view(2);
        assert_eq!(session.viewing_index(), 0);
        session.view(usize::MAX);
        assert_eq!(session.viewing_index(), 0);
    }

    #[test]
    fn stepping_navigates_within_bounds() {
        let (session, _) = counting(3);
        session.push(vec![applied_increment()], 1);
        session.push(vec![applied_increment()], 2);
        session.view(0);

        assert!(!session.can_step_backward());
        session.step_backward();
        assert_eq!(session.viewing_index(), 0);

        session.step_forward();
        session.step_forward();
        assert_eq!(session.viewing_index(), 2);
        assert!(!session.can_step_forward());
        session.step_forward();
        assert_eq!(session.viewing_index(), 2);

        session.step_backward();
        assert_eq!(session.viewing_index(), 1);
        assert_eq!(session.render(), "1 after 1 transition(s)");
    }

    #[test]
    fn stop_before_start_is_a_noop() {
        let (session, _) = counting(3);
        session.stop();
        session.stop();
        assert!(!session.is_running());
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn update_steps_from_latest_state() {
        let (session, service) = counting(3);

        for _ in 0..3 {
            session.update().await.unwrap();
        }

        assert_eq!(session.len(), 4);
        assert_eq!(*session.latest().state(), 3);
        assert_eq!(service.call_count(), 3);
        assert_eq!(
            service.requests()[2].messages,
            vec![Message::user("Count: 2")]
        );
    }

    #[tokio::test]
    async fn update_from_earlier_view_appends_a_branch() {
        let (session, _) = counting(5);
        session.update().await.unwrap();
        session.update().await.unwrap();

        session.view(0);
        let entry = session.update().await.unwrap();

        assert_eq!(*entry.state(), 1);
        assert_eq!(session.len(), 4);
        assert_eq!(session.viewing_index(), 3);
        assert_eq!(session.history().states().copied().collect::<Vec<_>>(), [0, 1, 2, 1]);
    }

    #[tokio::test]
    async fn failed_update_leaves_history_untouched() {
        let (session, _) = session_with(
            ScriptedService::new().fail(ServiceError::network("connection reset")),
            3,
        );

        let err = session.update().await.unwrap_err();

        assert_eq!(
            err,
            GenerationError::Service(ServiceError::network("connection reset"))
        );
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn start_runs_until_finished() {
        let (session, service) = counting(3);

        let handle = session.start().unwrap();
        let outcome = handle.await.unwrap().unwrap();

        assert_eq!(outcome, RunOutcome::Finished { steps: 3 });
        assert!(!session.is_running());
        assert_eq!(service.call_count(), 3);
        assert_eq!(session.len(), 4);
        assert_eq!(*session.latest().state(), 3);
    }

    #[tokio::test]
    async fn run_on_finished_machine_makes_no_calls() {
        let (session, service) = counting(0);

        let outcome = session.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::Finished { steps: 0 });
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn generation_failure_ends_the_run() {
        let (session, _) = session_with(
            ScriptedService::new()
                .respond(increment())
                .fail(ServiceError::server_error("overloaded")),
            5,
        );

        let result = session.run().await;

        assert_eq!(
            result,
            Err(GenerationError::Service(ServiceError::server_error("overloaded")))
        );
        assert!(!session.is_running());
        assert_eq!(session.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_running_is_refused() {
        let (session, _) = session_with(
            ScriptedService::new()
                .with_delay(Duration::from_secs(10))
                .repeat(increment()),
            2,
        );

        let handle = session.start().unwrap();
        assert!(session.is_running());
        assert!(session.start().is_none());
        assert_eq!(session.run().await, Ok(RunOutcome::AlreadyRunning));

        assert_eq!(handle.await.unwrap(), Ok(RunOutcome::Finished { steps: 2 }));
        assert!(!session.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_the_in_flight_step_finish() {
        let (session, service) = session_with(
            ScriptedService::new()
                .with_delay(Duration::from_secs(10))
                .repeat(increment()),
            100,
        );

        let handle = session.start().unwrap();
        while service.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        session.stop();
        assert!(!session.is_running());

        let outcome = handle.await.unwrap().unwrap();

        assert_eq!(outcome, RunOutcome::Stopped { steps: 1 });
        assert_eq!(session.len(), 2);
        assert!(!session.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_stop_rearms_the_draining_run() {
        let (session, service) = session_with(
            ScriptedService::new()
                .with_delay(Duration::from_secs(10))
                .repeat(increment()),
            5,
        );

        let handle = session.start().unwrap();
        while service.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        session.stop();
        assert!(!session.is_running());

        assert!(session.start().is_none());
        assert!(session.is_running());
        assert_eq!(session.run().await, Ok(RunOutcome::AlreadyRunning));

        let outcome = handle.await.unwrap().unwrap();

        assert_eq!(outcome, RunOutcome::Finished { steps: 5 });
        assert_eq!(session.len(), 6);
        assert_eq!(*session.latest().state(), 5);
        assert!(!session.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn run_after_stop_reports_resumed() {
        let (session, service) = session_with(
            ScriptedService::new()
                .with_delay(Duration::from_secs(10))
                .repeat(increment()),
            2,
        );

        let handle = session.start().unwrap();
        while service.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        session.stop();

        assert_eq!(session.run().await, Ok(RunOutcome::Resumed));
        assert_eq!(handle.await.unwrap(), Ok(RunOutcome::Finished { steps: 2 }));
    }

    #[tokio::test]
    async fn subscribers_see_run_start_and_end() {
        let (session, _) = counting(1);
        let mut states = session.subscribe();
        assert_eq!(*states.borrow_and_update(), RunState::Idle);

        let handle = session.start().unwrap();
        assert_eq!(*states.borrow_and_update(), RunState::Running);

        handle.await.unwrap().unwrap();
        assert_eq!(*states.borrow_and_update(), RunState::Idle);
    }

    #[tokio::test]
    async fn session_can_run_again_after_stopping() {
        let (session, _) = counting(2);
        session.stop();

        assert_eq!(session.run().await, Ok(RunOutcome::Finished { steps: 2 }));
        assert_eq!(session.run().await, Ok(RunOutcome::Finished { steps: 0 }));
    }
}
