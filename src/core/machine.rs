//! The contract an operator implements to define a machine.

use super::history::History;
use super::menu::Menu;
use super::prompt::Prompt;
use super::transition::Transition;
use std::fmt::Debug;

/// A machine driven by a tool-calling model.
///
/// All methods are pure: the engine calls them from the session controller
/// and the transition generator, and `reduce` is the only place a state is
/// ever derived from another.
///
/// # Required Traits
///
/// - `State: Clone`: states are copied out of history to start a step
/// - `Action`: the machine's tagged union of transition payloads, one
///   variant per menu entry
///
/// # Example
///
/// ```rust
/// use statecall::core::{History, Machine, Menu, Message, Prompt, Transition};
/// use statecall::schema::Typed;
/// use statecall::transition_args;
///
/// transition_args! {
///     pub struct Increment {}
/// }
///
/// #[derive(Clone, Debug)]
/// enum Action {
///     Increment(Increment),
/// }
///
/// struct Counter;
///
/// impl Machine for Counter {
///     type State = u32;
///     type Action = Action;
///     type View = String;
///
///     fn name(&self) -> &str {
///         "counter"
///     }
///
///     fn initial_state(&self) -> u32 {
///         0
///     }
///
///     fn is_finished(&self, state: &u32) -> bool {
///         *state >= 3
///     }
///
///     fn menu(&self, _state: &u32) -> Menu<Action> {
///         Menu::new().offer("increment", "Add one.", Increment::schema(), Action::Increment)
///     }
///
///     fn build_prompt(&self, _history: &History<u32, Action>, state: &u32) -> Prompt {
///         Prompt::new("You are counting.").with_message(Message::user(format!("Count: {state}")))
///     }
///
///     fn reduce(&self, state: &u32, transitions: &[Transition<Action>]) -> u32 {
///         transitions.iter().fold(*state, |s, t| match t {
///             Transition::Declared { action: Action::Increment(_), .. } => s + 1,
///             Transition::Unknown { .. } => s,
///         })
///     }
///
///     fn render(&self, state: &u32, _transitions: &[Transition<Action>]) -> String {
///         format!("count = {state}")
///     }
/// }
/// ```
pub trait Machine: Send + Sync + 'static {
    type State: Clone + Debug + Send + Sync + 'static;
    type Action: Clone + Debug + Send + Sync + 'static;
    /// Output of [`render`](Machine::render), consumed by the host UI.
    type View;

    /// Name used in logs.
    fn name(&self) -> &str;

    fn initial_state(&self) -> Self::State;

    /// Termination condition for autonomous running.
    fn is_finished(&self, state: &Self::State) -> bool;

    /// Transitions currently legal in `state`, in declaration order.
    fn menu(&self, state: &Self::State) -> Menu<Self::Action>;

    /// Build the context handed to the generation service.
    fn build_prompt(
        &self,
        history: &History<Self::State, Self::Action>,
        state: &Self::State,
    ) -> Prompt;

    /// Fold a batch of transitions, in order, into a new state.
    ///
    /// Must be deterministic. Transitions the current menu did not declare
    /// arrive as [`Transition::Unknown`] and should leave the state as is.
    fn reduce(
        &self,
        state: &Self::State,
        transitions: &[Transition<Self::Action>],
    ) -> Self::State;

    /// Read-only presentation of a state and the transitions that led to it.
    fn render(&self, state: &Self::State, transitions: &[Transition<Self::Action>]) -> Self::View;

    /// Whether `reduce` accepts a step that produced no transitions.
    ///
    /// When `false`, an empty response fails the step instead.
    fn tolerates_empty_step(&self) -> bool {
        true
    }
}
