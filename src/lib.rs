//! Statecall: a schema-typed transition engine
//!
//! Statecall lets a tool-calling model drive an application state machine.
//! The machine declares, for each state, a menu of named transitions whose
//! arguments are described by schemas. The engine lowers those schemas into
//! tool declarations, asks a generation service to choose among them,
//! decodes the chosen invocations back into typed actions, and folds them
//! through the machine's pure reducer. Every step is kept in an append-only
//! history that can be navigated and branched from.
//!
//! # Modules
//!
//! - [`schema`]: value-shape descriptors, typed wrappers and the runtime decoder
//! - [`protocol`]: tool declarations and response parsing
//! - [`core`]: the `Machine` contract, menus, transitions and history
//! - [`generator`]: one generation step against an external service
//! - [`session`]: history navigation and the autonomous run loop
//! - [`config`]: generator settings
//!
//! # Example
//!
//! ```rust
//! use statecall::schema::Typed;
//! use statecall::protocol::to_tool_declaration;
//! use statecall::transition_args;
//!
//! transition_args! {
//!     pub struct Move {
//!         pub direction: String,
//!         pub steps: i64,
//!     }
//! }
//!
//! let schema = Move::schema(
//!     Typed::string_enum(["north", "south"]).describe("Where to go."),
//!     Typed::integer().describe("How far."),
//! );
//!
//! let declaration = to_tool_declaration("move", "Move the player.", schema.schema()).unwrap();
//! assert_eq!(declaration.parameters.property_names(), ["direction", "steps"]);
//! ```

pub mod config;
pub mod core;
pub mod generator;
pub mod protocol;
pub mod schema;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export commonly used types
pub use config::GeneratorConfig;
pub use crate::core::{History, HistoryEntry, Machine, Menu, Message, Prompt, Transition};
pub use generator::{GenerationError, GenerationService, TransitionGenerator};
pub use schema::{Schema, Typed};
pub use session::{RunOutcome, RunState, Session};
