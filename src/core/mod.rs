//! Machine definition types.
//!
//! This module contains the declarative side of the engine:
//! - The `Machine` trait an operator implements
//! - The per-state `Menu` of typed transitions
//! - `Transition` instances and the `Prompt` handed to the model
//! - Immutable `History` of applied steps
//!
//! Nothing in this module performs I/O.

mod history;
mod machine;
mod menu;
mod prompt;
mod transition;

pub use history::{History, HistoryEntry};
pub use machine::Machine;
pub use menu::{Menu, MenuEntry};
pub use prompt::{Message, Prompt, Role};
pub use transition::Transition;
