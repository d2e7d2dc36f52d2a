//! Session controller.
//!
//! A [`Session`] owns the append-only history of one machine instance, the
//! index currently being viewed, and the run flag of its autonomous loop.

mod run;
#[allow(clippy::module_inception)]
mod session;

pub use run::{RunOutcome, RunState};
pub use session::Session;
