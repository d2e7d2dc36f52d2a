//! Transition generation: one step of a machine against an external
//! tool-calling service.

mod error;
#[allow(clippy::module_inception)]
mod generator;
mod service;

pub use error::{GenerationError, ServiceError, ServiceErrorKind};
pub use generator::{StepOutcome, TransitionGenerator};
pub use service::{GenerationRequest, GenerationService, LoggingService, ToolChoice, ToolChoiceMode};
