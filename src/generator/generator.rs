//! One request/response cycle: prompt, declare, generate, parse, reduce.

use super::error::GenerationError;
use super::service::{GenerationRequest, GenerationService, ToolChoice};
use crate::config::{ConfigError, GeneratorConfig};
use crate::core::{History, Machine, Menu, Transition};
use crate::protocol::{parse_response, to_tool_declaration, ProtocolError, ToolDeclaration};
use std::sync::Arc;

/// Transitions chosen in one step and the state they produce.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome<S, A> {
    pub transitions: Vec<Transition<A>>,
    pub state: S,
}

/// Drives a single generation step for any machine.
///
/// The generator never touches session history; it only reads the
/// history it is given and returns the outcome of the step.
#[derive(Clone)]
pub struct TransitionGenerator {
    service: Arc<dyn GenerationService>,
    config: GeneratorConfig,
}

impl TransitionGenerator {
    /// Create a generator, rejecting an invalid `config`.
    pub fn new(
        service: Arc<dyn GenerationService>,
        config: GeneratorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { service, config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Tool declarations for every entry on `menu`, in menu order.
    pub fn declarations<A>(menu: &Menu<A>) -> Result<Vec<ToolDeclaration>, ProtocolError> {
        if menu.is_empty() {
            return Err(ProtocolError::EmptyMenu);
        }
        menu.entries()
            .iter()
            .map(|entry| to_tool_declaration(entry.name(), entry.description(), entry.schema()))
            .collect()
    }

    /// Ask the service for transitions from `state` and apply them.
    ///
    /// Errors from the service, a missed deadline, or a response that does
    /// not match the declared schemas fail the step. Nothing is retried.
    #[tracing::instrument(skip_all, fields(machine = %machine.name(), step = history.len()))]
    pub async fn step<M: Machine>(
        &self,
        machine: &M,
        history: &History<M::State, M::Action>,
        state: &M::State,
    ) -> Result<StepOutcome<M::State, M::Action>, GenerationError> {
        let prompt = machine.build_prompt(history, state);
        let menu = machine.menu(state);
        let tools = Self::declarations(&menu)?;
        let names: Vec<String> = menu.names().map(str::to_string).collect();

        let tool_choice = if self.config.require_transitions && self.service.supports_required_choice()
        {
            ToolChoice::any(names)
        } else {
            ToolChoice::auto(names)
        };

        tracing::debug!(tools = tools.len(), mode = ?tool_choice.mode, "Requesting transitions");

        let request = GenerationRequest {
            model: self.config.model.clone(),
            system: prompt.system,
            messages: prompt.messages,
            tools,
            tool_choice,
        };

        let call = self.service.generate(&request);
        let response = match self.config.request_timeout() {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .map_err(|_| GenerationError::TimedOut(deadline))??,
            None => call.await?,
        };

        let text = response.text();
        if !text.is_empty() {
            tracing::debug!(%text, "Response included free text");
        }

        let transitions = parse_response(&response, &menu, !machine.tolerates_empty_step())?;
        if transitions.is_empty() {
            tracing::warn!("Step produced no transitions");
        }

        let next = machine.reduce(state, &transitions);
        tracing::debug!(transitions = transitions.len(), "Transitions applied");

        Ok(StepOutcome {
            transitions,
            state: next,
        })
    }
}
