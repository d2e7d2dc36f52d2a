//! Scripted generation service for tests and demos.
//!
//! Enabled in unit tests and behind the `test-support` feature.

use crate::generator::{GenerationRequest, GenerationService, ServiceError};
use crate::protocol::GenerationResponse;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Generation service that replays queued results in order.
///
/// Once the queue is empty it returns the `repeat` response if one was set,
/// otherwise an [`ServiceErrorKind::Unknown`](crate::generator::ServiceErrorKind)
/// error. Every request is recorded.
pub struct ScriptedService {
    script: Mutex<VecDeque<Result<GenerationResponse, ServiceError>>>,
    fallback: Option<GenerationResponse>,
    delay: Option<Duration>,
    required_choice: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            required_choice: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn respond(self, response: GenerationResponse) -> Self {
        lock(&self.script).push_back(Ok(response));
        self
    }

    /// Queue a failure
    pub fn fail(self, error: ServiceError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Response returned for every call after the queue runs out.
    pub fn repeat(mut self, response: GenerationResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report that tool choice cannot be forced.
    pub fn without_required_choice(mut self) -> Self {
        self.required_choice = false;
        self
    }

    /// Get recorded requests
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError> {
        lock(&self.requests).push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = lock(&self.script).pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(response)) => Ok(response.clone()),
            (None, None) => Err(ServiceError::unknown("No scripted response queued")),
        }
    }

    fn supports_required_choice(&self) -> bool {
        self.required_choice
    }
}
