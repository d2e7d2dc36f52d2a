//! The external generation service and its request shape.

use super::error::ServiceError;
use crate::core::Message;
use crate::protocol::{GenerationResponse, ToolDeclaration};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// How the service may choose among the declared tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolChoiceMode {
    /// Must call at least one of the allowed tools.
    Any,
    /// May call allowed tools or reply with text only.
    Auto,
}

/// Tool-selection policy sent with every request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolChoice {
    pub mode: ToolChoiceMode,
    #[serde(rename = "allowedFunctionNames")]
    pub allowed: Vec<String>,
}

impl ToolChoice {
    pub fn any(allowed: Vec<String>) -> Self {
        Self {
            mode: ToolChoiceMode::Any,
            allowed,
        }
    }

    pub fn auto(allowed: Vec<String>) -> Self {
        Self {
            mode: ToolChoiceMode::Auto,
            allowed,
        }
    }
}

/// Everything the service needs for one call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDeclaration>,
    pub tool_choice: ToolChoice,
}

/// An external structured-generation service with tool calling.
///
/// Transport, credentials and request marshalling live behind this trait.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ServiceError>;

    /// Whether the service can be forced to call at least one tool.
    ///
    /// When `false`, the generator asks for [`ToolChoiceMode::Auto`] and
    /// accepts steps with no transitions.
    fn supports_required_choice(&self) -> bool {
        true
    }
}

/// Logging wrapper for generation services.
pub struct LoggingService {
    inner: Arc<dyn GenerationService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn GenerationService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl GenerationService for LoggingService {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ServiceError> {
        let start = Instant::now();
        let result = self.inner.generate(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    tools = request.tools.len(),
                    invocations = response.invocations().count(),
                    "Generation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "Generation failed"
                );
            }
        }

        result
    }

    fn supports_required_choice(&self) -> bool {
        self.inner.supports_required_choice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedService;
    use serde_json::json;

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "test-model".to_string(),
            system: "Be brief.".to_string(),
            messages: vec![Message::user("Go.")],
            tools: Vec::new(),
            tool_choice: ToolChoice::any(vec!["pass".to_string()]),
        }
    }

    #[test]
    fn tool_choice_serializes_as_function_calling_config() {
        assert_eq!(
            serde_json::to_value(ToolChoice::any(vec!["a".to_string()])).unwrap(),
            json!({ "mode": "ANY", "allowedFunctionNames": ["a"] })
        );
        assert_eq!(
            serde_json::to_value(ToolChoice::auto(Vec::new())).unwrap(),
            json!({ "mode": "AUTO", "allowedFunctionNames": [] })
        );
    }

    #[tokio::test]
    async fn logging_service_passes_results_through() {
        let scripted = Arc::new(
            ScriptedService::new()
                .respond(GenerationResponse::from_invocations([("pass", json!({}))]))
                .fail(ServiceError::rate_limit("slow down")),
        );
        let logging = LoggingService::new(scripted.clone());

        let ok = logging.generate(&request()).await.unwrap();
        assert_eq!(ok.invocations().count(), 1);

        let err = logging.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind, crate::generator::ServiceErrorKind::RateLimit);

        assert_eq!(scripted.requests().len(), 2);
        assert!(logging.supports_required_choice());
    }
}
