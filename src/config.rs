//! Transition generator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised when a configuration is invalid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("model must not be empty")]
    EmptyModel,

    #[error("request_timeout_ms must be > 0 when set")]
    ZeroTimeout,

    #[error("{var} has invalid value '{value}'")]
    InvalidVar { var: &'static str, value: String },
}

/// Settings for the transition generator.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Model identifier passed through to the generation service.
    pub model: String,

    /// Ask the service to pick at least one transition per step.
    pub require_transitions: bool,

    /// Deadline for a single generation call, in milliseconds. `None`
    /// waits indefinitely.
    pub request_timeout_ms: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            require_transitions: true,
            request_timeout_ms: Some(120_000),
        }
    }
}

const MODEL_VAR: &str = "STATECALL_MODEL";
const REQUIRE_VAR: &str = "STATECALL_REQUIRE_TRANSITIONS";
const TIMEOUT_VAR: &str = "STATECALL_TIMEOUT_MS";

impl GeneratorConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-call deadline. Sub-millisecond remainders round up.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms = timeout.map(|d| {
            u64::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
        });
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Defaults overridden by `STATECALL_*` environment variables.
    ///
    /// `STATECALL_TIMEOUT_MS=none` disables the deadline.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup(MODEL_VAR) {
            config.model = model;
        }

        if let Some(value) = lookup(REQUIRE_VAR) {
            config.require_transitions = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        var: REQUIRE_VAR,
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup(TIMEOUT_VAR) {
            config.request_timeout_ms = match value.trim() {
                "none" | "off" => None,
                secs => Some(secs.parse().map_err(|_| ConfigError::InvalidVar {
                    var: TIMEOUT_VAR,
                    value: value.clone(),
                })?),
            };
        }

        config.validate()?;
        Ok(config)
    }
}
