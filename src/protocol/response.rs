//! Reading transitions out of a generation response.

use super::error::ProtocolError;
use crate::core::{Menu, Transition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool invocation: the tool's name and its arguments as opaque JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// One part of a candidate's content: free text or a tool invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

/// Response envelope returned by the generation service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerationResponse {
    /// A single-candidate response carrying the given invocations in order.
    pub fn from_invocations<I, N>(invocations: I) -> Self
    where
        I: IntoIterator<Item = (N, Value)>,
        N: Into<String>,
    {
        let parts = invocations
            .into_iter()
            .map(|(name, args)| Part {
                text: None,
                function_call: Some(FunctionCall {
                    name: name.into(),
                    args,
                }),
            })
            .collect();

        Self {
            candidates: vec![Candidate {
                content: Content {
                    role: Some("model".to_string()),
                    parts,
                },
            }],
        }
    }

    /// A single-candidate response containing only text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: Some(text.into()),
                        function_call: None,
                    }],
                },
            }],
        }
    }

    /// Parse a raw JSON envelope.
    pub fn from_json(value: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    /// Tool invocations across all candidates, in response order.
    pub fn invocations(&self) -> impl Iterator<Item = &FunctionCall> {
        self.candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .filter_map(|p| p.function_call.as_ref())
    }

    /// Concatenated free-text parts.
    pub fn text(&self) -> String {
        self.candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Read the transitions out of `response`.
///
/// Invocation order is preserved. Names on `menu` are decoded through the
/// menu entry, so a declared transition's action always matches its schema;
/// names not on `menu` are kept as [`Transition::Unknown`]. With
/// `require_one`, a response without invocations is an error.
pub fn parse_response<A>(
    response: &GenerationResponse,
    menu: &Menu<A>,
    require_one: bool,
) -> Result<Vec<Transition<A>>, ProtocolError> {
    let mut transitions = Vec::new();

    for call in response.invocations() {
        // Argument-less calls may omit `args` entirely.
        let args = match &call.args {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        match menu.get(&call.name) {
            Some(entry) => {
                let action = entry
                    .decode(&args)
                    .map_err(|errors| ProtocolError::InvalidArguments {
                        name: call.name.clone(),
                        errors,
                    })?;
                transitions.push(Transition::declared(call.name.as_str(), action));
            }
            None => {
                tracing::warn!(name = %call.name, "Ignoring undeclared transition");
                transitions.push(Transition::unknown(call.name.as_str(), args));
            }
        }
    }

    if require_one && transitions.is_empty() {
        return Err(ProtocolError::NoTransitionsProduced);
    }

    Ok(transitions)
}
