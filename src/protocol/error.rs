//! Protocol adapter errors.

use crate::schema::DecodeError;
use thiserror::Error;

/// Errors raised while building declarations or reading a response.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Transition '{name}' must take an object schema, found {found}")]
    ParametersNotObject { name: String, found: &'static str },

    #[error("No transitions are on the menu for the current state")]
    EmptyMenu,

    #[error("Response envelope could not be parsed: {0}")]
    MalformedEnvelope(String),

    #[error("Response contained no transitions")]
    NoTransitionsProduced,

    #[error("Arguments for '{name}' do not match its schema: {}", summarize(.errors))]
    InvalidArguments {
        name: String,
        errors: Vec<DecodeError>,
    },
}

fn summarize(errors: &[DecodeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
