//! Protocol adapter between schemas and the tool-calling wire format.
//!
//! Outbound, [`to_tool_declaration`] lowers an object schema into a tool
//! declaration whose properties, required list and ordering hint all agree
//! on ordinal order. Inbound, [`parse_response`] reads tool invocations out
//! of a [`GenerationResponse`] and decodes them into typed transitions.

mod declaration;
mod error;
mod response;

pub use declaration::{lower, to_tool_declaration, ToolDeclaration, WireSchema, WireType};
pub use error::ProtocolError;
pub use response::{
    parse_response, Candidate, Content, FunctionCall, GenerationResponse, Part,
};
