//! Schema engine.
//!
//! This module defines the closed set of value-shape descriptors used to
//! declare transition arguments:
//! - [`Schema`]: the untyped, immutable descriptor
//! - [`Typed`]: a descriptor tied to the Rust type it infers
//! - [`decode`]: the runtime check that turns a raw value into that type
//!
//! Descriptors carry no behavior of their own; the protocol adapter lowers
//! them to the wire format and the decoder validates values against them.

mod decode;
mod macros;
mod typed;
mod types;

pub use decode::{decode, DecodeError, DecodeErrorKind, Decoded};
pub use typed::Typed;
pub use types::{ArraySchema, Field, ObjectSchema, Schema, SchemaError, SchemaKind};
