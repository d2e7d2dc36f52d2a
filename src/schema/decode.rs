//! Runtime decoding of raw JSON values against a schema.
//!
//! Decoding uses Stillwater's `Validation` so that every mismatch in a
//! value is reported in one pass instead of stopping at the first one.

use super::types::{Schema, SchemaKind};
use serde_json::{Map, Value};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Result of decoding: a normalized value, or every mismatch found.
pub type Decoded = Validation<Value, NonEmptyVec<DecodeError>>;

/// A single mismatch between a value and its schema.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("at {path}: {kind}")]
pub struct DecodeError {
    /// Location of the mismatch, e.g. `$.players[2].name`.
    pub path: String,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(path: impl Into<String>, kind: DecodeErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeErrorKind {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{value}' is not one of {allowed:?}")]
    NotInEnum { value: String, allowed: Vec<String> },

    #[error("{0} is not an integer")]
    NotIntegral(String),

    #[error("expected at least {min} items, found {found}")]
    TooFewItems { min: usize, found: usize },

    #[error("expected at most {max} items, found {found}")]
    TooManyItems { max: usize, found: usize },

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("{0}")]
    Deserialize(String),
}

const ROOT: &str = "$";

/// Validate `raw` against `schema` and coerce it into canonical form.
///
/// Integral floats (`3.0`) are accepted for integer schemas and normalized
/// to integers. Object fields not declared by the schema are dropped, and
/// the remaining fields are emitted in ordinal order.
///
/// # Example
///
/// ```rust
/// use statecall::schema::{decode, Schema};
/// use serde_json::json;
///
/// let schema = Schema::object([("amount", 0, Schema::integer())]).unwrap();
/// let decoded = decode(&schema, &json!({ "amount": 3.0, "extra": true }));
///
/// assert!(decoded.is_success());
/// ```
pub fn decode(schema: &Schema, raw: &Value) -> Decoded {
    decode_at(schema, raw, ROOT)
}

fn decode_at(schema: &Schema, raw: &Value, path: &str) -> Decoded {
    match (schema.kind(), raw) {
        (SchemaKind::String, Value::String(_)) => Validation::success(raw.clone()),

        (SchemaKind::StringEnum(allowed), Value::String(value)) => {
            if allowed.iter().any(|a| a == value) {
                Validation::success(raw.clone())
            } else {
                Validation::fail(DecodeError::new(
                    path,
                    DecodeErrorKind::NotInEnum {
                        value: value.clone(),
                        allowed: allowed.clone(),
                    },
                ))
            }
        }

        (SchemaKind::Integer, Value::Number(n)) => match integral(n) {
            Some(i) => Validation::success(Value::from(i)),
            None => Validation::fail(DecodeError::new(
                path,
                DecodeErrorKind::NotIntegral(n.to_string()),
            )),
        },

        (SchemaKind::Number, Value::Number(_)) => Validation::success(raw.clone()),

        (SchemaKind::Boolean, Value::Bool(_)) => Validation::success(raw.clone()),

        (SchemaKind::Array(array), Value::Array(items)) => {
            let mut checks: Vec<Validation<Option<Value>, NonEmptyVec<DecodeError>>> = Vec::new();

            if let Some(min) = array.min_items() {
                if items.len() < min {
                    checks.push(Validation::fail(DecodeError::new(
                        path,
                        DecodeErrorKind::TooFewItems {
                            min,
                            found: items.len(),
                        },
                    )));
                }
            }
            if let Some(max) = array.max_items() {
                if items.len() > max {
                    checks.push(Validation::fail(DecodeError::new(
                        path,
                        DecodeErrorKind::TooManyItems {
                            max,
                            found: items.len(),
                        },
                    )));
                }
            }

            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                checks.push(decode_at(array.item(), item, &item_path).map(Some));
            }

            Validation::all_vec(checks)
                .map(|values| Value::Array(values.into_iter().flatten().collect()))
        }

        (SchemaKind::Object(object), Value::Object(entries)) => {
            let checks: Vec<Validation<(String, Value), NonEmptyVec<DecodeError>>> = object
                .fields()
                .iter()
                .map(|field| {
                    let field_path = format!("{path}.{}", field.name());
                    match entries.get(field.name()) {
                        Some(value) => decode_at(field.schema(), value, &field_path)
                            .map(|v| (field.name().to_string(), v)),
                        None => Validation::fail(DecodeError::new(
                            path,
                            DecodeErrorKind::MissingField(field.name().to_string()),
                        )),
                    }
                })
                .collect();

            Validation::all_vec(checks)
                .map(|fields| Value::Object(fields.into_iter().collect::<Map<String, Value>>()))
        }

        (_, other) => Validation::fail(DecodeError::new(
            path,
            DecodeErrorKind::TypeMismatch {
                expected: schema.tag(),
                found: json_type(other),
            },
        )),
    }
}

fn integral(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    // `i64::MAX as f64` rounds up to 2^63, which does not fit.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Flatten a failed validation into a plain list of errors.
pub(crate) fn into_result(decoded: Decoded) -> Result<Value, Vec<DecodeError>> {
    match decoded {
        Validation::Success(value) => Ok(value),
        Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
    }
}
