//! Schema descriptors.
//!
//! A [`Schema`] describes the shape of a value without carrying any
//! validation logic of its own. Descriptors are immutable once built;
//! object schemas keep their fields sorted by ordinal so every consumer
//! sees the same canonical order.

use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while constructing a schema.
///
/// These are definition-time failures: a machine that produces one has a
/// bug in its transition menu, not a runtime condition to recover from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Fields '{first}' and '{second}' share ordinal {ordinal}")]
    DuplicateOrdinal {
        ordinal: u32,
        first: String,
        second: String,
    },

    #[error("Field '{name}' is declared more than once")]
    DuplicateField { name: String },
}

/// Closed set of value shapes a schema can describe.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaKind {
    String,
    /// A string restricted to an ordered, finite set of literals.
    StringEnum(Vec<String>),
    Integer,
    Number,
    Boolean,
    Array(ArraySchema),
    Object(ObjectSchema),
}

/// Item descriptor plus optional cardinality bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySchema {
    item: Box<Schema>,
    min_items: Option<usize>,
    max_items: Option<usize>,
}

impl ArraySchema {
    pub fn item(&self) -> &Schema {
        &self.item
    }

    pub fn min_items(&self) -> Option<usize> {
        self.min_items
    }

    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }
}

/// Record descriptor. Fields are stored in strictly increasing ordinal order.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSchema {
    fields: Vec<Field>,
}

impl ObjectSchema {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field names in ordinal order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// One named, ordered field of an object schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    ordinal: u32,
    schema: Schema,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Descriptor of a value's shape, with an optional human-readable
/// description forwarded to the model as protocol metadata.
///
/// # Example
///
/// ```rust
/// use statecall::schema::Schema;
///
/// let schema = Schema::object([
///     ("b", 1, Schema::integer()),
///     ("a", 0, Schema::string().describe("Comes first on the wire.")),
/// ])
/// .unwrap();
///
/// let names: Vec<_> = schema.fields().iter().map(|f| f.name()).collect();
/// assert_eq!(names, ["a", "b"]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    kind: SchemaKind,
    description: Option<String>,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String)
    }

    /// A string that must be one of `values`. Literal order is preserved.
    pub fn string_enum<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::of(SchemaKind::StringEnum(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn array(item: Schema) -> Self {
        Self::of(SchemaKind::Array(ArraySchema {
            item: Box::new(item),
            min_items: None,
            max_items: None,
        }))
    }

    /// Build an object schema from `(name, ordinal, schema)` triples.
    ///
    /// The order the fields are given in is irrelevant; ordinals alone
    /// define the canonical ordering. Two fields sharing an ordinal, or a
    /// repeated field name, is an error.
    pub fn object<I, N>(fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (N, u32, Schema)>,
        N: Into<String>,
    {
        let mut by_ordinal: HashMap<u32, String> = HashMap::new();
        let mut collected: Vec<Field> = Vec::new();

        for (name, ordinal, schema) in fields {
            let name = name.into();
            if collected.iter().any(|f| f.name == name) {
                return Err(SchemaError::DuplicateField { name });
            }
            if let Some(first) = by_ordinal.get(&ordinal) {
                return Err(SchemaError::DuplicateOrdinal {
                    ordinal,
                    first: first.clone(),
                    second: name,
                });
            }
            by_ordinal.insert(ordinal, name.clone());
            collected.push(Field {
                name,
                ordinal,
                schema,
            });
        }

        collected.sort_by_key(|f| f.ordinal);
        Ok(Self::of(SchemaKind::Object(ObjectSchema { fields: collected })))
    }

    /// An object schema with no fields, for argument-less transitions.
    pub fn empty_object() -> Self {
        Self::of(SchemaKind::Object(ObjectSchema { fields: Vec::new() }))
    }

    /// Attach a description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Lower bound on array length. Ignored for non-array schemas.
    pub fn min_items(mut self, n: usize) -> Self {
        if let SchemaKind::Array(array) = &mut self.kind {
            array.min_items = Some(n);
        }
        self
    }

    /// Upper bound on array length. Ignored for non-array schemas.
    pub fn max_items(mut self, n: usize) -> Self {
        if let SchemaKind::Array(array) = &mut self.kind {
            array.max_items = Some(n);
        }
        self
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Tag name of this schema, as used in error messages.
    pub fn tag(&self) -> &'static str {
        match self.kind {
            SchemaKind::String => "string",
            SchemaKind::StringEnum(_) => "string_enum",
            SchemaKind::Integer => "integer",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object(_) => "object",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object(_))
    }

    /// Object fields in ordinal order; empty for every other tag.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            SchemaKind::Object(object) => object.fields(),
            _ => &[],
        }
    }
}
