//! Schemas tied to the Rust type of the value they describe.

use super::decode::{decode, into_result, DecodeError, DecodeErrorKind};
use super::types::{Schema, SchemaError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// A [`Schema`] paired with its inferred value type `T`.
///
/// The constructors only produce combinations that agree: `string` and
/// `string_enum` infer `String`, `integer` infers `i64`, `number` infers
/// `f64`, `boolean` infers `bool`, and `array` infers `Vec` of the item's
/// type. Record types are declared with [`transition_args!`](crate::transition_args),
/// which derives the struct and its object schema from one definition.
///
/// # Example
///
/// ```rust
/// use statecall::schema::Typed;
/// use serde_json::json;
///
/// let amounts: Typed<Vec<i64>> = Typed::array(Typed::integer()).max_items(3);
/// assert_eq!(amounts.decode(&json!([1, 2.0])).unwrap(), vec![1, 2]);
/// assert!(amounts.decode(&json!([1, 2, 3, 4])).is_err());
/// ```
pub struct Typed<T> {
    schema: Schema,
    _infer: PhantomData<fn() -> T>,
}

impl<T> Typed<T> {
    fn wrap(schema: Schema) -> Self {
        Self {
            schema,
            _infer: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_schema(self) -> Schema {
        self.schema
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        Self::wrap(self.schema.describe(description))
    }

    /// Object schema whose ordinals follow the order `fields` are given in.
    ///
    /// Used by [`transition_args!`](crate::transition_args); struct field
    /// names are unique, so ordinals assigned by position cannot collide.
    ///
    /// # Panics
    ///
    /// Panics if two fields share a name.
    #[doc(hidden)]
    pub fn from_declared_fields(fields: Vec<(&'static str, Schema)>) -> Self {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(i, (name, schema))| (name, i as u32, schema));
        match Schema::object(fields) {
            Ok(schema) => Self::wrap(schema),
            Err(err) => unreachable!("declared struct fields must be unique: {err}"),
        }
    }
}

impl<T: DeserializeOwned> Typed<T> {
    /// Object schema for a record type the caller vouches for.
    ///
    /// Prefer [`transition_args!`](crate::transition_args), which checks the
    /// field types at compile time. This constructor exists for records
    /// whose ordinals must differ from declaration order.
    pub fn object<I, N>(fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (N, u32, Schema)>,
        N: Into<String>,
    {
        Schema::object(fields).map(Self::wrap)
    }

    /// Validate `raw` against the schema, then deserialize it into `T`.
    pub fn decode(&self, raw: &Value) -> Result<T, Vec<DecodeError>> {
        let normalized = into_result(decode(&self.schema, raw))?;
        serde_json::from_value(normalized).map_err(|e| {
            vec![DecodeError::new(
                "$",
                DecodeErrorKind::Deserialize(e.to_string()),
            )]
        })
    }
}

impl Typed<String> {
    pub fn string() -> Self {
        Self::wrap(Schema::string())
    }

    pub fn string_enum<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::wrap(Schema::string_enum(values))
    }
}

impl Typed<i64> {
    pub fn integer() -> Self {
        Self::wrap(Schema::integer())
    }
}

impl Typed<f64> {
    pub fn number() -> Self {
        Self::wrap(Schema::number())
    }
}

impl Typed<bool> {
    pub fn boolean() -> Self {
        Self::wrap(Schema::boolean())
    }
}

impl<T> Typed<Vec<T>> {
    pub fn array(item: Typed<T>) -> Self {
        Self::wrap(Schema::array(item.schema))
    }

    pub fn min_items(self, n: usize) -> Self {
        Self::wrap(self.schema.min_items(n))
    }

    pub fn max_items(self, n: usize) -> Self {
        Self::wrap(self.schema.max_items(n))
    }
}

impl Typed<Value> {
    /// Untyped escape hatch: decodes to the normalized JSON value.
    pub fn dynamic(schema: Schema) -> Self {
        Self::wrap(schema)
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self::wrap(self.schema.clone())
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typed")
            .field("type", &std::any::type_name::<T>())
            .field("schema", &self.schema)
            .finish()
    }
}
