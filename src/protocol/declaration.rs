//! Lowering schemas into tool declarations.

use super::error::ProtocolError;
use crate::schema::{Schema, SchemaKind};
use serde::ser::Serializer;
use serde::Serialize;

/// Primitive type names of the function-calling wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// A schema lowered to the wire format.
///
/// For objects, `properties`, `required` and `property_ordering` all list
/// fields in the same ordinal order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSchema {
    #[serde(rename = "type")]
    pub kind: WireType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<WireSchema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_properties"
    )]
    pub properties: Option<Vec<(String, WireSchema)>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_ordering: Option<Vec<String>>,
}

impl WireSchema {
    fn primitive(kind: WireType, description: Option<&str>) -> Self {
        Self {
            kind,
            description: description.map(str::to_string),
            enum_values: None,
            format: None,
            items: None,
            min_items: None,
            max_items: None,
            properties: None,
            required: None,
            property_ordering: None,
        }
    }

    /// Property names in wire order; empty for non-objects.
    pub fn property_names(&self) -> Vec<&str> {
        self.properties
            .iter()
            .flatten()
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn serialize_properties<S>(
    properties: &Option<Vec<(String, WireSchema)>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match properties {
        Some(properties) => serializer.collect_map(properties.iter().map(|(k, v)| (k, v))),
        None => serializer.serialize_none(),
    }
}

/// Declaration of one callable tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: WireSchema,
}

/// Lower a schema to its wire representation.
///
/// `string_enum` lowers to a string annotated with its literal set, arrays
/// carry their cardinality, and objects list their fields by ordinal with
/// every field required.
pub fn lower(schema: &Schema) -> WireSchema {
    let description = schema.description();
    match schema.kind() {
        SchemaKind::String => WireSchema::primitive(WireType::String, description),
        SchemaKind::StringEnum(values) => WireSchema {
            enum_values: Some(values.clone()),
            format: Some("enum".to_string()),
            ..WireSchema::primitive(WireType::String, description)
        },
        SchemaKind::Integer => WireSchema::primitive(WireType::Integer, description),
        SchemaKind::Number => WireSchema::primitive(WireType::Number, description),
        SchemaKind::Boolean => WireSchema::primitive(WireType::Boolean, description),
        SchemaKind::Array(array) => WireSchema {
            items: Some(Box::new(lower(array.item()))),
            min_items: array.min_items(),
            max_items: array.max_items(),
            ..WireSchema::primitive(WireType::Array, description)
        },
        SchemaKind::Object(object) => {
            let properties: Vec<(String, WireSchema)> = object
                .fields()
                .iter()
                .map(|f| (f.name().to_string(), lower(f.schema())))
                .collect();
            let order: Vec<String> = object.field_names().map(str::to_string).collect();
            WireSchema {
                properties: Some(properties),
                required: Some(order.clone()),
                property_ordering: Some(order),
                ..WireSchema::primitive(WireType::Object, description)
            }
        }
    }
}

/// Build the tool declaration for one transition.
///
/// # Example
///
/// ```rust
/// use statecall::protocol::to_tool_declaration;
/// use statecall::schema::Schema;
///
/// let schema = Schema::object([("b", 1, Schema::integer()), ("a", 0, Schema::string())]).unwrap();
/// let declaration = to_tool_declaration("act", "Do something.", &schema).unwrap();
///
/// assert_eq!(declaration.parameters.property_names(), ["a", "b"]);
/// assert_eq!(declaration.parameters.required.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
/// ```
pub fn to_tool_declaration(
    name: &str,
    description: &str,
    schema: &Schema,
) -> Result<ToolDeclaration, ProtocolError> {
    if !schema.is_object() {
        return Err(ProtocolError::ParametersNotObject {
            name: name.to_string(),
            found: schema.tag(),
        });
    }

    Ok(ToolDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters: lower(schema),
    })
}
