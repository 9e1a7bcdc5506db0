//! JSON Schema wire maps
//!
//! Lowers a [`SchemaElement`] into the ordered JSON map sent to OpenAI-style
//! providers. In strict mode every property is listed as required, optional
//! properties become nullable (`["<type>", "null"]`) and objects reject
//! additional properties.

use serde_json::{Map, Value, json};

use super::element::SchemaElement;
use crate::error::LlmError;

/// Ordered JSON object produced by the serializers.
pub type WireMap = Map<String, Value>;

/// Lower `element` into a wire map.
///
/// `required_in_parent` tells whether the enclosing object lists this element
/// as required; in strict mode an element that is not becomes nullable. Array
/// items, `anyOf` alternatives and definitions are always treated as required.
pub fn to_wire_map(
    element: &SchemaElement,
    strict: bool,
    required_in_parent: bool,
) -> Result<WireMap, LlmError> {
    let mut map = Map::new();
    let put_type = |map: &mut WireMap, ty: &str| {
        let value = if strict && !required_in_parent {
            json!([ty, "null"])
        } else {
            Value::String(ty.to_string())
        };
        map.insert("type".to_string(), value);
    };

    match element {
        SchemaElement::Object(object) => {
            put_type(&mut map, "object");
            put_description(&mut map, element.description());

            let mut properties = Map::new();
            for (name, property) in object.properties() {
                let lowered = to_wire_map(property, strict, object.is_required(name))?;
                properties.insert(name.clone(), Value::Object(lowered));
            }
            map.insert("properties".to_string(), Value::Object(properties));

            if strict {
                let all: Vec<&str> = object.property_names().collect();
                map.insert("required".to_string(), json!(all));
            } else if !object.required().is_empty() {
                map.insert("required".to_string(), json!(object.required()));
            }
            if strict {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            if !object.definitions().is_empty() {
                let mut definitions = Map::new();
                for (reference, definition) in object.definitions() {
                    let lowered = to_wire_map(definition, strict, true)?;
                    definitions.insert(reference.clone(), Value::Object(lowered));
                }
                map.insert("$defs".to_string(), Value::Object(definitions));
            }
        }
        SchemaElement::Array(array) => {
            put_type(&mut map, "array");
            put_description(&mut map, element.description());
            let items = to_wire_map(&array.items, strict, true)?;
            map.insert("items".to_string(), Value::Object(items));
        }
        SchemaElement::Enum(e) => {
            put_type(&mut map, "string");
            put_description(&mut map, element.description());
            map.insert("enum".to_string(), json!(e.values));
        }
        SchemaElement::String(_) => {
            put_type(&mut map, "string");
            put_description(&mut map, element.description());
        }
        SchemaElement::Integer(_) => {
            put_type(&mut map, "integer");
            put_description(&mut map, element.description());
        }
        SchemaElement::Number(_) => {
            put_type(&mut map, "number");
            put_description(&mut map, element.description());
        }
        SchemaElement::Boolean(_) => {
            put_type(&mut map, "boolean");
            put_description(&mut map, element.description());
        }
        SchemaElement::Reference(reference) => {
            map.insert(
                "$ref".to_string(),
                Value::String(format!("#/$defs/{}", reference.reference)),
            );
        }
        SchemaElement::AnyOf(any_of) => {
            put_description(&mut map, element.description());
            let variants = any_of
                .variants
                .iter()
                .map(|variant| to_wire_map(variant, strict, true).map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;
            map.insert("anyOf".to_string(), Value::Array(variants));
        }
        SchemaElement::Null => {
            map.insert("type".to_string(), Value::String("null".to_string()));
        }
        SchemaElement::Raw(_) => return Err(LlmError::unsupported_schema(element.kind())),
    }

    Ok(map)
}

/// [`to_wire_map`] for a root element, as a [`Value`].
pub fn to_wire_value(element: &SchemaElement, strict: bool) -> Result<Value, LlmError> {
    to_wire_map(element, strict, true).map(Value::Object)
}

fn put_description(map: &mut WireMap, description: Option<&str>) {
    if let Some(description) = description {
        map.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
    }
}
