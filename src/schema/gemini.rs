//! Gemini / Vertex AI schema dialect
//!
//! Gemini accepts an OpenAPI-flavoured subset of JSON Schema with upper-case
//! type names. It has no notion of `$ref`, so reference elements (and raw
//! schemas) cannot be lowered.

use serde::{Serialize, Serializer};

use super::element::{JsonSchema, SchemaElement};
use crate::error::LlmError;

/// Gemini schema type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeminiType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

/// Schema object in Gemini's `Schema` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiSchema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<GeminiType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<GeminiSchema>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_properties"
    )]
    pub properties: Option<Vec<(String, GeminiSchema)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<GeminiSchema>>,
}

impl GeminiSchema {
    fn typed(schema_type: GeminiType, description: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type),
            description: description.map(str::to_owned),
            ..Default::default()
        }
    }

    pub fn get_property(&self, name: &str) -> Option<&GeminiSchema> {
        self.properties
            .as_ref()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }
}

fn serialize_properties<S: Serializer>(
    properties: &Option<Vec<(String, GeminiSchema)>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match properties {
        Some(properties) => serializer.collect_map(properties.iter().map(|(k, v)| (k, v))),
        None => serializer.serialize_none(),
    }
}

/// Lower `element` into Gemini's schema dialect.
pub fn to_gemini_schema(element: &SchemaElement) -> Result<GeminiSchema, LlmError> {
    let description = element.description();
    let schema = match element {
        SchemaElement::String(_) => GeminiSchema::typed(GeminiType::String, description),
        SchemaElement::Integer(_) => GeminiSchema::typed(GeminiType::Integer, description),
        SchemaElement::Number(_) => GeminiSchema::typed(GeminiType::Number, description),
        SchemaElement::Boolean(_) => GeminiSchema::typed(GeminiType::Boolean, description),
        SchemaElement::Enum(e) => GeminiSchema {
            enumeration: Some(e.values.clone()),
            ..GeminiSchema::typed(GeminiType::String, description)
        },
        SchemaElement::Array(array) => GeminiSchema {
            items: Some(Box::new(to_gemini_schema(&array.items)?)),
            ..GeminiSchema::typed(GeminiType::Array, description)
        },
        SchemaElement::Object(object) => {
            let properties = object
                .properties()
                .iter()
                .map(|(name, property)| Ok((name.clone(), to_gemini_schema(property)?)))
                .collect::<Result<Vec<_>, LlmError>>()?;
            let required = (!object.required().is_empty()).then(|| object.required().to_vec());
            GeminiSchema {
                properties: Some(properties),
                required,
                ..GeminiSchema::typed(GeminiType::Object, description)
            }
        }
        SchemaElement::AnyOf(any_of) => GeminiSchema {
            description: description.map(str::to_owned),
            any_of: Some(
                any_of
                    .variants
                    .iter()
                    .map(to_gemini_schema)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            ..Default::default()
        },
        SchemaElement::Null => GeminiSchema::typed(GeminiType::Null, None),
        SchemaElement::Reference(_) | SchemaElement::Raw(_) => {
            return Err(LlmError::unsupported_schema(element.kind()));
        }
    };
    Ok(schema)
}

/// Lower the root of a named schema.
pub fn json_schema_to_gemini(schema: &JsonSchema) -> Result<GeminiSchema, LlmError> {
    to_gemini_schema(&schema.root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::element::{
        AnyOfSchema, ArraySchema, EnumSchema, NumberSchema, ObjectSchema, RawSchema,
        ReferenceSchema, StringSchema,
    };
    use serde_json::json;

    fn weather_tool() -> SchemaElement {
        ObjectSchema::new()
            .with_description("Weather forecast tool")
            .string_property("location", "City or address to check weather for")
            .integer_property("days", "Number of days to forecast")
            .property(
                "units",
                EnumSchema::new(["celsius", "fahrenheit"]).with_description("Temperature units"),
            )
            .property(
                "features",
                ArraySchema::new(StringSchema::new()).with_description("Data features"),
            )
            .property(
                "options",
                ObjectSchema::new()
                    .boolean_property("includeHourly", "Include hourly breakdown")
                    .boolean_property("includeAlerts", "Include weather alerts")
                    .with_required(["includeHourly"]),
            )
            .with_required(["location", "days"])
            .into()
    }

    #[test]
    fn maps_nested_objects() {
        let schema = to_gemini_schema(&weather_tool()).unwrap();
        assert_eq!(schema.schema_type, Some(GeminiType::Object));
        assert_eq!(schema.properties.as_ref().map(Vec::len), Some(5));
        assert_eq!(
            schema.required,
            Some(vec!["location".to_string(), "days".to_string()])
        );

        let features = schema.get_property("features").unwrap();
        assert_eq!(features.schema_type, Some(GeminiType::Array));
        assert_eq!(
            features.items.as_ref().unwrap().schema_type,
            Some(GeminiType::String)
        );
        let options = schema.get_property("options").unwrap();
        assert_eq!(options.required, Some(vec!["includeHourly".to_string()]));
    }

    #[test]
    fn serializes_with_upper_case_types_in_declared_order() {
        let schema = to_gemini_schema(&weather_tool()).unwrap();
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value["properties"]["units"],
            json!({"type": "STRING", "description": "Temperature units", "enum": ["celsius", "fahrenheit"]})
        );
        let names: Vec<&String> = value["properties"].as_object().unwrap().keys().collect();
        assert_eq!(names, ["location", "days", "units", "features", "options"]);
    }

    #[test]
    fn maps_any_of_and_null() {
        let element: SchemaElement = AnyOfSchema::new([
            SchemaElement::from(StringSchema::new()),
            NumberSchema::new().into(),
        ])
        .with_description("String or number")
        .into();
        let schema = to_gemini_schema(&element).unwrap();
        assert_eq!(schema.schema_type, None);
        let variants = schema.any_of.unwrap();
        assert_eq!(variants[0].schema_type, Some(GeminiType::String));
        assert_eq!(variants[1].schema_type, Some(GeminiType::Number));

        let null = to_gemini_schema(&SchemaElement::Null).unwrap();
        assert_eq!(serde_json::to_value(null).unwrap(), json!({"type": "NULL"}));
    }

    #[test]
    fn named_schema_lowers_its_root() {
        let named = JsonSchema::new("weather", weather_tool());
        let schema = json_schema_to_gemini(&named).unwrap();
        assert_eq!(schema, to_gemini_schema(&weather_tool()).unwrap());
        assert_eq!(schema.description.as_deref(), Some("Weather forecast tool"));

        let recursive = JsonSchema::new(
            "node",
            ObjectSchema::new().property("next", ReferenceSchema::new("abc")),
        );
        assert_eq!(
            json_schema_to_gemini(&recursive),
            Err(LlmError::UnsupportedSchema("reference".to_string()))
        );
    }

    #[test]
    fn references_and_raw_schemas_are_unsupported() {
        let reference: SchemaElement = ReferenceSchema::new("abc").into();
        let raw: SchemaElement = RawSchema::new("{ \"type\": \"string\" }").into();
        assert!(matches!(
            to_gemini_schema(&reference),
            Err(LlmError::UnsupportedSchema(_))
        ));
        assert!(matches!(
            to_gemini_schema(&raw),
            Err(LlmError::UnsupportedSchema(_))
        ));
    }
}
