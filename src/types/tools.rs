//! Tool calling types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::LlmError;
use crate::schema::{
    Describe, ObjectSchema, SchemaElement, SchemaGenerator, to_gemini_schema, to_wire_value,
};

/// A tool invocation requested by the model.
///
/// `arguments` is the raw JSON text exactly as streamed; it is never parsed or
/// validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecutionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub arguments: String,
}

impl ToolExecutionRequest {
    pub fn new(
        id: Option<String>,
        name: Option<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name,
            arguments: arguments.into(),
        }
    }

    /// Parse the arguments as JSON.
    pub fn arguments_json(&self) -> Result<Value, LlmError> {
        Ok(serde_json::from_str(&self.arguments)?)
    }
}

/// A finished tool call, as reported to streaming observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteToolCall {
    pub index: u32,
    pub request: ToolExecutionRequest,
}

/// A fragment of a tool call's arguments, as reported to streaming observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialToolCall {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub partial_arguments: String,
}

/// Description of a tool the model may call.
///
/// ```rust,ignore
/// let spec = ToolSpecification::new("get_weather")
///     .with_description("Current weather for a city")
///     .parameters_from::<WeatherQuery>();
/// let wire = spec.to_openai_tool(true)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpecification {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Option<SchemaElement>,
}

impl ToolSpecification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameters(mut self, parameters: impl Into<SchemaElement>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    /// Generate the parameter schema from `T`, with definitions for
    /// recursive types.
    pub fn parameters_from<T: Describe + ?Sized>(self) -> Self {
        let parameters = SchemaGenerator::new().root_schema_for::<T>();
        self.with_parameters(parameters)
    }

    /// OpenAI / Mistral `tools[]` entry. `strict` is only emitted when set.
    pub fn to_openai_tool(&self, strict: bool) -> Result<Value, LlmError> {
        let parameters = match &self.parameters {
            Some(parameters) => to_wire_value(parameters, strict)?,
            None => to_wire_value(&ObjectSchema::new().into(), strict)?,
        };

        let mut function = Map::new();
        function.insert("name".to_string(), json!(self.name));
        if let Some(description) = &self.description {
            function.insert("description".to_string(), json!(description));
        }
        function.insert("parameters".to_string(), parameters);
        if strict {
            function.insert("strict".to_string(), Value::Bool(true));
        }

        Ok(json!({
            "type": "function",
            "function": function,
        }))
    }

    /// Gemini `functionDeclarations[]` entry.
    pub fn to_gemini_function_declaration(&self) -> Result<Value, LlmError> {
        let mut declaration = Map::new();
        declaration.insert("name".to_string(), json!(self.name));
        if let Some(description) = &self.description {
            declaration.insert("description".to_string(), json!(description));
        }
        if let Some(parameters) = &self.parameters {
            let schema = to_gemini_schema(parameters)?;
            declaration.insert("parameters".to_string(), serde_json::to_value(schema)?);
        }
        Ok(Value::Object(declaration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StringSchema;

    #[test]
    fn openai_tool_without_parameters_uses_empty_object() {
        let tool = ToolSpecification::new("ping").to_openai_tool(false).unwrap();
        assert_eq!(
            tool,
            json!({
                "type": "function",
                "function": {
                    "name": "ping",
                    "parameters": {"type": "object", "properties": {}}
                }
            })
        );
    }

    #[test]
    fn strict_openai_tool() {
        let tool = ToolSpecification::new("lookup")
            .with_description("Look something up")
            .with_parameters(ObjectSchema::new().required_property("query", StringSchema::new()))
            .to_openai_tool(true)
            .unwrap();
        assert_eq!(tool["function"]["strict"], json!(true));
        assert_eq!(
            tool["function"]["parameters"],
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn gemini_declaration() {
        let declaration = ToolSpecification::new("lookup")
            .with_parameters(ObjectSchema::new().string_property("query", "Search text"))
            .to_gemini_function_declaration()
            .unwrap();
        assert_eq!(
            declaration,
            json!({
                "name": "lookup",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {"query": {"type": "STRING", "description": "Search text"}}
                }
            })
        );
    }

    #[test]
    fn arguments_json_reports_malformed_text() {
        let request = ToolExecutionRequest::new(None, Some("f".into()), "{\"a\":");
        assert!(matches!(request.arguments_json(), Err(LlmError::JsonError(_))));
    }
}
