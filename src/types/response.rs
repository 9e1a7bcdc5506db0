//! Aggregated chat responses

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tools::ToolExecutionRequest;
use crate::error::LlmError;
use crate::schema::{JsonSchema, to_wire_value};
use crate::utils::json::{ParsedJson, extract_json};

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end or a stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// The model requested tool execution
    ToolExecution,
    /// Output was filtered
    ContentFilter,
    /// Provider-specific reason, kept verbatim
    Other(String),
}

impl FinishReason {
    /// Map an OpenAI / Mistral `finish_reason`.
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" | "model_length" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolExecution,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }

    /// Map a Gemini `finishReason`.
    pub fn from_gemini(reason: &str) -> Self {
        match reason {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::Length,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
                Self::ContentFilter
            }
            other => Self::Other(other.to_string()),
        }
    }
}

/// Token usage. Providers report some or all of the counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

impl Usage {
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            total_tokens: Some(input_tokens.saturating_add(output_tokens)),
            cached_tokens: None,
            reasoning_tokens: None,
        }
    }

    /// Fold a later report into this one.
    ///
    /// Streaming providers report cumulative counts, so a count present in
    /// `other` replaces ours; absent counts are kept.
    pub fn merge(&mut self, other: &Usage) {
        fn take(mine: &mut Option<u32>, theirs: Option<u32>) {
            if theirs.is_some() {
                *mine = theirs;
            }
        }
        take(&mut self.input_tokens, other.input_tokens);
        take(&mut self.output_tokens, other.output_tokens);
        take(&mut self.total_tokens, other.total_tokens);
        take(&mut self.cached_tokens, other.cached_tokens);
        take(&mut self.reasoning_tokens, other.reasoning_tokens);
    }

    /// Reported total, or input plus output when no total was reported.
    /// The sum saturates at `u32::MAX`.
    pub fn total(&self) -> Option<u32> {
        self.total_tokens.or_else(|| match (self.input_tokens, self.output_tokens) {
            (Some(input), Some(output)) => Some(input.saturating_add(output)),
            _ => None,
        })
    }
}

/// The final, aggregated response of a chat call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_execution_requests: Vec<ToolExecutionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl ChatResponse {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn has_tool_execution_requests(&self) -> bool {
        !self.tool_execution_requests.is_empty()
    }

    /// Parse the JSON payload out of the response text.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<ParsedJson<T>, LlmError> {
        let text = self
            .text
            .as_deref()
            .ok_or_else(|| LlmError::ParseError("Response contains no text".to_string()))?;
        extract_json(text)
    }
}

/// Requested shape of the model's text output.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// JSON, optionally constrained by a schema
    Json(Option<JsonSchema>),
}

impl ResponseFormat {
    pub fn json_schema(schema: JsonSchema) -> Self {
        Self::Json(Some(schema))
    }

    /// OpenAI `response_format` value.
    pub fn to_openai_response_format(&self, strict: bool) -> Result<Value, LlmError> {
        let value = match self {
            Self::Text => serde_json::json!({"type": "text"}),
            Self::Json(None) => serde_json::json!({"type": "json_object"}),
            Self::Json(Some(schema)) => serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "strict": strict,
                    "schema": to_wire_value(&schema.root, strict)?,
                }
            }),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ObjectSchema, StringSchema};
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn usage_merge_keeps_latest_counts() {
        let mut usage = Usage {
            input_tokens: Some(10),
            ..Default::default()
        };
        usage.merge(&Usage {
            output_tokens: Some(5),
            ..Default::default()
        });
        usage.merge(&Usage::new(12, 7));
        assert_eq!(usage.input_tokens, Some(12));
        assert_eq!(usage.output_tokens, Some(7));
        assert_eq!(usage.total(), Some(19));
    }

    #[test]
    fn usage_sums_saturate() {
        let usage = Usage {
            input_tokens: Some(u32::MAX),
            output_tokens: Some(1),
            ..Default::default()
        };
        assert_eq!(usage.total(), Some(u32::MAX));
        assert_eq!(Usage::new(u32::MAX, 5).total_tokens, Some(u32::MAX));
    }

    #[test]
    fn finish_reasons() {
        assert_eq!(FinishReason::from_openai("tool_calls"), FinishReason::ToolExecution);
        assert_eq!(FinishReason::from_gemini("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(
            FinishReason::from_openai("weird"),
            FinishReason::Other("weird".to_string())
        );
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        value: i32,
    }

    #[test]
    fn parse_json_from_prose() {
        let response = ChatResponse {
            text: Some("Sure! {\"value\": 42}".to_string()),
            ..Default::default()
        };
        let parsed = response.parse_json::<Answer>().unwrap();
        assert_eq!(parsed.value, Answer { value: 42 });
        assert_eq!(parsed.json, "{\"value\": 42}");

        let empty = ChatResponse::default();
        assert!(matches!(
            empty.parse_json::<Answer>(),
            Err(LlmError::ParseError(_))
        ));
    }

    #[test]
    fn json_schema_response_format() {
        let format = ResponseFormat::json_schema(JsonSchema::new(
            "answer",
            ObjectSchema::new().required_property("text", StringSchema::new()),
        ));
        assert_eq!(
            format.to_openai_response_format(true).unwrap(),
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "answer",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {"text": {"type": "string"}},
                        "required": ["text"],
                        "additionalProperties": false
                    }
                }
            })
        );
        assert_eq!(
            ResponseFormat::Json(None).to_openai_response_format(false).unwrap(),
            json!({"type": "json_object"})
        );
    }
}
