//! OpenAI-compatible chunk decoding
//!
//! OpenAI, Mistral and most compatible gateways stream `chat.completion.chunk`
//! objects over SSE. Tool calls arrive as fragments keyed by `index`; the wire
//! format has no explicit per-call end marker, so a call is considered
//! complete when a different index starts streaming or the choice finishes.

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde_json::Value;

use super::events::{ChatStream, ChatStreamEvent, ToolCallDelta};
use crate::error::LlmError;
use crate::types::{FinishReason, Usage};

const DONE_MARKER: &str = "[DONE]";

/// Field names used by compatible providers for reasoning text.
const REASONING_FIELDS: [&str; 3] = ["reasoning_content", "reasoning", "thinking"];

/// Stateful decoder for one streamed response.
#[derive(Debug, Default)]
pub struct OpenAiChunkDecoder {
    started: bool,
    open_tool_call: Option<u32>,
}

impl OpenAiChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the `data` payload of one SSE event.
    pub fn decode(&mut self, data: &str) -> Result<Vec<ChatStreamEvent>, LlmError> {
        let data = data.trim();
        if data.is_empty() || data == DONE_MARKER {
            return Ok(Vec::new());
        }
        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| LlmError::ParseError(format!("Invalid chat completion chunk: {e}")))?;

        let mut events = Vec::new();

        if !self.started {
            let id = chunk.get("id").and_then(Value::as_str);
            let model = chunk.get("model").and_then(Value::as_str);
            if id.is_some() || model.is_some() {
                self.started = true;
                events.push(ChatStreamEvent::StreamStart {
                    id: id.map(str::to_owned),
                    model: model.map(str::to_owned),
                });
            }
        }

        if let Some(choice) = chunk
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        {
            self.decode_choice(choice, &mut events);
        }

        if let Some(usage) = chunk.get("usage").filter(|u| u.is_object()) {
            events.push(ChatStreamEvent::usage(parse_usage(usage)));
        }

        Ok(events)
    }

    /// Events owed at the end of the stream: the completion of a call that
    /// was still streaming when the transport closed.
    pub fn finish(&mut self) -> Vec<ChatStreamEvent> {
        self.open_tool_call
            .take()
            .map(|index| ChatStreamEvent::from(ToolCallDelta::completion(index)))
            .into_iter()
            .collect()
    }

    fn decode_choice(&mut self, choice: &Value, events: &mut Vec<ChatStreamEvent>) {
        if let Some(delta) = choice.get("delta") {
            if let Some(content) = delta.get("content").and_then(Value::as_str)
                && !content.is_empty()
            {
                events.push(ChatStreamEvent::content_delta(content));
            }

            if let Some(thinking) = REASONING_FIELDS
                .iter()
                .find_map(|field| delta.get(*field).and_then(Value::as_str))
                && !thinking.is_empty()
            {
                events.push(ChatStreamEvent::thinking_delta(thinking));
            }

            if let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) {
                for (position, tool_call) in tool_calls.iter().enumerate() {
                    self.decode_tool_call(position, tool_call, events);
                }
            }
        }

        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            events.extend(self.finish());
            events.push(ChatStreamEvent::finish(FinishReason::from_openai(reason)));
        }
    }

    fn decode_tool_call(
        &mut self,
        position: usize,
        tool_call: &Value,
        events: &mut Vec<ChatStreamEvent>,
    ) {
        // Some providers omit the index when every call arrives whole.
        let index = tool_call
            .get("index")
            .and_then(Value::as_u64)
            .and_then(|i| u32::try_from(i).ok())
            .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));

        if let Some(previous) = self.open_tool_call
            && previous != index
        {
            events.push(ToolCallDelta::completion(previous).into());
        }
        self.open_tool_call = Some(index);

        let function = tool_call.get("function");
        let text = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_owned);
        events.push(
            ToolCallDelta {
                index,
                id: text(tool_call.get("id")),
                function_name: text(function.and_then(|f| f.get("name"))),
                arguments_delta: text(function.and_then(|f| f.get("arguments"))),
                complete: false,
            }
            .into(),
        );
    }
}

fn parse_usage(usage: &Value) -> Usage {
    let count = |value: Option<&Value>| {
        value
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };
    Usage {
        input_tokens: count(usage.get("prompt_tokens")),
        output_tokens: count(usage.get("completion_tokens")),
        total_tokens: count(usage.get("total_tokens")),
        cached_tokens: count(usage.pointer("/prompt_tokens_details/cached_tokens")),
        reasoning_tokens: count(usage.pointer("/completion_tokens_details/reasoning_tokens")),
    }
}

/// Decode an SSE byte stream of chat completion chunks.
///
/// A malformed chunk yields a [`LlmError::ParseError`] item and later chunks
/// are still decoded; whether to read past it is up to the consumer, and
/// [`consume_stream`](super::consume_stream) stops at the first error. A
/// transport error yields [`LlmError::StreamError`] and ends the stream.
pub fn decode_sse_stream<S, B, E>(bytes: S) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut decoder = OpenAiChunkDecoder::new();
        let events = bytes.eventsource();
        futures::pin_mut!(events);
        let mut failed = false;

        while let Some(event) = events.next().await {
            match event {
                Ok(event) => match decoder.decode(&event.data) {
                    Ok(decoded) => {
                        for item in decoded {
                            yield Ok(item);
                        }
                    }
                    Err(error) => {
                        tracing::debug!("Undecodable chunk: {}", error);
                        yield Err(error);
                    }
                },
                Err(error) => {
                    yield Err(LlmError::StreamError(error.to_string()));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            for item in decoder.finish() {
                yield Ok(item);
            }
        }
    };
    Box::pin(stream)
}
