//! Streaming events
//!
//! Provider decoders translate wire chunks into [`ChatStreamEvent`]s; the
//! aggregation layer consumes them without knowing which provider produced
//! them.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::{FinishReason, Usage};

/// Stream of decoded events.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, LlmError>> + Send>>;

/// One incremental event of a streamed chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatStreamEvent {
    /// Response metadata, usually from the first chunk
    StreamStart {
        id: Option<String>,
        model: Option<String>,
    },
    /// Incremental answer text
    ContentDelta { delta: String },
    /// Incremental reasoning text
    ThinkingDelta { delta: String },
    /// Fragment of a tool call and/or its completion signal
    ToolCallDelta(ToolCallDelta),
    /// Token usage report
    UsageUpdate { usage: Usage },
    /// The provider reported the end of generation
    StreamEnd { finish_reason: Option<FinishReason> },
}

impl ChatStreamEvent {
    pub fn content_delta(delta: impl Into<String>) -> Self {
        Self::ContentDelta {
            delta: delta.into(),
        }
    }

    pub fn thinking_delta(delta: impl Into<String>) -> Self {
        Self::ThinkingDelta {
            delta: delta.into(),
        }
    }

    pub fn usage(usage: Usage) -> Self {
        Self::UsageUpdate { usage }
    }

    pub fn finish(finish_reason: FinishReason) -> Self {
        Self::StreamEnd {
            finish_reason: Some(finish_reason),
        }
    }
}

impl From<ToolCallDelta> for ChatStreamEvent {
    fn from(delta: ToolCallDelta) -> Self {
        Self::ToolCallDelta(delta)
    }
}

/// A partial tool call, addressed by its index among the calls of one response.
///
/// Every field except `index` is optional: providers typically send the id and
/// name once, then argument fragments, and signal completion separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    pub function_name: Option<String>,
    pub arguments_delta: Option<String>,
    /// The call at `index` is finished once this fragment is applied
    pub complete: bool,
}

impl ToolCallDelta {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Completion signal with no payload.
    pub fn completion(index: u32) -> Self {
        Self::new(index).completed()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments_delta = Some(arguments.into());
        self
    }

    pub fn completed(mut self) -> Self {
        self.complete = true;
        self
    }
}
