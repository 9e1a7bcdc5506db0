//! Streaming response aggregation
//!
//! [`StreamingResponseBuilder`] folds [`ChatStreamEvent`]s into a
//! [`ChatResponse`]. All state sits behind one mutex and every method takes
//! `&self`, so successive events may be delivered from different threads.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::events::{ChatStreamEvent, ToolCallDelta};
use super::tool_call::ToolCallAccumulator;
use crate::types::{
    ChatResponse, CompleteToolCall, FinishReason, PartialToolCall, ToolExecutionRequest, Usage,
};

/// Something a streaming observer should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamNotification {
    PartialResponse(String),
    PartialThinking(String),
    PartialToolCall(PartialToolCall),
    CompleteToolCall(CompleteToolCall),
}

/// Outcome of applying one [`ToolCallDelta`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallUpdate {
    pub partial: Option<PartialToolCall>,
    pub completed: Option<CompleteToolCall>,
}

impl ToolCallUpdate {
    fn into_notifications(self) -> Vec<StreamNotification> {
        self.partial
            .map(StreamNotification::PartialToolCall)
            .into_iter()
            .chain(self.completed.map(StreamNotification::CompleteToolCall))
            .collect()
    }
}

#[derive(Debug, Default)]
struct ResponseState {
    id: Option<String>,
    model: Option<String>,
    text: String,
    thinking: String,
    slots: BTreeMap<u32, ToolCallAccumulator>,
    /// Every request completed so far, in completion order
    completed: Vec<ToolExecutionRequest>,
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
}

impl ResponseState {
    fn complete_pending(&mut self) -> Vec<CompleteToolCall> {
        let calls: Vec<_> = self
            .slots
            .values_mut()
            .filter(|slot| slot.is_accumulating())
            .map(ToolCallAccumulator::build_and_reset)
            .collect();
        self.completed
            .extend(calls.iter().map(|call| call.request.clone()));
        calls
    }
}

/// Aggregates one streamed response.
#[derive(Debug, Default)]
pub struct StreamingResponseBuilder {
    state: Mutex<ResponseState>,
}

static_assertions::assert_impl_all!(StreamingResponseBuilder: Send, Sync);

impl StreamingResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        // A panicking observer never holds this lock, so the state is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append_text(&self, delta: &str) {
        self.state().text.push_str(delta);
    }

    pub fn append_thinking(&self, delta: &str) {
        self.state().thinking.push_str(delta);
    }

    /// Apply a tool-call fragment to the slot at its index, creating the slot
    /// on first sight.
    pub fn apply_tool_call_delta(&self, delta: ToolCallDelta) -> ToolCallUpdate {
        let mut guard = self.state();
        let state = &mut *guard;
        let slot = state
            .slots
            .entry(delta.index)
            .or_insert_with(|| ToolCallAccumulator::with_index(delta.index));

        slot.update_id(delta.id.as_deref());
        slot.update_name(delta.function_name.as_deref());

        let partial = delta
            .arguments_delta
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| {
                slot.append_arguments(Some(&fragment));
                PartialToolCall {
                    index: delta.index,
                    id: slot.id().map(str::to_owned),
                    name: slot.name().map(str::to_owned),
                    partial_arguments: fragment,
                }
            });

        let completed = (delta.complete && slot.is_accumulating()).then(|| slot.build_and_reset());
        if let Some(call) = &completed {
            state.completed.push(call.request.clone());
        }

        ToolCallUpdate { partial, completed }
    }

    /// Complete the call at `index`, if one is underway.
    pub fn complete_tool_call(&self, index: u32) -> Option<CompleteToolCall> {
        let mut guard = self.state();
        let state = &mut *guard;
        let slot = state.slots.get_mut(&index)?;
        let call = slot.is_accumulating().then(|| slot.build_and_reset())?;
        state.completed.push(call.request.clone());
        Some(call)
    }

    /// Complete every call still underway, in index order.
    pub fn complete_pending(&self) -> Vec<CompleteToolCall> {
        self.state().complete_pending()
    }

    pub fn record_usage(&self, usage: &Usage) {
        let mut state = self.state();
        match state.usage.as_mut() {
            Some(current) => current.merge(usage),
            None => state.usage = Some(usage.clone()),
        }
    }

    pub fn record_finish_reason(&self, finish_reason: FinishReason) {
        self.state().finish_reason = Some(finish_reason);
    }

    /// Remember response metadata. Later values replace earlier ones.
    pub fn record_metadata(&self, id: Option<&str>, model: Option<&str>) {
        let mut state = self.state();
        if let Some(id) = id {
            state.id = Some(id.to_string());
        }
        if let Some(model) = model {
            state.model = Some(model.to_string());
        }
    }

    /// Fold one event in and report what observers should hear about.
    pub fn process(&self, event: ChatStreamEvent) -> Vec<StreamNotification> {
        match event {
            ChatStreamEvent::StreamStart { id, model } => {
                self.record_metadata(id.as_deref(), model.as_deref());
                Vec::new()
            }
            ChatStreamEvent::ContentDelta { delta } if !delta.is_empty() => {
                self.append_text(&delta);
                vec![StreamNotification::PartialResponse(delta)]
            }
            ChatStreamEvent::ThinkingDelta { delta } if !delta.is_empty() => {
                self.append_thinking(&delta);
                vec![StreamNotification::PartialThinking(delta)]
            }
            ChatStreamEvent::ContentDelta { .. } | ChatStreamEvent::ThinkingDelta { .. } => {
                Vec::new()
            }
            ChatStreamEvent::ToolCallDelta(delta) => {
                self.apply_tool_call_delta(delta).into_notifications()
            }
            ChatStreamEvent::UsageUpdate { usage } => {
                self.record_usage(&usage);
                Vec::new()
            }
            ChatStreamEvent::StreamEnd { finish_reason } => {
                if let Some(finish_reason) = finish_reason {
                    self.record_finish_reason(finish_reason);
                }
                Vec::new()
            }
        }
    }

    /// Whether any tool call was completed or is underway.
    pub fn has_tool_calls(&self) -> bool {
        self.state().slots.values().any(ToolCallAccumulator::has_requests)
    }

    /// Build the response. Calls still underway are completed first, in
    /// index order.
    ///
    /// Requests appear in the order they were completed, which is the order
    /// observers were told about them.
    pub fn build(&self) -> ChatResponse {
        let mut state = self.state();
        state.complete_pending();

        let tool_execution_requests = state.completed.clone();
        let finish_reason = state.finish_reason.clone().or_else(|| {
            (!tool_execution_requests.is_empty()).then_some(FinishReason::ToolExecution)
        });

        ChatResponse {
            id: state.id.clone(),
            model: state.model.clone(),
            text: (!state.text.is_empty()).then(|| state.text.clone()),
            thinking: (!state.thinking.is_empty()).then(|| state.thinking.clone()),
            tool_execution_requests,
            usage: state.usage.clone(),
            finish_reason,
        }
    }
}
