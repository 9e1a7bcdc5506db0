//! Tool call accumulation
//!
//! One [`ToolCallAccumulator`] per tool-call index collects the id, name and
//! argument fragments of a streamed call. Completing a call yields a
//! [`CompleteToolCall`] and resets the slot so the same index can carry a
//! later call.

use crate::types::{CompleteToolCall, ToolExecutionRequest};

/// Arguments reported for a call that streamed none.
pub const EMPTY_ARGUMENTS: &str = "{}";

/// Accumulates one streamed tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallAccumulator {
    index: u32,
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    requests: Vec<ToolExecutionRequest>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn update_index(&mut self, index: Option<u32>) {
        if let Some(index) = index {
            self.index = index;
        }
    }

    /// Blank values never replace an id that is already known.
    pub fn update_id(&mut self, id: Option<&str>) {
        if let Some(id) = non_blank(id) {
            self.id = Some(id.to_string());
        }
    }

    /// Blank values never replace a name that is already known.
    pub fn update_name(&mut self, name: Option<&str>) {
        if let Some(name) = non_blank(name) {
            self.name = Some(name.to_string());
        }
    }

    /// Append a raw argument fragment. Fragments are kept verbatim.
    pub fn append_arguments(&mut self, fragment: Option<&str>) {
        if let Some(fragment) = fragment {
            self.arguments.push_str(fragment);
        }
    }

    /// Finish the current call and reset the slot, keeping its index.
    pub fn build_and_reset(&mut self) -> CompleteToolCall {
        let arguments = if self.arguments.is_empty() {
            EMPTY_ARGUMENTS.to_string()
        } else {
            std::mem::take(&mut self.arguments)
        };
        let request = ToolExecutionRequest {
            id: self.id.take(),
            name: self.name.take(),
            arguments,
        };
        tracing::trace!(
            "Completed tool call {} ({:?})",
            self.index,
            request.name.as_deref()
        );
        self.requests.push(request.clone());
        CompleteToolCall {
            index: self.index,
            request,
        }
    }

    /// Whether a call was completed here or one is underway.
    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty() || self.name.is_some()
    }

    /// Whether anything has been received since the last reset.
    pub fn is_accumulating(&self) -> bool {
        self.id.is_some() || self.name.is_some() || !self.arguments.is_empty()
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    /// Every call completed in this slot, in completion order.
    pub fn all_requests(&self) -> &[ToolExecutionRequest] {
        &self.requests
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
