//! Streaming observers
//!
//! User code observes a streamed response through
//! [`StreamingChatResponseHandler`]. Observers are never allowed to break the
//! stream: every callback goes through a `notify_*` helper that catches both
//! returned errors and panics, logs them and hands them to
//! [`StreamingChatResponseHandler::on_error`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::builder::StreamNotification;
use crate::error::LlmError;
use crate::types::{ChatResponse, CompleteToolCall, PartialToolCall};

/// Callbacks for a streamed chat response.
///
/// Only the completion and error callbacks are mandatory.
pub trait StreamingChatResponseHandler: Send + Sync {
    fn on_partial_response(&self, _partial: &str) -> Result<(), LlmError> {
        Ok(())
    }

    fn on_partial_thinking(&self, _partial: &str) -> Result<(), LlmError> {
        Ok(())
    }

    fn on_partial_tool_call(&self, _call: &PartialToolCall) -> Result<(), LlmError> {
        Ok(())
    }

    fn on_complete_tool_call(&self, _call: &CompleteToolCall) -> Result<(), LlmError> {
        Ok(())
    }

    fn on_complete_response(&self, response: &ChatResponse) -> Result<(), LlmError>;

    fn on_error(&self, error: &LlmError) -> Result<(), LlmError>;
}

pub fn notify_partial_response<H>(handler: &H, partial: &str)
where
    H: StreamingChatResponseHandler + ?Sized,
{
    isolate(handler, "on_partial_response", || {
        handler.on_partial_response(partial)
    });
}

pub fn notify_partial_thinking<H>(handler: &H, partial: &str)
where
    H: StreamingChatResponseHandler + ?Sized,
{
    isolate(handler, "on_partial_thinking", || {
        handler.on_partial_thinking(partial)
    });
}

pub fn notify_partial_tool_call<H>(handler: &H, call: &PartialToolCall)
where
    H: StreamingChatResponseHandler + ?Sized,
{
    isolate(handler, "on_partial_tool_call", || {
        handler.on_partial_tool_call(call)
    });
}

pub fn notify_complete_tool_call<H>(handler: &H, call: &CompleteToolCall)
where
    H: StreamingChatResponseHandler + ?Sized,
{
    isolate(handler, "on_complete_tool_call", || {
        handler.on_complete_tool_call(call)
    });
}

pub fn notify_complete_response<H>(handler: &H, response: &ChatResponse)
where
    H: StreamingChatResponseHandler + ?Sized,
{
    isolate(handler, "on_complete_response", || {
        handler.on_complete_response(response)
    });
}

/// Deliver `error` to the handler. A failing `on_error` is only logged.
pub fn notify_error<H>(handler: &H, error: &LlmError)
where
    H: StreamingChatResponseHandler + ?Sized,
{
    match catch_unwind(AssertUnwindSafe(|| handler.on_error(error))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Streaming handler on_error failed: {}", e),
        Err(panic) => tracing::warn!(
            "Streaming handler on_error panicked: {}",
            panic_message(panic.as_ref())
        ),
    }
}

/// Route a builder notification to the matching callback.
pub fn dispatch<H>(handler: &H, notification: &StreamNotification)
where
    H: StreamingChatResponseHandler + ?Sized,
{
    match notification {
        StreamNotification::PartialResponse(partial) => notify_partial_response(handler, partial),
        StreamNotification::PartialThinking(partial) => notify_partial_thinking(handler, partial),
        StreamNotification::PartialToolCall(call) => notify_partial_tool_call(handler, call),
        StreamNotification::CompleteToolCall(call) => notify_complete_tool_call(handler, call),
    }
}

fn isolate<H, F>(handler: &H, callback: &str, f: F)
where
    H: StreamingChatResponseHandler + ?Sized,
    F: FnOnce() -> Result<(), LlmError>,
{
    let error = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(panic) => LlmError::HandlerError(format!(
            "{} panicked: {}",
            callback,
            panic_message(panic.as_ref())
        )),
    };
    tracing::warn!("Streaming handler {} failed: {}", callback, error);
    notify_error(handler, &error);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
