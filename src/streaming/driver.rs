//! Stream consumption
//!
//! Drives a stream of [`ChatStreamEvent`]s through a
//! [`StreamingResponseBuilder`] and notifies a handler along the way.

use futures::{Stream, StreamExt};

use super::builder::StreamingResponseBuilder;
use super::events::ChatStreamEvent;
use super::handler::{
    StreamingChatResponseHandler, dispatch, notify_complete_response, notify_complete_tool_call,
    notify_error,
};
use crate::error::LlmError;
use crate::types::ChatResponse;
use crate::utils::cancel::CancelHandle;

/// Consume `stream` to the end and return the aggregated response.
///
/// - A failing handler never interrupts consumption.
/// - An error item from the stream, including a malformed chunk reported by
///   the decoder, is passed to `on_error` and ends consumption with that
///   error.
/// - Cancellation ends consumption with [`LlmError::StreamError`] without
///   notifying the handler.
/// - At the end of the stream, calls still underway are completed and
///   `on_complete_response` receives the response.
pub async fn consume_stream<S, H>(
    stream: S,
    handler: &H,
    cancel: Option<&CancelHandle>,
) -> Result<ChatResponse, LlmError>
where
    S: Stream<Item = Result<ChatStreamEvent, LlmError>>,
    H: StreamingChatResponseHandler + ?Sized,
{
    let builder = StreamingResponseBuilder::new();
    let is_cancelled = || cancel.is_some_and(CancelHandle::is_cancelled);
    futures::pin_mut!(stream);

    let mut events = 0usize;
    loop {
        if is_cancelled() {
            tracing::debug!("Stream consumption cancelled after {} events", events);
            return Err(LlmError::StreamError("Stream cancelled".to_string()));
        }
        let Some(item) = stream.next().await else {
            break;
        };
        match item {
            Ok(event) => {
                events += 1;
                tracing::trace!("Stream event: {:?}", event);
                for notification in builder.process(event) {
                    dispatch(handler, &notification);
                }
            }
            Err(error) => {
                tracing::warn!("Stream failed after {} events: {}", events, error);
                notify_error(handler, &error);
                return Err(error);
            }
        }
    }
    if is_cancelled() {
        return Err(LlmError::StreamError("Stream cancelled".to_string()));
    }

    for call in builder.complete_pending() {
        notify_complete_tool_call(handler, &call);
    }
    let response = builder.build();
    tracing::debug!(
        "Stream finished: {} events, {} tool calls",
        events,
        response.tool_execution_requests.len()
    );
    notify_complete_response(handler, &response);
    Ok(response)
}
