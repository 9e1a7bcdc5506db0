//! Streaming aggregation
//!
//! Partial text, thinking and tool-call deltas flow from a provider decoder
//! ([`sse`]) through a [`StreamingResponseBuilder`] into complete tool
//! execution requests and a final [`crate::types::ChatResponse`], while a
//! [`StreamingChatResponseHandler`] observes the progress.

pub mod builder;
pub mod driver;
pub mod events;
pub mod handler;
pub mod sse;
pub mod tool_call;

pub use builder::{StreamNotification, StreamingResponseBuilder, ToolCallUpdate};
pub use driver::consume_stream;
pub use events::{ChatStream, ChatStreamEvent, ToolCallDelta};
pub use handler::{
    StreamingChatResponseHandler, dispatch, notify_complete_response, notify_complete_tool_call,
    notify_error, notify_partial_response, notify_partial_thinking, notify_partial_tool_call,
};
pub use sse::{OpenAiChunkDecoder, decode_sse_stream};
pub use tool_call::{EMPTY_ARGUMENTS, ToolCallAccumulator};
