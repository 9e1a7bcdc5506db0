//! Shared data types

pub mod response;
pub mod tools;

pub use response::{ChatResponse, FinishReason, ResponseFormat, Usage};
pub use tools::{CompleteToolCall, PartialToolCall, ToolExecutionRequest, ToolSpecification};
