//! # unillm
//!
//! Provider-agnostic core of a unified LLM client.
//!
//! The crate covers the parts of a multi-provider SDK that are not plain data
//! shapes:
//!
//! - **`schema`** - describe Rust types, generate a schema element graph with
//!   cycle detection, and lower it into provider wire maps (JSON Schema with an
//!   optional strict mode, Gemini / Vertex AI dialect).
//! - **`streaming`** - accumulate partial text, thinking and tool-call deltas
//!   into complete tool execution requests and a final response, isolating
//!   misbehaving observers from the producer.
//! - **`utils::json`** - recover a JSON payload embedded in free-form model
//!   output.
//!
//! ## Example
//!
//! ```rust,ignore
//! use unillm::schema::{Describe, FieldDescriptor, ObjectDescriptor, SchemaGenerator, TypeDescriptor};
//!
//! struct Person {
//!     name: String,
//!     children: Vec<Person>,
//! }
//!
//! impl Describe for Person {
//!     fn describe() -> TypeDescriptor {
//!         ObjectDescriptor::of::<Self>()
//!             .field(FieldDescriptor::new::<String>("name").required(true))
//!             .field(FieldDescriptor::new::<Vec<Person>>("children"))
//!             .into()
//!     }
//! }
//!
//! let schema = SchemaGenerator::new().root_schema_for::<Person>();
//! let wire = unillm::schema::to_wire_value(&schema, true)?;
//! ```
#![deny(unsafe_code)]

pub mod error;
pub mod schema;
pub mod streaming;
pub mod telemetry;
pub mod types;
pub mod utils;

pub use error::{LlmError, Result};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::error::{ErrorCategory, LlmError};
    pub use crate::schema::{
        Describe, FieldDescriptor, JsonSchema, ObjectDescriptor, SchemaElement, SchemaGenerator,
        TypeDescriptor,
    };
    pub use crate::streaming::{
        ChatStreamEvent, StreamingChatResponseHandler, StreamingResponseBuilder,
        ToolCallAccumulator, consume_stream,
    };
    pub use crate::types::{
        ChatResponse, CompleteToolCall, FinishReason, PartialToolCall, ResponseFormat,
        ToolExecutionRequest, ToolSpecification, Usage,
    };
    pub use crate::utils::json::{ParsedJson, extract_and_parse_json, extract_json};
}
