//! Core error types.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors produced by the schema engine, streaming aggregation and JSON helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// A schema element has no lowering rule for the requested wire format.
    #[error("Unsupported schema kind: {0}")]
    UnsupportedSchema(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// A provider payload could not be interpreted.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A JSON instance does not satisfy its schema.
    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    /// A wire map could not be compiled into a validator.
    #[error("Schema compilation error: {0}")]
    SchemaCompilation(String),

    /// The underlying stream reported a failure.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// A streaming observer failed while being notified.
    #[error("Handler error: {0}")]
    HandlerError(String),

    /// The tracing subscriber could not be installed.
    #[error("Telemetry initialization error: {0}")]
    TelemetryInit(String),
}

/// Coarse-grained classification of [`LlmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Payload parsing or serialization
    Parsing,
    /// Schema compilation or validation
    Validation,
    /// Requested feature has no implementation for the target
    Unsupported,
    /// Transport / stream level failure
    Stream,
    /// Caller-supplied observer failure
    Handler,
    /// Configuration of the crate itself
    Configuration,
}

impl LlmError {
    /// Classify the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::JsonError(_) | Self::ParseError(_) => ErrorCategory::Parsing,
            Self::SchemaValidation(_) | Self::SchemaCompilation(_) => ErrorCategory::Validation,
            Self::UnsupportedSchema(_) => ErrorCategory::Unsupported,
            Self::StreamError(_) => ErrorCategory::Stream,
            Self::HandlerError(_) => ErrorCategory::Handler,
            Self::TelemetryInit(_) => ErrorCategory::Configuration,
        }
    }

    /// Shorthand for an unsupported schema kind.
    pub fn unsupported_schema(kind: impl Into<String>) -> Self {
        Self::UnsupportedSchema(kind.into())
    }
}
