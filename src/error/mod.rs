//! Error Handling Module
//!
//! This module provides the error type shared by the schema engine, the
//! streaming aggregation layer and the JSON extraction helpers:
//! - Core error types (`LlmError`, `ErrorCategory`)
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use unillm::error::{ErrorCategory, LlmError};
//!
//! let error = LlmError::UnsupportedSchema("raw".to_string());
//! assert_eq!(error.category(), ErrorCategory::Unsupported);
//! ```

mod conversions;
pub mod types;

pub use types::*;
