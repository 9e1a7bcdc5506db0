//! Utility modules

pub mod cancel;
pub mod json;

pub use cancel::{CancelHandle, make_cancellable_stream};
pub use json::{ParsedJson, extract_and_parse_json, extract_json};
