//! JSON Schema validation
//!
//! Compiles a lowered wire map once and validates model output against it.
//!
//! ```rust,ignore
//! use unillm::schema::{JsonSchemaValidator, SchemaValidator};
//!
//! let validator = JsonSchemaValidator::from_element(&element, true)?;
//! validator.validate(&serde_json::json!({"name": "Ada"}))?;
//! ```

use serde_json::Value;

use super::element::SchemaElement;
use super::wire::to_wire_value;
use crate::error::LlmError;

/// Number of validation messages kept in an error.
const MAX_REPORTED_ERRORS: usize = 3;

/// Validates JSON instances against a schema.
pub trait SchemaValidator: Send + Sync {
    /// `Err(LlmError::SchemaValidation)` when `instance` does not conform.
    fn validate(&self, instance: &Value) -> Result<(), LlmError>;

    fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_ok()
    }
}

/// A compiled, reusable validator backed by the `jsonschema` crate.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compile a wire-format schema.
    pub fn new(schema: &Value) -> Result<Self, LlmError> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| LlmError::SchemaCompilation(format!("Invalid JSON Schema: {}", e)))?;

        Ok(Self { validator })
    }

    /// Lower `element` and compile the result.
    pub fn from_element(element: &SchemaElement, strict: bool) -> Result<Self, LlmError> {
        Self::new(&to_wire_value(element, strict)?)
    }

    /// Like [`SchemaValidator::validate`], but reports every error.
    pub fn validate_detailed(&self, instance: &Value) -> Result<(), LlmError> {
        let msgs: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|err| format!("{} at {}", err, err.instance_path))
            .collect();

        if !msgs.is_empty() {
            return Err(LlmError::SchemaValidation(msgs.join("; ")));
        }
        Ok(())
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, instance: &Value) -> Result<(), LlmError> {
        if self.validator.is_valid(instance) {
            return Ok(());
        }
        let msgs: Vec<String> = self
            .validator
            .iter_errors(instance)
            .take(MAX_REPORTED_ERRORS)
            .map(|err| format!("{} at {}", err, err.instance_path))
            .collect();
        Err(LlmError::SchemaValidation(msgs.join("; ")))
    }

    fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

/// One-shot validation of `instance` against a wire-format schema.
pub fn validate_json(schema: &Value, instance: &Value) -> Result<(), LlmError> {
    if !schema.is_object() {
        return Ok(());
    }
    JsonSchemaValidator::new(schema)?.validate(instance)
}
