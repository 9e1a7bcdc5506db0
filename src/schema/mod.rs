//! Schema generation and lowering
//!
//! - [`describe`] - types declare their shape through [`Describe`]
//! - [`generator`] - descriptors become a [`SchemaElement`] graph, with
//!   references and definitions for recursive types
//! - [`wire`] / [`gemini`] - elements become provider wire maps
//! - [`validator`] - model output is checked against a lowered schema

pub mod describe;
pub mod element;
pub mod gemini;
pub mod generator;
pub mod validator;
pub mod wire;

pub use describe::{
    Describe, DescribeFn, EnumDescriptor, FieldDescriptor, ObjectDescriptor, TextKind,
    TypeDescriptor,
};
pub use element::{
    AnyOfSchema, ArraySchema, BooleanSchema, EnumSchema, IntegerSchema, JsonSchema, NumberSchema,
    ObjectSchema, RawSchema, ReferenceSchema, SchemaElement, StringSchema,
};
pub use gemini::{GeminiSchema, GeminiType, json_schema_to_gemini, to_gemini_schema};
pub use generator::{
    DEFAULT_UUID_DESCRIPTION, SchemaGenerator, TraversalContext, VisitedTypeMetadata, generate,
    reference_id, resolve_object_or_reference,
};
pub use validator::{JsonSchemaValidator, SchemaValidator, validate_json};
pub use wire::{WireMap, to_wire_map, to_wire_value};
