//! Schema generation
//!
//! Walks a [`TypeDescriptor`] graph and produces a [`SchemaElement`] tree.
//! Custom object types are registered in a per-call [`TraversalContext`]
//! before their fields are visited; meeting the same type again while it is
//! still being built yields a [`ReferenceSchema`] placeholder instead of
//! recursing forever. Types that were reached recursively are emitted as
//! `definitions` on the root object when requested.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::describe::{Describe, ObjectDescriptor, TextKind, TypeDescriptor};
use super::element::{
    ArraySchema, BooleanSchema, EnumSchema, IntegerSchema, JsonSchema, NumberSchema,
    ObjectSchema, ReferenceSchema, SchemaElement, StringSchema,
};

/// Description given to UUID-typed values that carry none of their own.
pub const DEFAULT_UUID_DESCRIPTION: &str = "String in a UUID format";

/// Bookkeeping for one type seen during a generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitedTypeMetadata {
    /// Finished element, or the placeholder reference while in progress
    pub element: SchemaElement,
    pub reference: String,
    pub recursion_detected: bool,
}

/// Types visited during one top-level generation call, in first-visit order.
#[derive(Debug, Default)]
pub struct TraversalContext {
    entries: Vec<(String, VisitedTypeMetadata)>,
    index: HashMap<String, usize>,
}

impl TraversalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&VisitedTypeMetadata> {
        self.index.get(type_name).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Elements of every type that was reached while still being built.
    pub fn recursive_definitions(&self) -> impl Iterator<Item = (&str, &SchemaElement)> {
        self.entries
            .iter()
            .map(|(_, meta)| meta)
            .filter(|meta| meta.recursion_detected)
            .map(|meta| (meta.reference.as_str(), &meta.element))
    }

    fn get_mut(&mut self, type_name: &str) -> Option<&mut VisitedTypeMetadata> {
        let i = *self.index.get(type_name)?;
        Some(&mut self.entries[i].1)
    }

    fn insert(&mut self, type_name: &str, meta: VisitedTypeMetadata) {
        match self.index.get(type_name) {
            Some(&i) => self.entries[i].1 = meta,
            None => {
                self.index.insert(type_name.to_string(), self.entries.len());
                self.entries.push((type_name.to_string(), meta));
            }
        }
    }
}

/// Stable reference id for a type name.
///
/// SHA-256 of the name, hex-encoded, then a name-based UUID of that text. The
/// same name always produces the same id, across calls and across processes.
///
/// Names from [`ObjectDescriptor::of`] come from [`std::any::type_name`],
/// whose output may change between compiler versions. Ids that are stored or
/// shared outside one build should come from [`ObjectDescriptor::named`] with
/// an explicit path.
pub fn reference_id(type_name: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(type_name.as_bytes()));
    Uuid::new_v5(&Uuid::NAMESPACE_OID, digest.as_bytes()).to_string()
}

/// Produce the schema element for `descriptor`.
///
/// `description` is the description of the field being generated, if any.
/// `sub_fields_required_by_default` applies to fields without an explicit
/// required flag. Never fails: an unknown collection element degrades to an
/// empty object.
pub fn generate(
    descriptor: &TypeDescriptor,
    description: Option<&str>,
    sub_fields_required_by_default: bool,
    ctx: &mut TraversalContext,
) -> SchemaElement {
    let description = description.map(str::to_owned);
    match descriptor {
        TypeDescriptor::Text(kind) => {
            let description = description.or_else(|| {
                (*kind == TextKind::Uuid).then(|| DEFAULT_UUID_DESCRIPTION.to_string())
            });
            StringSchema { description }.into()
        }
        TypeDescriptor::Integer => IntegerSchema { description }.into(),
        TypeDescriptor::Number => NumberSchema { description }.into(),
        TypeDescriptor::Boolean => BooleanSchema { description }.into(),
        TypeDescriptor::Enum(e) => EnumSchema {
            values: e.variants.clone(),
            description: description.or_else(|| e.description.clone()),
        }
        .into(),
        TypeDescriptor::Array { component } => {
            let items = generate(&component(), None, sub_fields_required_by_default, ctx);
            ArraySchema {
                items: Box::new(items),
                description,
            }
            .into()
        }
        TypeDescriptor::Collection { element } => {
            let items = match element {
                Some(element) => generate(&element(), None, sub_fields_required_by_default, ctx),
                None => {
                    tracing::debug!("Collection element type unknown, using an empty object");
                    ObjectSchema::new().into()
                }
            };
            ArraySchema {
                items: Box::new(items),
                description,
            }
            .into()
        }
        TypeDescriptor::Object(object) => resolve_object_or_reference(
            object,
            description.as_deref(),
            sub_fields_required_by_default,
            ctx,
            false,
        ),
    }
}

/// Produce the element for an object type, or a reference to it when the
/// type is already being built higher up the stack.
pub fn resolve_object_or_reference(
    object: &ObjectDescriptor,
    description: Option<&str>,
    sub_fields_required_by_default: bool,
    ctx: &mut TraversalContext,
    emit_definitions: bool,
) -> SchemaElement {
    if object.is_custom()
        && let Some(meta) = ctx.get_mut(&object.type_name)
    {
        if meta.element.is_reference() && !meta.recursion_detected {
            tracing::trace!("Recursion detected for {}", object.type_name);
            meta.recursion_detected = true;
        }
        return meta.element.clone();
    }

    let reference = reference_id(&object.type_name);
    ctx.insert(
        &object.type_name,
        VisitedTypeMetadata {
            element: ReferenceSchema::new(reference.clone()).into(),
            reference,
            recursion_detected: false,
        },
    );

    let mut schema = ObjectSchema::new();
    let mut required = Vec::new();
    for field in object.fields.iter().filter(|f| !f.skipped) {
        if field.required.unwrap_or(sub_fields_required_by_default) {
            required.push(field.name.clone());
        }
        let element = generate(
            &(field.ty)(),
            field.description.as_deref(),
            sub_fields_required_by_default,
            ctx,
        );
        schema = schema.property(field.name.clone(), element);
    }
    schema = schema.with_required(required);
    schema.description = description
        .map(str::to_owned)
        .or_else(|| object.description.clone());

    if let Some(meta) = ctx.get_mut(&object.type_name) {
        meta.element = schema.clone().into();
    }

    if emit_definitions {
        for (reference, element) in ctx.recursive_definitions() {
            schema = schema.with_definition(reference, element.clone());
        }
    }

    schema.into()
}

/// Entry point for turning [`Describe`] types into schemas.
///
/// ```rust,ignore
/// let element = SchemaGenerator::new()
///     .required_by_default(true)
///     .root_schema_for::<Person>();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaGenerator {
    required_by_default: bool,
}

impl SchemaGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requiredness of fields that do not declare it explicitly.
    pub fn required_by_default(mut self, required: bool) -> Self {
        self.required_by_default = required;
        self
    }

    /// Schema for `T` without definitions; recursive references stay dangling.
    pub fn element_for<T: Describe + ?Sized>(&self) -> SchemaElement {
        self.element_from(&T::describe())
    }

    pub fn element_from(&self, descriptor: &TypeDescriptor) -> SchemaElement {
        let mut ctx = TraversalContext::new();
        let element = generate(descriptor, None, self.required_by_default, &mut ctx);
        tracing::debug!(
            "Generated {} schema, {} types visited",
            element.kind(),
            ctx.len()
        );
        element
    }

    /// Schema for `T`; object roots carry the definitions of recursive types.
    pub fn root_schema_for<T: Describe + ?Sized>(&self) -> SchemaElement {
        self.root_schema_from(&T::describe())
    }

    pub fn root_schema_from(&self, descriptor: &TypeDescriptor) -> SchemaElement {
        let TypeDescriptor::Object(object) = descriptor else {
            return self.element_from(descriptor);
        };
        let mut ctx = TraversalContext::new();
        let element =
            resolve_object_or_reference(object, None, self.required_by_default, &mut ctx, true);
        tracing::debug!(
            "Generated root schema for {}, {} types visited",
            object.type_name,
            ctx.len()
        );
        element
    }

    /// Named root schema for structured outputs.
    pub fn json_schema_for<T: Describe + ?Sized>(&self, name: impl Into<String>) -> JsonSchema {
        JsonSchema::new(name, self.root_schema_for::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::describe::{EnumDescriptor, FieldDescriptor};

    enum Color {}

    impl Describe for Color {
        fn describe() -> TypeDescriptor {
            EnumDescriptor::of::<Self, _, _>(["RED", "GREEN"])
                .description("A color")
                .into()
        }
    }

    struct Node;

    impl Describe for Node {
        fn describe() -> TypeDescriptor {
            ObjectDescriptor::named("tests::Node")
                .field(FieldDescriptor::new::<Option<Box<Node>>>("next"))
                .field(FieldDescriptor::new::<u32>("value").required(true))
                .field(FieldDescriptor::new::<String>("cache").skip())
                .into()
        }
    }

    #[test]
    fn reference_id_is_a_stable_uuid() {
        let id = reference_id("tests::Node");
        assert_eq!(id, reference_id("tests::Node"));
        assert_ne!(id, reference_id("tests::Other"));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn reference_id_of_an_explicit_name_is_pinned() {
        assert_eq!(
            reference_id("app::Person"),
            "a57de22a-6d3f-5656-9ba6-00fcee7fef4e"
        );
        let root = SchemaGenerator::new().root_schema_for::<Node>();
        assert!(
            root.as_object()
                .unwrap()
                .get_definition("30fdf815-d5d7-5c02-9dbf-8cd4004633f4")
                .is_some()
        );
    }

    #[test]
    fn uuid_gets_default_description() {
        let element = SchemaGenerator::new().element_for::<Uuid>();
        assert_eq!(element.description(), Some(DEFAULT_UUID_DESCRIPTION));
    }

    #[test]
    fn field_description_overrides_enum_description() {
        let mut ctx = TraversalContext::new();
        let own = generate(&Color::describe(), None, false, &mut ctx);
        let overridden = generate(&Color::describe(), Some("Paint"), false, &mut ctx);
        assert_eq!(own.description(), Some("A color"));
        assert_eq!(overridden.description(), Some("Paint"));
    }

    #[test]
    fn unknown_collection_element_becomes_empty_object() {
        let element = SchemaGenerator::new().element_from(&TypeDescriptor::untyped_collection());
        let items = &element.as_array().unwrap().items;
        assert_eq!(**items, SchemaElement::Object(ObjectSchema::new()));
    }

    #[test]
    fn self_reference_is_broken_with_a_definition() {
        let root = SchemaGenerator::new().root_schema_for::<Node>();
        let object = root.as_object().unwrap();
        let reference = reference_id("tests::Node");

        assert_eq!(
            object.get_property("next"),
            Some(&SchemaElement::Reference(ReferenceSchema::new(reference.clone())))
        );
        assert_eq!(object.required(), ["value".to_string()]);
        assert!(object.get_property("cache").is_none());

        let definition = object.get_definition(&reference).unwrap().as_object().unwrap();
        assert_eq!(definition.properties().len(), 2);
        assert!(definition.definitions().is_empty());
    }

    #[test]
    fn element_for_omits_definitions() {
        let root = SchemaGenerator::new().element_for::<Node>();
        assert!(root.as_object().unwrap().definitions().is_empty());
    }

    #[test]
    fn required_by_default_applies_to_unflagged_fields() {
        let root = SchemaGenerator::new()
            .required_by_default(true)
            .root_schema_for::<Node>();
        assert_eq!(
            root.as_object().unwrap().required(),
            ["next".to_string(), "value".to_string()]
        );
    }
}
