//! Schema element graph
//!
//! A closed set of structural type descriptions. Elements are plain values:
//! once built they are only read by the serializers in [`super::wire`] and
//! [`super::gemini`].

/// A node in the structural type description graph.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaElement {
    /// Text value
    String(StringSchema),
    /// Whole number
    Integer(IntegerSchema),
    /// Decimal number
    Number(NumberSchema),
    /// `true` / `false`
    Boolean(BooleanSchema),
    /// One of a fixed, ordered set of strings
    Enum(EnumSchema),
    /// Homogeneous list
    Array(ArraySchema),
    /// Named properties
    Object(ObjectSchema),
    /// Pointer into the enclosing object's definitions
    Reference(ReferenceSchema),
    /// Union of alternatives
    AnyOf(AnyOfSchema),
    /// JSON `null`
    Null,
    /// Pre-rendered schema document that no serializer knows how to lower
    Raw(RawSchema),
}

impl SchemaElement {
    /// Short lowercase name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Enum(_) => "enum",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Reference(_) => "reference",
            Self::AnyOf(_) => "anyOf",
            Self::Null => "null",
            Self::Raw(_) => "raw",
        }
    }

    /// Description attached to this element, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::String(s) => s.description.as_deref(),
            Self::Integer(s) => s.description.as_deref(),
            Self::Number(s) => s.description.as_deref(),
            Self::Boolean(s) => s.description.as_deref(),
            Self::Enum(s) => s.description.as_deref(),
            Self::Array(s) => s.description.as_deref(),
            Self::Object(s) => s.description.as_deref(),
            Self::AnyOf(s) => s.description.as_deref(),
            Self::Reference(_) | Self::Null | Self::Raw(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArraySchema> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceSchema> {
        match self {
            Self::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

macro_rules! scalar_schema {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub description: Option<String>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn with_description(mut self, description: impl Into<String>) -> Self {
                self.description = Some(description.into());
                self
            }
        }

        impl From<$name> for SchemaElement {
            fn from(schema: $name) -> Self {
                SchemaElement::$variant(schema)
            }
        }
    };
}

scalar_schema!(
    /// String schema
    StringSchema,
    String
);
scalar_schema!(
    /// Integer schema
    IntegerSchema,
    Integer
);
scalar_schema!(
    /// Number schema
    NumberSchema,
    Number
);
scalar_schema!(
    /// Boolean schema
    BooleanSchema,
    Boolean
);

/// Enumeration of string values, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumSchema {
    pub values: Vec<String>,
    pub description: Option<String>,
}

impl EnumSchema {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<EnumSchema> for SchemaElement {
    fn from(schema: EnumSchema) -> Self {
        SchemaElement::Enum(schema)
    }
}

/// Array of `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: Box<SchemaElement>,
    pub description: Option<String>,
}

impl ArraySchema {
    pub fn new(items: impl Into<SchemaElement>) -> Self {
        Self {
            items: Box::new(items.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<ArraySchema> for SchemaElement {
    fn from(schema: ArraySchema) -> Self {
        SchemaElement::Array(schema)
    }
}

/// Object with ordered properties.
///
/// `required` is always a subset of the property names: naming a property
/// that does not exist is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub description: Option<String>,
    properties: Vec<(String, SchemaElement)>,
    required: Vec<String>,
    definitions: Vec<(String, SchemaElement)>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add (or replace in place) an optional property.
    pub fn property(mut self, name: impl Into<String>, element: impl Into<SchemaElement>) -> Self {
        self.insert_property(name.into(), element.into());
        self
    }

    /// Add (or replace in place) a property and mark it required.
    pub fn required_property(
        mut self,
        name: impl Into<String>,
        element: impl Into<SchemaElement>,
    ) -> Self {
        let name = name.into();
        self.insert_property(name.clone(), element.into());
        self.mark_required(name);
        self
    }

    pub fn string_property(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.property(name, StringSchema::new().with_description(description))
    }

    pub fn integer_property(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.property(name, IntegerSchema::new().with_description(description))
    }

    pub fn number_property(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.property(name, NumberSchema::new().with_description(description))
    }

    pub fn boolean_property(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.property(name, BooleanSchema::new().with_description(description))
    }

    /// Mark already-added properties as required. Unknown names are dropped.
    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.mark_required(name.into());
        }
        self
    }

    /// Attach a definition that `$ref`s inside this object can point at.
    pub fn with_definition(
        mut self,
        reference: impl Into<String>,
        element: impl Into<SchemaElement>,
    ) -> Self {
        let reference = reference.into();
        let element = element.into();
        match self.definitions.iter_mut().find(|(r, _)| *r == reference) {
            Some(slot) => slot.1 = element,
            None => self.definitions.push((reference, element)),
        }
        self
    }

    pub fn properties(&self) -> &[(String, SchemaElement)] {
        &self.properties
    }

    pub fn get_property(&self, name: &str) -> Option<&SchemaElement> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(n, _)| n.as_str())
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub fn definitions(&self) -> &[(String, SchemaElement)] {
        &self.definitions
    }

    pub fn get_definition(&self, reference: &str) -> Option<&SchemaElement> {
        self.definitions
            .iter()
            .find(|(r, _)| r == reference)
            .map(|(_, e)| e)
    }

    fn insert_property(&mut self, name: String, element: SchemaElement) {
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = element,
            None => self.properties.push((name, element)),
        }
    }

    fn mark_required(&mut self, name: String) {
        if self.get_property(&name).is_none() {
            tracing::debug!("Ignoring required marker for unknown property '{}'", name);
            return;
        }
        if !self.is_required(&name) {
            self.required.push(name);
        }
    }
}

impl From<ObjectSchema> for SchemaElement {
    fn from(schema: ObjectSchema) -> Self {
        SchemaElement::Object(schema)
    }
}

/// Reference to a definition (`#/$defs/<reference>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSchema {
    pub reference: String,
}

impl ReferenceSchema {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

impl From<ReferenceSchema> for SchemaElement {
    fn from(schema: ReferenceSchema) -> Self {
        SchemaElement::Reference(schema)
    }
}

/// Any of the listed alternatives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnyOfSchema {
    pub variants: Vec<SchemaElement>,
    pub description: Option<String>,
}

impl AnyOfSchema {
    pub fn new<I, E>(variants: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<SchemaElement>,
    {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<AnyOfSchema> for SchemaElement {
    fn from(schema: AnyOfSchema) -> Self {
        SchemaElement::AnyOf(schema)
    }
}

/// Opaque schema text supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSchema {
    pub schema: String,
}

impl RawSchema {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }
}

impl From<RawSchema> for SchemaElement {
    fn from(schema: RawSchema) -> Self {
        SchemaElement::Raw(schema)
    }
}

/// A named root schema, as used for structured outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    pub name: String,
    pub root: SchemaElement,
}

impl JsonSchema {
    pub fn new(name: impl Into<String>, root: impl Into<SchemaElement>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }
}
