//! Type descriptors
//!
//! Rust has no runtime reflection, so every type that takes part in schema
//! generation describes its own shape through [`Describe`]. Nested types are
//! referenced through `fn() -> TypeDescriptor` pointers, which keeps
//! self-referential types finite: the generator resolves them lazily and breaks
//! the cycle with a reference.
//!
//! ```rust,ignore
//! struct Person {
//!     name: String,
//!     children: Vec<Person>,
//! }
//!
//! impl Describe for Person {
//!     fn describe() -> TypeDescriptor {
//!         ObjectDescriptor::of::<Self>()
//!             .description("A person and their descendants")
//!             .field(FieldDescriptor::new::<String>("name").required(true))
//!             .field(FieldDescriptor::new::<Vec<Person>>("children"))
//!             .into()
//!     }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// Lazily evaluated descriptor of a nested type.
pub type DescribeFn = fn() -> TypeDescriptor;

/// Namespaces whose types are never registered as definitions.
const PLATFORM_NAMESPACES: [&str; 3] = ["std::", "core::", "alloc::"];

/// Static description of a type's shape.
pub trait Describe {
    fn describe() -> TypeDescriptor;
}

/// Flavours of text-like values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    String,
    Char,
    Uuid,
}

/// Shape of a type, as seen by the schema generator.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Text(TextKind),
    Integer,
    Number,
    Boolean,
    Enum(EnumDescriptor),
    /// Fixed-size array or slice
    Array { component: DescribeFn },
    /// Growable collection; `None` when the element type cannot be recovered
    Collection { element: Option<DescribeFn> },
    Object(ObjectDescriptor),
}

impl TypeDescriptor {
    /// Collection whose element type is unknown.
    pub fn untyped_collection() -> Self {
        Self::Collection { element: None }
    }

    pub fn collection_of<T: Describe + ?Sized>() -> Self {
        Self::Collection {
            element: Some(T::describe),
        }
    }

    pub fn array_of<T: Describe + ?Sized>() -> Self {
        Self::Array {
            component: T::describe,
        }
    }
}

impl From<ObjectDescriptor> for TypeDescriptor {
    fn from(descriptor: ObjectDescriptor) -> Self {
        Self::Object(descriptor)
    }
}

impl From<EnumDescriptor> for TypeDescriptor {
    fn from(descriptor: EnumDescriptor) -> Self {
        Self::Enum(descriptor)
    }
}

/// Unit-only enum: its variant names in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub type_name: String,
    pub description: Option<String>,
    pub variants: Vec<String>,
}

impl EnumDescriptor {
    pub fn of<T: ?Sized, I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: std::any::type_name::<T>().to_string(),
            description: None,
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Struct-like type with named fields.
#[derive(Debug, Clone)]
pub struct ObjectDescriptor {
    /// Fully-qualified type name; the identity used for cycle detection
    pub type_name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl ObjectDescriptor {
    /// Descriptor named after `T`'s path as reported by
    /// [`std::any::type_name`].
    ///
    /// That name is stable within one build but not guaranteed across
    /// compiler versions; use [`ObjectDescriptor::named`] when reference ids
    /// must stay fixed.
    pub fn of<T: ?Sized>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Whether the type lives outside the platform namespaces and may
    /// therefore be registered as a definition.
    pub fn is_custom(&self) -> bool {
        !PLATFORM_NAMESPACES
            .iter()
            .any(|prefix| self.type_name.starts_with(prefix))
    }
}

/// One declared field of an [`ObjectDescriptor`].
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: DescribeFn,
    pub description: Option<String>,
    /// Explicit requiredness; `None` defers to the generator's default
    pub required: Option<bool>,
    /// Not part of the serialized shape (e.g. `#[serde(skip)]`)
    pub skipped: bool,
}

impl FieldDescriptor {
    pub fn new<T: Describe + ?Sized>(name: impl Into<String>) -> Self {
        Self::with_type(name, T::describe)
    }

    pub fn with_type(name: impl Into<String>, ty: DescribeFn) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            required: None,
            skipped: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn skip(mut self) -> Self {
        self.skipped = true;
        self
    }
}

impl Describe for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Text(TextKind::String)
    }
}

impl Describe for str {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Text(TextKind::String)
    }
}

impl Describe for char {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Text(TextKind::Char)
    }
}

impl Describe for uuid::Uuid {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Text(TextKind::Uuid)
    }
}

impl Describe for bool {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Boolean
    }
}

macro_rules! describe_as {
    ($descriptor:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::$descriptor
                }
            }
        )+
    };
}

describe_as!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_as!(Number => f32, f64);

macro_rules! describe_collection {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl<T: Describe> Describe for $ty<T> {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::collection_of::<T>()
                }
            }
        )+
    };
}

describe_collection!(Vec, VecDeque, LinkedList, HashSet, BTreeSet);

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array_of::<T>()
    }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array_of::<T>()
    }
}

macro_rules! describe_transparent {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl<T: Describe + ?Sized> Describe for $ty<T> {
                fn describe() -> TypeDescriptor {
                    T::describe()
                }
            }
        )+
    };
}

describe_transparent!(Box, Arc, Rc);

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<K, V> Describe for HashMap<K, V> {
    fn describe() -> TypeDescriptor {
        ObjectDescriptor::of::<Self>().into()
    }
}

impl<K, V> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        ObjectDescriptor::of::<Self>().into()
    }
}

impl Describe for serde_json::Value {
    fn describe() -> TypeDescriptor {
        ObjectDescriptor::of::<Self>().into()
    }
}
