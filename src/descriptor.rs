// Strongly-typed shape descriptions driving schema/template/codec derivation.

use crate::value::Value;

/// The scalar kinds the wire format can carry as element text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int,
    Float,
    Str,
    Bool,
}

impl Scalar {
    /// The XSD builtin backing this scalar, qualified with `prefix`.
    pub fn xsd_type(&self, prefix: &str) -> String {
        let local = match self {
            Scalar::Int => "integer",
            Scalar::Float => "decimal",
            Scalar::Str => "string",
            Scalar::Bool => "boolean",
        };
        format!("{prefix}:{local}")
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Scalar::Int => "int",
            Scalar::Float => "float",
            Scalar::Str => "str",
            Scalar::Bool => "bool",
        }
    }
}

/// Closed set of type shapes the engine understands.
///
/// Descriptors are built once at registration and immutable afterwards.
/// Records may only reference each other through `Named` indirection; a
/// record embedding another record by value is rejected at registration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(Scalar),
    None,
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Record(RecordDescriptor),
    Union(Vec<TypeDescriptor>),
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    /// Only affects template generation; decode never falls back to it.
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

impl TypeDescriptor {
    pub fn int() -> Self {
        Self::Primitive(Scalar::Int)
    }

    pub fn float() -> Self {
        Self::Primitive(Scalar::Float)
    }

    pub fn str() -> Self {
        Self::Primitive(Scalar::Str)
    }

    pub fn bool() -> Self {
        Self::Primitive(Scalar::Bool)
    }

    pub fn list(item: TypeDescriptor) -> Self {
        Self::List(Box::new(item))
    }

    pub fn set(item: TypeDescriptor) -> Self {
        Self::Set(Box::new(item))
    }

    pub fn tuple(items: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    pub fn map(key: TypeDescriptor, val: TypeDescriptor) -> Self {
        Self::Map(Box::new(key), Box::new(val))
    }

    pub fn union(variants: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self::Union(variants.into_iter().collect())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Canonical name of the outer shape. Drives union discriminant
    /// derivation, so it must stay stable across releases.
    pub fn shape_name(&self) -> &str {
        match self {
            Self::Primitive(s) => s.shape_name(),
            Self::None => "NoneType",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Tuple(_) => "tuple",
            Self::Map(_, _) => "dict",
            Self::Record(r) => &r.name,
            Self::Union(_) => "union",
            Self::Named(n) => n,
        }
    }
}
