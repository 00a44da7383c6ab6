/*!
Type descriptors.

Rust has no runtime reflection, so every type that can be turned into a schema
describes itself through [`Reflect`]. Descriptors are shallow: a field points at
its type through a [`TypeRef`], whose [`TypeDef`] is only produced on demand.
That laziness is what allows self-referential types to be described at all.
*/

use crate::schema::Schema;
use std::any::TypeId;
use std::fmt;

/// Types that can describe their own shape
pub trait Reflect: 'static {
    fn type_def() -> TypeDef;
}

/// Types that supply a complete schema of their own.
///
/// Wire it up with `#[reflect(custom)]` or [`TypeDef::with_custom_schema`].
pub trait SchemaOverride {
    fn json_schema() -> Schema;
}

/// Handle to a reflectable type: its identity plus a lazy descriptor
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    rust_name: &'static str,
    def: fn() -> TypeDef,
}

impl TypeRef {
    pub fn of<T: Reflect + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            def: T::type_def,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full Rust type name, for diagnostics
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    pub fn def(&self) -> TypeDef {
        (self.def)()
    }

    pub fn is<T: Reflect + ?Sized>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl std::hash::Hash for TypeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.rust_name).finish()
    }
}

/// Standard types with a fixed schema shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnown {
    Timestamp,
    Date,
    Url,
    IpAddr,
    Ipv4Addr,
    Ipv6Addr,
    Uuid,
    Bytes,
    RawJson,
}

/// Shape of a type as seen by the classifier
#[derive(Debug, Clone)]
pub enum TypeKind {
    Boolean,
    Integer,
    Number,
    String,
    WellKnown(WellKnown),
    /// Integer-backed enumeration exposing a descriptor
    IntegerEnum,
    /// Accepts any JSON value
    Any,
    /// Pointer-like wrapper with the same schema as its target
    Transparent(TypeRef),
    Sequence {
        items: TypeRef,
        len: Option<usize>,
    },
    Map {
        key: TypeRef,
        value: TypeRef,
    },
    Record(Vec<Field>),
    /// A type with no JSON representation (functions, unit)
    Unsupported(&'static str),
}

/// Descriptor of one type
#[derive(Clone)]
pub struct TypeDef {
    /// Declared name; `None` for anonymous and structural types
    pub name: Option<String>,
    pub module_path: String,
    pub kind: TypeKind,
    /// Documentation for the type itself
    pub description: Option<String>,
    /// Anchor requested by the type
    pub anchor: Option<String>,
    pub custom_schema: Option<fn() -> Schema>,
    /// Per-field documentation provider
    pub field_docs: Option<fn(&str) -> Option<String>>,
}

impl TypeDef {
    /// An unnamed type of the given kind
    pub fn anonymous(kind: TypeKind) -> Self {
        Self {
            name: None,
            module_path: String::new(),
            kind,
            description: None,
            anchor: None,
            custom_schema: None,
            field_docs: None,
        }
    }

    /// A named type declared in `module_path`
    pub fn named(name: impl Into<String>, module_path: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: Some(name.into()),
            module_path: module_path.into(),
            ..Self::anonymous(kind)
        }
    }

    /// A named record
    pub fn record(name: impl Into<String>, module_path: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::named(name, module_path, TypeKind::Record(fields))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_custom_schema(mut self, schema: fn() -> Schema) -> Self {
        self.custom_schema = Some(schema);
        self
    }

    pub fn with_field_docs(mut self, docs: fn(&str) -> Option<String>) -> Self {
        self.field_docs = Some(docs);
        self
    }

    /// `module::path::Name`, or just the name at the crate root
    pub fn qualified_name(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        if self.module_path.is_empty() {
            Some(name.to_string())
        } else {
            Some(format!("{}::{}", self.module_path, name))
        }
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<anonymous>".to_string())
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("module_path", &self.module_path)
            .field("kind", &self.kind)
            .field("custom_schema", &self.custom_schema.is_some())
            .finish()
    }
}

/// Raw annotations attached to a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTags {
    /// Primary serialization name tag, e.g. `name,omitempty`
    pub json: Option<String>,
    /// Secondary serialization name tag, e.g. `,inline`
    pub yaml: Option<String>,
    /// Schema constraint annotation, e.g. `required,minLength=1`
    pub schema: Option<String>,
    /// Literal keyword annotation, e.g. `foo=bar`
    pub extras: Option<String>,
    /// Free-text description
    pub description: Option<String>,
}

/// One declared (or synthetic) field of a record
#[derive(Debug, Clone)]
pub struct Field {
    /// Rust identifier of the field
    pub ident: String,
    pub ty: TypeRef,
    /// Declared `pub`
    pub exported: bool,
    /// Embedded (flattened) into its container
    pub embedded: bool,
    pub tags: FieldTags,
    /// Documentation comment
    pub doc: Option<String>,
}

impl Field {
    /// A public, non-embedded field without annotations
    pub fn new(ident: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            ident: ident.into(),
            ty,
            exported: true,
            embedded: false,
            tags: FieldTags::default(),
            doc: None,
        }
    }

    /// A private field
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn json(mut self, tag: impl Into<String>) -> Self {
        self.tags.json = Some(tag.into());
        self
    }

    pub fn yaml(mut self, tag: impl Into<String>) -> Self {
        self.tags.yaml = Some(tag.into());
        self
    }

    pub fn schema(mut self, tag: impl Into<String>) -> Self {
        self.tags.schema = Some(tag.into());
        self
    }

    pub fn extras(mut self, tag: impl Into<String>) -> Self {
        self.tags.extras = Some(tag.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.tags.description = Some(description.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}
