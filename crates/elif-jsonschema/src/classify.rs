//! Shape classification of type descriptors

use crate::schema::{InstanceType, Schema};
use crate::types::{Field, TypeDef, TypeKind, TypeRef, WellKnown};

/// Schema shape family of a type, decided before any annotation is read
#[derive(Debug, Clone)]
pub enum Shape<'a> {
    /// The type provides its own schema
    Custom(fn() -> Schema),
    WellKnown(WellKnown),
    IntegerEnum,
    Primitive(InstanceType),
    Sequence { items: TypeRef, len: Option<usize> },
    Mapping { key: TypeRef, value: TypeRef },
    Any,
    Record(&'a [Field]),
    /// Pointer-like wrapper; classify the target instead
    Transparent(TypeRef),
    Unsupported(&'static str),
}

/// Decide the shape family of a descriptor, in priority order
pub fn classify(def: &TypeDef) -> Shape<'_> {
    if let Some(custom) = def.custom_schema {
        return Shape::Custom(custom);
    }

    match &def.kind {
        TypeKind::WellKnown(known) => Shape::WellKnown(*known),
        TypeKind::IntegerEnum => Shape::IntegerEnum,
        TypeKind::Sequence { items, len } if len.is_none() && items.is::<u8>() => {
            Shape::WellKnown(WellKnown::Bytes)
        }
        TypeKind::Sequence { items, len } => Shape::Sequence {
            items: *items,
            len: *len,
        },
        TypeKind::Map { key, value } => Shape::Mapping {
            key: *key,
            value: *value,
        },
        TypeKind::Any => Shape::Any,
        TypeKind::Boolean => Shape::Primitive(InstanceType::Boolean),
        TypeKind::Integer => Shape::Primitive(InstanceType::Integer),
        TypeKind::Number => Shape::Primitive(InstanceType::Number),
        TypeKind::String => Shape::Primitive(InstanceType::String),
        TypeKind::Record(fields) => Shape::Record(fields),
        TypeKind::Transparent(target) => Shape::Transparent(*target),
        TypeKind::Unsupported(reason) => Shape::Unsupported(*reason),
    }
}

/// Fixed schema of a well-known type
pub fn well_known_schema(known: WellKnown) -> Schema {
    match known {
        WellKnown::Timestamp => Schema::formatted("date-time"),
        WellKnown::Date => Schema::formatted("date"),
        WellKnown::Url => Schema::formatted("uri"),
        WellKnown::Ipv4Addr => Schema::formatted("ipv4"),
        WellKnown::Ipv6Addr => Schema::formatted("ipv6"),
        WellKnown::IpAddr => Schema {
            instance_type: Some(InstanceType::String),
            any_of: vec![
                Schema {
                    format: Some("ipv4".to_string()),
                    ..Default::default()
                },
                Schema {
                    format: Some("ipv6".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        },
        WellKnown::Uuid => Schema::formatted("uuid"),
        WellKnown::Bytes => Schema::formatted("binary"),
        WellKnown::RawJson => Schema::default(),
    }
}

/// Does this descriptor get its own entry in the definitions table?
///
/// Named records and named types with a custom schema do; everything else is
/// structural and always inlined.
pub fn is_definable(def: &TypeDef) -> bool {
    def.name.is_some() && (def.custom_schema.is_some() || matches!(def.kind, TypeKind::Record(_)))
}

/// Follow transparent wrappers that carry no capability of their own
pub fn peel(ty: TypeRef) -> (TypeRef, TypeDef) {
    let mut current = ty;
    loop {
        let def = current.def();
        match (&def.kind, def.custom_schema) {
            (TypeKind::Transparent(target), None) => current = *target,
            _ => return (current, def),
        }
    }
}
