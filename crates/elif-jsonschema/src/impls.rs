//! `Reflect` implementations for std and ecosystem types

use crate::types::{Reflect, TypeDef, TypeKind, TypeRef, WellKnown};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

macro_rules! reflect_kind {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_def() -> TypeDef {
                    TypeDef::anonymous($kind)
                }
            }
        )+
    };
}

reflect_kind!(TypeKind::Boolean => bool);
reflect_kind!(TypeKind::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
reflect_kind!(TypeKind::Number => f32, f64);
reflect_kind!(TypeKind::String => String, str, char, std::path::PathBuf);
reflect_kind!(TypeKind::Any => serde_json::Value);
reflect_kind!(TypeKind::WellKnown(WellKnown::Timestamp) => std::time::SystemTime, chrono::NaiveDateTime);
reflect_kind!(TypeKind::WellKnown(WellKnown::Date) => chrono::NaiveDate);
reflect_kind!(TypeKind::WellKnown(WellKnown::Url) => url::Url);
reflect_kind!(TypeKind::WellKnown(WellKnown::IpAddr) => std::net::IpAddr);
reflect_kind!(TypeKind::WellKnown(WellKnown::Ipv4Addr) => std::net::Ipv4Addr);
reflect_kind!(TypeKind::WellKnown(WellKnown::Ipv6Addr) => std::net::Ipv6Addr);
reflect_kind!(TypeKind::WellKnown(WellKnown::Uuid) => uuid::Uuid);
reflect_kind!(TypeKind::WellKnown(WellKnown::RawJson) => serde_json::value::RawValue);
reflect_kind!(TypeKind::Unsupported("unit has no JSON representation") => ());

impl<Tz: chrono::TimeZone + 'static> Reflect for chrono::DateTime<Tz> {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::WellKnown(WellKnown::Timestamp))
    }
}

macro_rules! reflect_transparent {
    ($($wrapper:ident),+) => {
        $(
            impl<T: Reflect + ?Sized> Reflect for $wrapper<T> {
                fn type_def() -> TypeDef {
                    TypeDef::anonymous(TypeKind::Transparent(TypeRef::of::<T>()))
                }
            }
        )+
    };
}

reflect_transparent!(Box, Rc, Arc);

impl<T: Reflect> Reflect for Option<T> {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Transparent(TypeRef::of::<T>()))
    }
}

impl<T: Reflect + ?Sized> Reflect for &'static T {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Transparent(TypeRef::of::<T>()))
    }
}

macro_rules! reflect_sequence {
    ($($collection:ident),+) => {
        $(
            impl<T: Reflect> Reflect for $collection<T> {
                fn type_def() -> TypeDef {
                    TypeDef::anonymous(TypeKind::Sequence {
                        items: TypeRef::of::<T>(),
                        len: None,
                    })
                }
            }
        )+
    };
}

reflect_sequence!(Vec, VecDeque, LinkedList, HashSet, BTreeSet);

impl<T: Reflect> Reflect for [T] {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Sequence {
            items: TypeRef::of::<T>(),
            len: None,
        })
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Sequence {
            items: TypeRef::of::<T>(),
            len: Some(N),
        })
    }
}

impl<K: Reflect, V: Reflect> Reflect for HashMap<K, V> {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Map {
            key: TypeRef::of::<K>(),
            value: TypeRef::of::<V>(),
        })
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Map {
            key: TypeRef::of::<K>(),
            value: TypeRef::of::<V>(),
        })
    }
}

impl<T: 'static> Reflect for fn() -> T {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Unsupported("function values have no JSON representation"))
    }
}

impl<A: 'static, T: 'static> Reflect for fn(A) -> T {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Unsupported("function values have no JSON representation"))
    }
}

impl<T: 'static> Reflect for std::sync::mpsc::Sender<T> {
    fn type_def() -> TypeDef {
        TypeDef::anonymous(TypeKind::Unsupported("channels have no JSON representation"))
    }
}
