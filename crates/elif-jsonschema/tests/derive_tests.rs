//! Tests for `#[derive(Reflect)]` descriptors

#![allow(dead_code)]

use elif_jsonschema::{Reflect, Reflector, ReflectorConfig, TypeKind};
use serde_json::json;

/// Identifier of an order
#[derive(Reflect)]
pub struct OrderId(pub u64);

#[derive(Reflect)]
#[reflect(name = "Order", anchor = "order")]
pub struct OrderRecord {
    /// Primary key
    #[reflect(json = "id")]
    pub id: OrderId,
    #[reflect(json = "type")]
    pub r#type: String,
    pub(crate) note: String,
}

#[derive(Reflect)]
pub struct Page<T> {
    #[reflect(json = "items")]
    pub items: Vec<T>,
    #[reflect(json = "total")]
    pub total: usize,
}

#[test]
fn test_record_descriptor() {
    let def = OrderRecord::type_def();
    assert_eq!(def.name.as_deref(), Some("Order"));
    assert_eq!(def.anchor.as_deref(), Some("order"));
    assert_eq!(def.module_path, module_path!());

    match def.kind {
        TypeKind::Record(fields) => {
            let idents: Vec<&str> = fields.iter().map(|f| f.ident.as_str()).collect();
            assert_eq!(idents, vec!["id", "type", "note"]);
            assert_eq!(fields[0].doc.as_deref(), Some("Primary key"));
            assert!(fields[0].exported);
            assert!(!fields[2].exported);
            assert_eq!(fields[1].tags.json.as_deref(), Some("type"));
        }
        other => panic!("unexpected kind {:?}", other),
    }
}

#[test]
fn test_newtype_is_transparent() {
    let def = OrderId::type_def();
    assert_eq!(def.description.as_deref(), Some("Identifier of an order"));
    assert!(matches!(def.kind, TypeKind::Transparent(inner) if inner.is::<u64>()));

    let config = ReflectorConfig::new().with_expanded_root(true);
    let schema = Reflector::new(config).reflect::<OrderRecord>().unwrap();
    assert_eq!(
        schema.to_value().unwrap()["properties"]["id"],
        json!({"type": "integer", "description": "Primary key"})
    );
    assert_eq!(schema.anchor.as_deref(), Some("order"));
}

#[test]
fn test_generic_records() {
    let schema = Reflector::default().reflect::<Page<OrderRecord>>().unwrap();
    let value = schema.to_value().unwrap();

    assert_eq!(value["$ref"], json!("#/$defs/Page"));
    assert_eq!(
        value["$defs"]["Page"]["properties"]["items"],
        json!({"type": "array", "items": {"$ref": "#/$defs/Order"}})
    );
}
