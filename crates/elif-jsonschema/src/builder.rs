//! Layering of field annotations onto a base schema node.
//!
//! The classifier decides the base node of a field; this module folds the parsed
//! annotation terms and the extras annotation on top of it. Type specific
//! keywords only apply to nodes of the matching type.

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{InstanceType, Schema};
use crate::tags::{parse_extras, split_sub_list, SchemaTag, TagTerm};
use crate::utils::{coerce_literal, parse_float, parse_integer, parse_number};
use serde_json::{Number, Value};
use tracing::warn;

/// Keys whose meaning depends on the node type
const TYPED_KEYS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "format",
    "minItems",
    "maxItems",
    "uniqueItems",
    "enum",
    "default",
    "example",
];

/// Raw annotations of one field, with the context needed for error reporting
pub(crate) struct Annotations<'a> {
    pub owner: &'a str,
    pub field: &'a str,
    pub tag: &'a SchemaTag,
    pub extras: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl Annotations<'_> {
    fn error(&self, term: &str, reason: impl ToString) -> SchemaError {
        SchemaError::annotation_error(self.owner, self.field, term, reason)
    }

    fn skip(&self, term: &TagTerm, target: Option<InstanceType>) {
        warn!(
            owner = self.owner,
            field = self.field,
            term = %term.source(),
            target = ?target,
            "annotation does not apply to this schema type"
        );
    }
}

/// Types the base node resolves to, looking through references
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Resolved {
    pub instance_type: Option<InstanceType>,
    pub items_type: Option<InstanceType>,
    pub integer_enum: bool,
}

/// Result of annotating a field
#[derive(Debug)]
pub(crate) struct BuiltField {
    pub schema: Schema,
    pub nullable: bool,
    /// Mutually exclusive required group the field belongs to
    pub group: Option<String>,
}

/// Fold the annotations of a field onto its base node
pub(crate) fn apply_annotations(
    base: Schema,
    resolved: Resolved,
    ann: &Annotations<'_>,
) -> SchemaResult<BuiltField> {
    let (mut node, reference) = if base.is_ref() {
        (Schema::default(), Some(base))
    } else {
        (base, None)
    };
    let target_type = match reference {
        Some(_) => resolved.instance_type,
        None => node.instance_type,
    };

    if let Some(description) = ann.description {
        node.description = Some(description.to_string());
    }

    let mut nullable = false;
    let mut group = None;
    let mut one_of_types = None;
    let mut typed_terms = Vec::new();

    for term in &ann.tag.terms {
        match term {
            TagTerm::Keyword(keyword) => match keyword.as_str() {
                "required" => {}
                "nullable" => nullable = true,
                other => {
                    node.extras.insert(other.to_string(), Value::Bool(true));
                }
            },
            TagTerm::Pair { key, value } => match key.as_str() {
                "title" => node.title = Some(value.clone()),
                "description" => node.description = Some(value.clone()),
                "anchor" => {
                    if value.is_empty() {
                        return Err(ann.error(&term.source(), "anchor name is empty"));
                    }
                    node.anchor = Some(value.clone());
                }
                "readOnly" => node.read_only = parse_flag(ann, term, value)?,
                "writeOnly" => node.write_only = parse_flag(ann, term, value)?,
                "oneof_required" => {
                    if value.trim().is_empty() {
                        return Err(ann.error(&term.source(), "group label is empty"));
                    }
                    group = Some(value.trim().to_string());
                }
                "oneof_type" => {
                    let types = split_sub_list(value)
                        .into_iter()
                        .map(|name| {
                            if name.is_empty() {
                                return Err(ann.error(&term.source(), "empty type in list"));
                            }
                            name.parse::<InstanceType>()
                                .map_err(|reason| ann.error(&term.source(), reason))
                        })
                        .collect::<SchemaResult<Vec<_>>>()?;
                    one_of_types = Some(types);
                }
                k if TYPED_KEYS.contains(&k) => typed_terms.push(term),
                _ => {
                    node.extras.insert(key.clone(), Value::String(value.clone()));
                }
            },
        }
    }

    match one_of_types {
        Some(types) => {
            node.instance_type = None;
            for instance_type in types {
                let mut alternative = Schema::typed(instance_type);
                apply_typed(&mut alternative, Some(instance_type), None, &typed_terms, ann)?;
                node.one_of.push(alternative);
            }
        }
        None => {
            let mut target = target_type;
            if resolved.integer_enum && typed_terms.iter().any(|t| t.key() == "enum") {
                target = Some(InstanceType::String);
                node.instance_type = target;
            }
            apply_typed(&mut node, target, resolved.items_type, &typed_terms, ann)?;
        }
    }

    if let Some(extras) = ann.extras {
        let extras = parse_extras(extras).map_err(|e| ann.error(&e.term, e.reason))?;
        node.extras.extend(extras);
    }

    let schema = match reference {
        Some(reference) => compose_with_reference(reference, node),
        None => node,
    };

    Ok(BuiltField {
        schema,
        nullable,
        group,
    })
}

/// Keep a reference node free of constraints: documentation sits beside the
/// `$ref`, anything constraining goes into an `allOf`.
fn compose_with_reference(reference: Schema, mut overlay: Schema) -> Schema {
    let docs = overlay.take_documentation();
    overlay.instance_type = None;

    let mut schema = if overlay.is_empty() {
        reference
    } else {
        Schema {
            all_of: vec![reference, overlay],
            ..Default::default()
        }
    };
    schema.merge_documentation(docs);
    schema
}

fn parse_flag(ann: &Annotations<'_>, term: &TagTerm, value: &str) -> SchemaResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ann.error(&term.source(), "expected true or false")),
    }
}

/// Coerce a literal to a scalar type. `Ok(None)` means the type takes no literals.
fn coerce(target: Option<InstanceType>, value: &str) -> Result<Option<Value>, &'static str> {
    match target {
        Some(InstanceType::Integer) => parse_integer(value)
            .map(|n| Some(Value::Number(n)))
            .ok_or("expected an integer"),
        Some(InstanceType::Number) => parse_float(value)
            .map(|n| Some(Value::Number(n)))
            .ok_or("expected a number"),
        Some(InstanceType::Boolean) => match value {
            "true" => Ok(Some(Value::Bool(true))),
            "false" => Ok(Some(Value::Bool(false))),
            _ => Err("expected true or false"),
        },
        Some(InstanceType::String) => Ok(Some(Value::String(value.to_string()))),
        None => Ok(Some(coerce_literal(value))),
        Some(InstanceType::Object | InstanceType::Array | InstanceType::Null) => Ok(None),
    }
}

fn number(ann: &Annotations<'_>, term: &TagTerm, value: &str) -> SchemaResult<Number> {
    parse_number(value).ok_or_else(|| ann.error(&term.source(), "expected a number"))
}

fn length(ann: &Annotations<'_>, term: &TagTerm, value: &str) -> SchemaResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ann.error(&term.source(), "expected a non-negative integer"))
}

/// Apply the type specific terms to a node whose type is `target`
fn apply_typed(
    node: &mut Schema,
    target: Option<InstanceType>,
    items_type: Option<InstanceType>,
    terms: &[&TagTerm],
    ann: &Annotations<'_>,
) -> SchemaResult<()> {
    let mut exclusive_minimum = false;
    let mut exclusive_maximum = false;
    let mut array_defaults = Vec::new();
    let mut item_enum = Vec::new();

    for &term in terms {
        let TagTerm::Pair { key, value } = term else {
            continue;
        };
        let numeric = matches!(target, Some(InstanceType::Integer | InstanceType::Number));
        let string = target == Some(InstanceType::String);
        let array = target == Some(InstanceType::Array);

        match key.as_str() {
            "minimum" if numeric => node.minimum = Some(number(ann, term, value)?),
            "maximum" if numeric => node.maximum = Some(number(ann, term, value)?),
            "multipleOf" if numeric => node.multiple_of = Some(number(ann, term, value)?),
            "exclusiveMinimum" if numeric => match value.as_str() {
                "true" => exclusive_minimum = true,
                "false" => exclusive_minimum = false,
                _ => node.exclusive_minimum = Some(number(ann, term, value)?),
            },
            "exclusiveMaximum" if numeric => match value.as_str() {
                "true" => exclusive_maximum = true,
                "false" => exclusive_maximum = false,
                _ => node.exclusive_maximum = Some(number(ann, term, value)?),
            },
            "minLength" if string => node.min_length = Some(length(ann, term, value)?),
            "maxLength" if string => node.max_length = Some(length(ann, term, value)?),
            "pattern" if string => {
                if value.is_empty() {
                    return Err(ann.error(&term.source(), "pattern is empty"));
                }
                node.pattern = Some(value.clone());
            }
            "format" if string => {
                if value.is_empty() {
                    return Err(ann.error(&term.source(), "format is empty"));
                }
                node.format = Some(value.clone());
            }
            "minItems" if array => node.min_items = Some(length(ann, term, value)?),
            "maxItems" if array => node.max_items = Some(length(ann, term, value)?),
            "uniqueItems" if array => node.unique_items = parse_flag(ann, term, value)?,
            "enum" if array => {
                let coerced = match items_type {
                    Some(items @ (InstanceType::Integer
                    | InstanceType::Number
                    | InstanceType::String
                    | InstanceType::Boolean)) => coerce(Some(items), value)
                        .map_err(|reason| ann.error(&term.source(), reason))?,
                    _ => None,
                };
                match (coerced, node.items.is_some()) {
                    (Some(literal), true) => item_enum.push(literal),
                    _ => ann.skip(term, items_type),
                }
            }
            "default" if array => {
                let literal = coerce(items_type, value)
                    .map_err(|reason| ann.error(&term.source(), reason))?
                    .unwrap_or_else(|| Value::String(value.clone()));
                array_defaults.push(literal);
            }
            "enum" | "default" | "example" => {
                let literal = coerce(target, value).map_err(|reason| ann.error(&term.source(), reason))?;
                match (key.as_str(), literal) {
                    ("enum", Some(literal)) => node.enum_values.push(literal),
                    ("default", Some(literal)) => node.default = Some(literal),
                    ("example", Some(literal)) => node.examples.push(literal),
                    _ => ann.skip(term, target),
                }
            }
            _ => ann.skip(term, target),
        }
    }

    if exclusive_minimum {
        if let Some(minimum) = node.minimum.take() {
            node.exclusive_minimum = Some(minimum);
        }
    }
    if exclusive_maximum {
        if let Some(maximum) = node.maximum.take() {
            node.exclusive_maximum = Some(maximum);
        }
    }
    if !array_defaults.is_empty() {
        node.default = Some(Value::Array(array_defaults));
    }
    if let Some(items) = node.items.as_mut().filter(|_| !item_enum.is_empty()) {
        if items.is_ref() {
            let reference = std::mem::take(&mut **items);
            let overlay = Schema {
                enum_values: item_enum,
                ..Default::default()
            };
            **items = compose_with_reference(reference, overlay);
        } else {
            items.enum_values.extend(item_enum);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn annotate(base: Schema, resolved: Resolved, tag: &str, extras: Option<&str>) -> SchemaResult<BuiltField> {
        let tag = SchemaTag::parse(tag).unwrap();
        let ann = Annotations {
            owner: "TestUser",
            field: "field",
            tag: &tag,
            extras,
            description: None,
        };
        apply_annotations(base, resolved, &ann)
    }

    fn typed(instance_type: InstanceType) -> (Schema, Resolved) {
        (
            Schema::typed(instance_type),
            Resolved {
                instance_type: Some(instance_type),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_string_keywords() {
        let (base, resolved) = typed(InstanceType::String);
        let built = annotate(
            base,
            resolved,
            "required,minLength=1,maxLength=20,pattern=.*,description=this is a property,title=the name,example=joe,example=lucy,default=alex,readOnly=true",
            None,
        )
        .unwrap();

        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({
                "type": "string",
                "maxLength": 20,
                "minLength": 1,
                "pattern": ".*",
                "title": "the name",
                "description": "this is a property",
                "default": "alex",
                "examples": ["joe", "lucy"],
                "readOnly": true
            })
        );
    }

    #[test]
    fn test_exclusive_flags_move_bounds() {
        let (base, resolved) = typed(InstanceType::Integer);
        let built = annotate(
            base,
            resolved,
            "minimum=18,maximum=120,exclusiveMaximum=true,exclusiveMinimum=true",
            None,
        )
        .unwrap();

        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({"type": "integer", "exclusiveMaximum": 120, "exclusiveMinimum": 18})
        );
    }

    #[test]
    fn test_numeric_keywords_ignored_on_strings() {
        let (base, resolved) = typed(InstanceType::String);
        let built = annotate(base, resolved, "minimum=3,format=email", None).unwrap();
        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({"type": "string", "format": "email"})
        );
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let (base, resolved) = typed(InstanceType::Integer);
        let err = annotate(base, resolved, "minimum=eighteen", None).unwrap_err();
        match err {
            SchemaError::InvalidAnnotation { field, term, .. } => {
                assert_eq!(field, "field");
                assert_eq!(term, "minimum=eighteen");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_enum_coercion_by_scalar_type() {
        let (base, resolved) = typed(InstanceType::Number);
        let built = annotate(base, resolved, "enum=1.0,enum=1.5,enum=2.0", None).unwrap();
        assert_eq!(built.schema.enum_values, vec![json!(1.0), json!(1.5), json!(2.0)]);

        let (base, resolved) = typed(InstanceType::Integer);
        assert!(annotate(base, resolved, "enum=red", None).is_err());
    }

    #[test]
    fn test_enum_on_sequence_constrains_items() {
        let base = Schema {
            items: Some(Box::new(Schema::typed(InstanceType::Integer))),
            ..Schema::typed(InstanceType::Array)
        };
        let resolved = Resolved {
            instance_type: Some(InstanceType::Array),
            items_type: Some(InstanceType::Integer),
            integer_enum: false,
        };
        let built = annotate(base, resolved, "enum=-1,enum=0,enum=1,enun=2", None).unwrap();

        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({
                "type": "array",
                "items": {"type": "integer", "enum": [-1, 0, 1]},
                "enun": "2"
            })
        );
    }

    #[test]
    fn test_oneof_type_replaces_type() {
        let built = annotate(Schema::default(), Resolved::default(), "oneof_type=string;array", None).unwrap();
        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({"oneOf": [{"type": "string"}, {"type": "array"}]})
        );

        assert!(annotate(Schema::default(), Resolved::default(), "oneof_type=string;tuple", None).is_err());
    }

    #[test]
    fn test_oneof_required_group() {
        let (base, resolved) = typed(InstanceType::String);
        let built = annotate(base, resolved, "oneof_required=group1", None).unwrap();
        assert_eq!(built.group.as_deref(), Some("group1"));

        let (base, resolved) = typed(InstanceType::String);
        assert!(annotate(base, resolved, "oneof_required=", None).is_err());
    }

    #[test]
    fn test_nullable_is_reported() {
        let (base, resolved) = typed(InstanceType::String);
        let built = annotate(base, resolved, "nullable", None).unwrap();
        assert!(built.nullable);
        assert!(built.schema.extras.is_empty());
    }

    #[test]
    fn test_extras_are_literal_keywords() {
        let (base, resolved) = typed(InstanceType::Integer);
        let built = annotate(base, resolved, "", Some("minimum=0")).unwrap();
        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({"type": "integer", "minimum": 0})
        );
    }

    #[test]
    fn test_reference_keeps_only_documentation() {
        let resolved = Resolved {
            instance_type: Some(InstanceType::Object),
            ..Default::default()
        };
        let built = annotate(Schema::new_ref("#/$defs/Inner"), resolved, "title=inner", None).unwrap();
        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({"$ref": "#/$defs/Inner", "title": "inner"})
        );
    }

    #[test]
    fn test_reference_constraints_compose_with_all_of() {
        let resolved = Resolved {
            instance_type: Some(InstanceType::String),
            ..Default::default()
        };
        let built = annotate(
            Schema::new_ref("#/$defs/CompactDate"),
            resolved,
            "maxLength=7,description=joined",
            None,
        )
        .unwrap();
        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({
                "allOf": [{"$ref": "#/$defs/CompactDate"}, {"maxLength": 7}],
                "description": "joined"
            })
        );
    }

    #[test]
    fn test_enum_on_referenced_items_composes_with_all_of() {
        let mut base = Schema::typed(InstanceType::Array);
        base.items = Some(Box::new(Schema::new_ref("#/$defs/CompactDate")));
        let resolved = Resolved {
            instance_type: Some(InstanceType::Array),
            items_type: Some(InstanceType::String),
            ..Default::default()
        };
        let built = annotate(base, resolved, "enum=2024-01,enum=2024-02", None).unwrap();
        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({
                "type": "array",
                "items": {
                    "allOf": [{"$ref": "#/$defs/CompactDate"}, {"enum": ["2024-01", "2024-02"]}]
                }
            })
        );
    }

    #[test]
    fn test_integer_enum_with_names_becomes_string() {
        let resolved = Resolved {
            instance_type: Some(InstanceType::Integer),
            integer_enum: true,
            ..Default::default()
        };
        let built = annotate(Schema::typed(InstanceType::Integer), resolved, "enum=Unset,enum=Great", None).unwrap();
        assert_eq!(
            built.schema.to_value().unwrap(),
            json!({"type": "string", "enum": ["Unset", "Great"]})
        );
    }
}
