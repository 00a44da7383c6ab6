use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// JSON Schema dialect emitted in `$schema`
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// Prefix for references into the definitions table
pub const DEFINITIONS_PREFIX: &str = "#/$defs/";

/// Primitive JSON Schema instance types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl InstanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "null" => Ok(Self::Null),
            other => Err(format!("unknown JSON Schema type `{}`", other)),
        }
    }
}

/// Insertion-ordered map from names to schema nodes.
///
/// Used for `properties` and `$defs`, where the order of first insertion is
/// part of the output contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMap {
    entries: Vec<(String, Schema)>,
}

/// The definitions section of a document
pub type Definitions = SchemaMap;

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a schema. Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, schema: Schema) -> Option<Schema> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, schema)),
            None => {
                self.entries.push((key, schema));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Schema> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Schema> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove an entry, preserving the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<Schema> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SchemaMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, schema) in &self.entries {
            map.serialize_entry(key, schema)?;
        }
        map.end()
    }
}

/// `additionalProperties` is either a boolean schema or a full schema
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// One node of a JSON Schema document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// `$schema`, only set on the document root
    pub version: Option<String>,
    /// `$id`
    pub id: Option<String>,
    /// `$anchor`
    pub anchor: Option<String>,
    /// `$ref`
    pub reference: Option<String>,
    pub all_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub one_of: Vec<Schema>,
    pub items: Option<Box<Schema>>,
    pub properties: Option<SchemaMap>,
    pub additional_properties: Option<AdditionalProperties>,
    /// `type`; absent for pure compositions and untyped values
    pub instance_type: Option<InstanceType>,
    pub enum_values: Vec<Value>,
    pub multiple_of: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub minimum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: bool,
    pub required: Vec<String>,
    pub format: Option<String>,
    pub content_encoding: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub read_only: bool,
    pub write_only: bool,
    pub examples: Vec<Value>,
    /// Literal custom keywords; they win over typed keywords of the same name
    pub extras: Map<String, Value>,
    /// `$defs`, only set on the document root
    pub definitions: Option<Definitions>,
}

impl Schema {
    /// A node constrained to a single instance type
    pub fn typed(instance_type: InstanceType) -> Self {
        Self {
            instance_type: Some(instance_type),
            ..Default::default()
        }
    }

    /// A string node with a format
    pub fn formatted(format: &str) -> Self {
        Self {
            instance_type: Some(InstanceType::String),
            format: Some(format.to_string()),
            ..Default::default()
        }
    }

    /// A pure reference node
    pub fn new_ref(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Default::default()
        }
    }

    /// An object node with an empty, ordered property list
    pub fn object() -> Self {
        Self {
            instance_type: Some(InstanceType::Object),
            properties: Some(SchemaMap::new()),
            ..Default::default()
        }
    }

    pub fn is_ref(&self) -> bool {
        self.reference.is_some()
    }

    /// Add a property name to `required`, keeping it unique
    pub fn push_required(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Move the documentation keywords of this node into a fresh node,
    /// leaving only constraining keywords behind.
    pub(crate) fn take_documentation(&mut self) -> Schema {
        Schema {
            anchor: self.anchor.take(),
            title: self.title.take(),
            description: self.description.take(),
            default: self.default.take(),
            read_only: std::mem::take(&mut self.read_only),
            write_only: std::mem::take(&mut self.write_only),
            examples: std::mem::take(&mut self.examples),
            ..Default::default()
        }
    }

    /// Attach documentation keywords taken with [`Schema::take_documentation`]
    pub(crate) fn merge_documentation(&mut self, docs: Schema) {
        if docs.anchor.is_some() {
            self.anchor = docs.anchor;
        }
        if docs.title.is_some() {
            self.title = docs.title;
        }
        if docs.description.is_some() {
            self.description = docs.description;
        }
        if docs.default.is_some() {
            self.default = docs.default;
        }
        self.read_only |= docs.read_only;
        self.write_only |= docs.write_only;
        self.examples.extend(docs.examples);
    }

    /// True when the node places no constraint on instances
    pub fn is_empty(&self) -> bool {
        *self == Schema::default()
    }

    /// Serialize to a `serde_json::Value`
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extras = &self.extras;
        let mut map = serializer.serialize_map(None)?;

        macro_rules! entry {
            ($key:expr, $value:expr) => {
                if !extras.contains_key($key) {
                    map.serialize_entry($key, $value)?;
                }
            };
        }
        macro_rules! opt {
            ($key:expr, $field:expr) => {
                if let Some(value) = &$field {
                    entry!($key, value);
                }
            };
        }
        macro_rules! list {
            ($key:expr, $field:expr) => {
                if !$field.is_empty() {
                    entry!($key, &$field);
                }
            };
        }
        macro_rules! flag {
            ($key:expr, $field:expr) => {
                if $field {
                    entry!($key, &true);
                }
            };
        }

        opt!("$schema", self.version);
        opt!("$id", self.id);
        opt!("$anchor", self.anchor);
        opt!("$ref", self.reference);
        list!("allOf", self.all_of);
        list!("anyOf", self.any_of);
        list!("oneOf", self.one_of);
        opt!("items", self.items);
        opt!("properties", self.properties);
        opt!("additionalProperties", self.additional_properties);
        opt!("type", self.instance_type);
        list!("enum", self.enum_values);
        opt!("multipleOf", self.multiple_of);
        opt!("maximum", self.maximum);
        opt!("exclusiveMaximum", self.exclusive_maximum);
        opt!("minimum", self.minimum);
        opt!("exclusiveMinimum", self.exclusive_minimum);
        opt!("maxLength", self.max_length);
        opt!("minLength", self.min_length);
        opt!("pattern", self.pattern);
        opt!("maxItems", self.max_items);
        opt!("minItems", self.min_items);
        flag!("uniqueItems", self.unique_items);
        list!("required", self.required);
        opt!("format", self.format);
        opt!("contentEncoding", self.content_encoding);
        opt!("title", self.title);
        opt!("description", self.description);
        opt!("default", self.default);
        flag!("readOnly", self.read_only);
        flag!("writeOnly", self.write_only);
        list!("examples", self.examples);

        for (key, value) in extras {
            map.serialize_entry(key, value)?;
        }

        if let Some(definitions) = &self.definitions {
            if !definitions.is_empty() {
                map.serialize_entry("$defs", definitions)?;
            }
        }

        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_map_keeps_insertion_order() {
        let mut map = SchemaMap::new();
        map.insert("zeta", Schema::typed(InstanceType::String));
        map.insert("alpha", Schema::typed(InstanceType::Integer));
        map.insert("zeta", Schema::typed(InstanceType::Boolean));

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(
            map.get("zeta").unwrap().instance_type,
            Some(InstanceType::Boolean)
        );

        map.remove("zeta");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["alpha"]);
    }

    #[test]
    fn test_extras_override_typed_keywords() {
        let mut schema = Schema::typed(InstanceType::Integer);
        schema.minimum = Some(Number::from(5));
        schema.extras.insert("minimum".to_string(), json!(0));

        let value = schema.to_value().unwrap();
        assert_eq!(value, json!({"type": "integer", "minimum": 0}));
    }

    #[test]
    fn test_empty_schema_serializes_as_empty_object() {
        assert_eq!(Schema::default().to_value().unwrap(), json!({}));
        assert!(Schema::default().is_empty());
    }

    #[test]
    fn test_additional_properties_boolean() {
        let mut schema = Schema::object();
        schema.additional_properties = Some(AdditionalProperties::Allowed(false));

        assert_eq!(
            schema.to_value().unwrap(),
            json!({"properties": {}, "additionalProperties": false, "type": "object"})
        );
    }

    #[test]
    fn test_instance_type_round_trip_through_str() {
        assert_eq!("array".parse::<InstanceType>(), Ok(InstanceType::Array));
        assert!("tuple".parse::<InstanceType>().is_err());
    }
}
