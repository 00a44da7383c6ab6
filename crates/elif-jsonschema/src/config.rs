use crate::comments::CommentSource;
use crate::error::SchemaResult;
use crate::schema::Schema;
use crate::types::{Field, Reflect, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Per-type schema override hook
pub type TypeMapper = Arc<dyn Fn(&TypeRef) -> Option<Schema> + Send + Sync>;

/// Per-type stable identifier hook
pub type IdLookup = Arc<dyn Fn(&TypeRef) -> Option<String> + Send + Sync>;

/// Synthetic field injection hook
pub type AdditionalFields = Arc<dyn Fn(&TypeRef) -> Vec<Field> + Send + Sync>;

/// Configuration for schema reflection.
///
/// Built once and shared read-only by any number of reflection calls. The plain
/// options can be loaded from TOML; the hooks are set in code.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectorConfig {
    /// Prefix for the root `$id`, e.g. `https://example.com/schemas`
    pub base_schema_id: Option<String>,

    /// Do not emit `additionalProperties: false` on records
    pub allow_additional_properties: bool,

    /// Only the `required` annotation makes a property required
    pub required_from_schema_tags: bool,

    /// Emit the root record in place instead of as a `$ref` into `$defs`
    pub expanded_root: bool,

    /// Inline named types at every use site instead of referencing them
    pub do_not_reference: bool,

    /// Embedded fields follow the yaml convention: nested unless marked `inline`
    pub yaml_embedded_structs: bool,

    /// Name properties from the yaml tag instead of the json tag
    pub prefer_yaml_schema: bool,

    /// Give every definition an `$anchor` equal to its type name
    pub assign_anchor: bool,

    /// Key definitions by module path plus type name
    pub fully_qualified_names: bool,

    /// Replaces the schema of any type it returns `Some` for
    #[serde(skip)]
    pub mapper: Option<TypeMapper>,

    /// Supplies stable identifiers for types
    #[serde(skip)]
    pub lookup: Option<IdLookup>,

    /// Appends synthetic fields to a record
    #[serde(skip)]
    pub additional_fields: Option<AdditionalFields>,

    /// Records whose fields are not walked
    #[serde(skip)]
    pub ignored_types: Vec<TypeRef>,

    /// Fallback documentation source
    #[serde(skip)]
    pub comments: Option<Arc<dyn CommentSource>>,
}

impl ReflectorConfig {
    /// Create a configuration with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Load plain options from a TOML document
    pub fn from_toml_str(source: &str) -> SchemaResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load plain options from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_base_schema_id(mut self, id: impl Into<String>) -> Self {
        self.base_schema_id = Some(id.into());
        self
    }

    pub fn with_additional_properties(mut self, allow: bool) -> Self {
        self.allow_additional_properties = allow;
        self
    }

    pub fn with_required_from_schema_tags(mut self, enabled: bool) -> Self {
        self.required_from_schema_tags = enabled;
        self
    }

    pub fn with_expanded_root(mut self, expanded: bool) -> Self {
        self.expanded_root = expanded;
        self
    }

    pub fn with_do_not_reference(mut self, enabled: bool) -> Self {
        self.do_not_reference = enabled;
        self
    }

    pub fn with_yaml_embedded_structs(mut self, enabled: bool) -> Self {
        self.yaml_embedded_structs = enabled;
        self
    }

    pub fn with_prefer_yaml_schema(mut self, enabled: bool) -> Self {
        self.prefer_yaml_schema = enabled;
        self
    }

    pub fn with_assign_anchor(mut self, enabled: bool) -> Self {
        self.assign_anchor = enabled;
        self
    }

    pub fn with_fully_qualified_names(mut self, enabled: bool) -> Self {
        self.fully_qualified_names = enabled;
        self
    }

    pub fn with_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&TypeRef) -> Option<Schema> + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&TypeRef) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    pub fn with_additional_fields<F>(mut self, fields: F) -> Self
    where
        F: Fn(&TypeRef) -> Vec<Field> + Send + Sync + 'static,
    {
        self.additional_fields = Some(Arc::new(fields));
        self
    }

    /// Skip walking the fields of `T`
    pub fn ignore_type<T: Reflect>(mut self) -> Self {
        self.ignored_types.push(TypeRef::of::<T>());
        self
    }

    pub fn with_comments(mut self, comments: impl CommentSource + 'static) -> Self {
        self.comments = Some(Arc::new(comments));
        self
    }

    pub(crate) fn is_ignored(&self, ty: &TypeRef) -> bool {
        self.ignored_types.contains(ty)
    }
}

impl fmt::Debug for ReflectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectorConfig")
            .field("base_schema_id", &self.base_schema_id)
            .field("allow_additional_properties", &self.allow_additional_properties)
            .field("required_from_schema_tags", &self.required_from_schema_tags)
            .field("expanded_root", &self.expanded_root)
            .field("do_not_reference", &self.do_not_reference)
            .field("yaml_embedded_structs", &self.yaml_embedded_structs)
            .field("prefer_yaml_schema", &self.prefer_yaml_schema)
            .field("assign_anchor", &self.assign_anchor)
            .field("fully_qualified_names", &self.fully_qualified_names)
            .field("mapper", &self.mapper.is_some())
            .field("lookup", &self.lookup.is_some())
            .field("additional_fields", &self.additional_fields.is_some())
            .field("ignored_types", &self.ignored_types)
            .field("comments", &self.comments.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ReflectorConfig::default();
        assert!(config.base_schema_id.is_none());
        assert!(!config.allow_additional_properties);
        assert!(!config.do_not_reference);
        assert!(config.mapper.is_none());
    }

    #[test]
    fn test_from_toml_str() {
        let config = ReflectorConfig::from_toml_str(
            r#"
            base_schema_id = "https://example.com/schemas"
            expanded_root = true
            assign_anchor = true
            "#,
        )
        .unwrap();

        assert_eq!(config.base_schema_id.as_deref(), Some("https://example.com/schemas"));
        assert!(config.expanded_root);
        assert!(config.assign_anchor);
        assert!(!config.do_not_reference);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "do_not_reference = true").unwrap();

        let config = ReflectorConfig::from_toml_file(file.path()).unwrap();
        assert!(config.do_not_reference);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = ReflectorConfig::from_toml_str("expanded_root = \"yes\"").unwrap_err();
        assert!(matches!(err, crate::error::SchemaError::Config(_)));
    }

    #[test]
    fn test_config_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReflectorConfig>();
    }
}
