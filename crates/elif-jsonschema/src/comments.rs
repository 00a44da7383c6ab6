//! Documentation lookup for types and fields.
//!
//! The reflector asks a [`CommentSource`] for descriptions it could not find in
//! annotations or doc comments. A failing source never fails reflection.

use std::collections::HashMap;

/// Supplies documentation for a type (`field == None`) or one of its fields
pub trait CommentSource: Send + Sync {
    fn lookup(&self, type_path: &str, field: Option<&str>) -> anyhow::Result<Option<String>>;
}

/// In-memory comment table keyed by `module::Type` and `module::Type.field`
#[derive(Debug, Clone, Default)]
pub struct CommentMap {
    entries: HashMap<String, String>,
}

impl CommentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the comment of a type
    pub fn with_type(mut self, type_path: &str, comment: impl Into<String>) -> Self {
        self.entries.insert(type_path.to_string(), comment.into());
        self
    }

    /// Add the comment of a field
    pub fn with_field(mut self, type_path: &str, field: &str, comment: impl Into<String>) -> Self {
        self.entries
            .insert(format!("{}.{}", type_path, field), comment.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CommentSource for CommentMap {
    fn lookup(&self, type_path: &str, field: Option<&str>) -> anyhow::Result<Option<String>> {
        let key = match field {
            Some(field) => format!("{}.{}", type_path, field),
            None => type_path.to_string(),
        };
        Ok(self.entries.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_map_lookup() {
        let comments = CommentMap::new()
            .with_type("app::User", "A registered user")
            .with_field("app::User", "name", "Display name");

        assert_eq!(
            comments.lookup("app::User", None).unwrap().as_deref(),
            Some("A registered user")
        );
        assert_eq!(
            comments.lookup("app::User", Some("name")).unwrap().as_deref(),
            Some("Display name")
        );
        assert!(comments.lookup("app::User", Some("email")).unwrap().is_none());
    }
}
