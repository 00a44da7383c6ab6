//! Field annotation grammar.
//!
//! A schema annotation is a comma separated list of terms. Each term is either a
//! bare keyword (`required`) or a `key=value` pair (`minLength=1`). A backslash
//! directly before a comma escapes it; any other backslash is kept literally.

use crate::utils::coerce_literal;
use serde_json::{Map, Value};

/// Keys whose values accumulate instead of being overwritten
pub const REPEATABLE_KEYS: &[&str] = &["enum", "example"];

/// A single parsed annotation term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTerm {
    Keyword(String),
    Pair { key: String, value: String },
}

impl TagTerm {
    fn parse(raw: &str) -> Result<Self, TagError> {
        match raw.split_once('=') {
            Some(("", _)) => Err(TagError::new(raw, "missing key before `=`")),
            Some((key, value)) => Ok(Self::Pair {
                key: key.to_string(),
                value: value.to_string(),
            }),
            None => Ok(Self::Keyword(raw.to_string())),
        }
    }

    /// The keyword, or the key of a pair
    pub fn key(&self) -> &str {
        match self {
            Self::Keyword(keyword) => keyword,
            Self::Pair { key, .. } => key,
        }
    }

    /// Render the term back to its source form for error messages
    pub fn source(&self) -> String {
        match self {
            Self::Keyword(keyword) => keyword.clone(),
            Self::Pair { key, value } => format!("{}={}", key, value),
        }
    }
}

/// Grammar-level failure, before field context is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagError {
    pub term: String,
    pub reason: String,
}

impl TagError {
    fn new(term: &str, reason: &str) -> Self {
        Self {
            term: term.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Split an annotation on commas that are not escaped with a backslash.
///
/// The escaping backslash is dropped; empty terms are preserved.
pub fn split_on_unescaped_commas(tag: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();

    for c in tag.chars() {
        if c == ',' {
            if current.ends_with('\\') {
                current.pop();
                current.push(',');
            } else {
                terms.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    terms.push(current);

    terms
}

/// An odd run of trailing backslashes leaves the last one escaping nothing
fn has_dangling_escape(tag: &str) -> bool {
    tag.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Parsed primary schema annotation of a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaTag {
    /// The annotation starts with `-`; every other term is ignored
    pub excluded: bool,
    pub terms: Vec<TagTerm>,
}

impl SchemaTag {
    pub fn parse(tag: &str) -> Result<Self, TagError> {
        if tag.is_empty() {
            return Ok(Self::default());
        }
        if has_dangling_escape(tag) {
            return Err(TagError::new(tag, "dangling escape at end of annotation"));
        }

        let raw = split_on_unescaped_commas(tag);
        if raw.first().map(String::as_str) == Some("-") {
            return Ok(Self {
                excluded: true,
                terms: Vec::new(),
            });
        }

        let terms = raw
            .iter()
            .filter(|term| !term.is_empty())
            .map(|term| TagTerm::parse(term))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            excluded: false,
            terms,
        })
    }

    /// Is the bare keyword present?
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.terms
            .iter()
            .any(|term| matches!(term, TagTerm::Keyword(k) if k == keyword))
    }

    /// Last value for a key
    pub fn value(&self, key: &str) -> Option<&str> {
        self.terms.iter().rev().find_map(|term| match term {
            TagTerm::Pair { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// All values for a repeatable key, in declaration order
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.terms
            .iter()
            .filter_map(|term| match term {
                TagTerm::Pair { key: k, value } if k == key => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Split a semicolon delimited sub-list such as `oneof_type=string;array`
pub fn split_sub_list(value: &str) -> Vec<&str> {
    value.split(';').map(str::trim).collect()
}

/// A serialization name annotation (`json` / `yaml`): a name followed by options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTag {
    pub name: String,
    pub options: Vec<String>,
}

impl NameTag {
    pub fn parse(tag: &str) -> Self {
        let mut parts = tag.split(',');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let options = parts.map(|p| p.trim().to_string()).collect();
        Self { name, options }
    }

    /// `-` excludes the field from this serialization format
    pub fn is_ignored(&self) -> bool {
        self.name == "-" && self.options.is_empty()
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    pub fn is_inline(&self) -> bool {
        self.has_option("inline")
    }

    pub fn omits_empty(&self) -> bool {
        self.has_option("omitempty")
    }
}

/// Parse an extras annotation into literal keywords.
///
/// Values are coerced to booleans or numbers where unambiguous; a repeated key
/// collects its values into an array.
pub fn parse_extras(tag: &str) -> Result<Map<String, Value>, TagError> {
    let mut extras = Map::new();
    if tag.is_empty() {
        return Ok(extras);
    }
    if has_dangling_escape(tag) {
        return Err(TagError::new(tag, "dangling escape at end of annotation"));
    }

    for raw in split_on_unescaped_commas(tag) {
        if raw.is_empty() {
            continue;
        }
        let (key, value) = match TagTerm::parse(&raw)? {
            TagTerm::Pair { key, value } => (key, coerce_literal(&value)),
            TagTerm::Keyword(keyword) => (keyword, Value::Bool(true)),
        };

        match extras.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                extras.insert(key, value);
            }
        }
    }

    Ok(extras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_on_unescaped_commas() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            (r"Hello,this,is\,a\,string,haha", vec!["Hello", "this", "is,a,string", "haha"]),
            (r"hello,no\\,split", vec!["hello", r"no\,split"]),
            ("string without commas", vec!["string without commas"]),
            (r"ünicode,𐂄,Ж\,П,ᠳ", vec!["ünicode", "𐂄", "Ж,П", "ᠳ"]),
            ("empty,,tag", vec!["empty", "", "tag"]),
        ];

        for (input, expected) in cases {
            assert_eq!(split_on_unescaped_commas(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_leading_dash_excludes_everything() {
        let tag = SchemaTag::parse("-,required").unwrap();
        assert!(tag.excluded);
        assert!(!tag.has_keyword("required"));
    }

    #[test]
    fn test_dash_elsewhere_is_a_keyword() {
        let tag = SchemaTag::parse("required,-").unwrap();
        assert!(!tag.excluded);
        assert!(tag.has_keyword("-"));
    }

    #[test]
    fn test_repeated_enum_values_accumulate() {
        let tag = SchemaTag::parse("enum=red,enum=green,enum=blue").unwrap();
        assert_eq!(tag.values("enum"), vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_value_split_on_first_equals_only() {
        let tag = SchemaTag::parse(r"pattern=^a=b$,minLength=1").unwrap();
        assert_eq!(tag.value("pattern"), Some("^a=b$"));
        assert_eq!(tag.value("minLength"), Some("1"));
    }

    #[test]
    fn test_escaped_comma_inside_pattern() {
        let tag = SchemaTag::parse(r"minLength=1,pattern=[0-9]{1\,4},maxLength=50").unwrap();
        assert_eq!(tag.value("pattern"), Some("[0-9]{1,4}"));
        assert_eq!(tag.terms.len(), 3);
    }

    #[test]
    fn test_dangling_escape_is_rejected() {
        let err = SchemaTag::parse(r"pattern=abc\").unwrap_err();
        assert!(err.reason.contains("dangling"));
    }

    #[test]
    fn test_escaped_trailing_backslash_is_literal() {
        let tag = SchemaTag::parse(r"pattern=a\\\\").unwrap();
        assert_eq!(tag.value("pattern"), Some(r"a\\\\"));

        let extras = parse_extras(r"separator=\\").unwrap();
        assert_eq!(extras["separator"], json!(r"\\"));
    }

    #[test]
    fn test_odd_trailing_backslashes_are_rejected() {
        assert!(SchemaTag::parse(r"pattern=a\\\").is_err());
        assert!(parse_extras(r"separator=\").is_err());
    }

    #[test]
    fn test_missing_key_is_rejected() {
        assert!(SchemaTag::parse("=oops").is_err());
    }

    #[test]
    fn test_name_tag_options() {
        let tag = NameTag::parse("friends,omitempty");
        assert_eq!(tag.name, "friends");
        assert!(tag.omits_empty());
        assert!(!tag.is_inline());

        assert!(NameTag::parse(",inline").is_inline());
        assert!(NameTag::parse("-").is_ignored());
        assert!(!NameTag::parse("-,").is_ignored());
    }

    #[test]
    fn test_extras_coercion_and_repeats() {
        let extras = parse_extras("foo=bar,hello=world,foo=bar1,minimum=0,flag=true").unwrap();
        assert_eq!(
            Value::Object(extras),
            json!({
                "foo": ["bar", "bar1"],
                "hello": "world",
                "minimum": 0,
                "flag": true
            })
        );
    }

    #[test]
    fn test_sub_list() {
        assert_eq!(split_sub_list("string;array"), vec!["string", "array"]);
    }
}
