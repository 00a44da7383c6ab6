/*!
# elif-jsonschema

JSON Schema (draft 2020-12) generation from reflected Rust type definitions.

Types describe their own shape through the [`Reflect`] trait, usually via
`#[derive(Reflect)]`. Field annotations carry schema constraints in a compact
tag grammar, and the [`Reflector`] walks the type graph to produce one ordered,
deterministic document with shared `$defs`.

## Features

- Records, sequences, maps and well-known types (timestamps, URLs, UUIDs, IP addresses)
- Constraint annotations: `required,minLength=1,pattern=.*,enum=a,enum=b`
- Embedded fields promoted into their container
- `$ref` / `$defs` extraction, `$anchor` labels and cycle-safe recursion
- Per-type overrides, stable identifiers and synthetic fields via configuration hooks

## Usage

```rust,no_run
use elif_jsonschema::{Reflect, Reflector, ReflectorConfig};

#[derive(Reflect)]
pub struct User {
    #[reflect(json = "id", schema = "required")]
    pub id: i64,
    /// Display name
    #[reflect(json = "name", schema = "minLength=1,maxLength=20")]
    pub name: String,
}

let config = ReflectorConfig::new().with_base_schema_id("https://example.com/schemas");
let schema = Reflector::new(config).reflect::<User>().unwrap();
println!("{}", serde_json::to_string_pretty(&schema).unwrap());
```
*/

extern crate self as elif_jsonschema;

// Re-export main types
pub use crate::{
    comments::{CommentMap, CommentSource},
    config::ReflectorConfig,
    error::{SchemaError, SchemaResult},
    reflector::Reflector,
    schema::{AdditionalProperties, Definitions, InstanceType, Schema, SchemaMap},
    types::{Field, FieldTags, Reflect, SchemaOverride, TypeDef, TypeKind, TypeRef, WellKnown},
};

// Re-export the derive macro from the proc-macro crate
pub use elif_jsonschema_derive::Reflect;

// Core modules
pub mod config;
pub mod error;
pub mod schema;
pub mod types;

// Annotation grammar
pub mod tags;

// Reflection
pub mod classify;
pub mod comments;
pub mod reflector;

mod builder;
mod definitions;
mod impls;
mod utils;

pub use utils::to_kebab_case;
