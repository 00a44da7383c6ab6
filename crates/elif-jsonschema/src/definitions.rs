//! Definition keys, references and cycle tracking for one reflection call

use crate::config::ReflectorConfig;
use crate::schema::{Definitions, InstanceType, Schema, SchemaMap, DEFINITIONS_PREFIX};
use crate::types::{TypeDef, TypeKind, TypeRef};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Where a definable type lives in the output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Assignment {
    /// Key in `$defs`
    pub key: String,
    /// Value used in `$ref` at use sites
    pub reference: String,
    /// Stable identifier supplied by the lookup hook
    pub lookup_id: Option<String>,
}

/// Per-call bookkeeping of named types.
///
/// Slots in the definitions table are reserved on first visit so the table
/// follows first-visit order even though nested types finish building first.
#[derive(Debug, Default)]
pub(crate) struct RefManager {
    definitions: SchemaMap,
    assignments: HashMap<TypeId, Assignment>,
    keys: HashMap<String, TypeId>,
    active: HashSet<TypeId>,
    cyclic: HashSet<TypeId>,
    built: HashMap<TypeId, Schema>,
    reference_types: HashMap<String, InstanceType>,
    in_place_root: Option<TypeId>,
}

impl RefManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root type is rendered at the document root; references to it use `#`
    pub fn set_in_place_root(&mut self, id: TypeId) {
        self.in_place_root = Some(id);
    }

    pub fn assignment(&self, id: TypeId) -> Option<&Assignment> {
        self.assignments.get(&id)
    }

    /// Assign a key and reference to a type seen for the first time
    pub fn assign(&mut self, ty: &TypeRef, def: &TypeDef, config: &ReflectorConfig) -> Assignment {
        let id = ty.id();
        if let Some(existing) = self.assignments.get(&id) {
            return existing.clone();
        }

        let key = self.derive_key(id, def, config);
        let lookup_id = config.lookup.as_ref().and_then(|lookup| lookup(ty));
        let reference = if self.in_place_root == Some(id) {
            "#".to_string()
        } else if let Some(lookup_id) = &lookup_id {
            lookup_id.clone()
        } else {
            format!("{}{}", DEFINITIONS_PREFIX, key)
        };

        trace!(key = %key, reference = %reference, "assigned definition");

        self.keys.insert(key.clone(), id);
        self.definitions.insert(key.clone(), Schema::default());
        if matches!(def.kind, TypeKind::Record(_)) && def.custom_schema.is_none() {
            self.reference_types
                .insert(reference.clone(), InstanceType::Object);
        }

        let assignment = Assignment {
            key,
            reference,
            lookup_id,
        };
        self.assignments.insert(id, assignment.clone());
        assignment
    }

    fn derive_key(&self, id: TypeId, def: &TypeDef, config: &ReflectorConfig) -> String {
        let short = def.display_name();
        let qualified = def
            .qualified_name()
            .map(|name| name.replace("::", "."))
            .unwrap_or_else(|| short.clone());
        let preferred = if config.fully_qualified_names {
            qualified.clone()
        } else {
            short
        };

        let free = |candidate: &str| match self.keys.get(candidate) {
            Some(owner) => *owner == id,
            None => true,
        };

        if free(&preferred) {
            return preferred;
        }
        if free(&qualified) {
            return qualified;
        }
        (2..)
            .map(|n| format!("{}{}", qualified, n))
            .find(|candidate| free(candidate))
            .unwrap_or(qualified)
    }

    pub fn enter(&mut self, id: TypeId) {
        self.active.insert(id);
    }

    pub fn leave(&mut self, id: TypeId) {
        self.active.remove(&id);
    }

    pub fn is_active(&self, id: TypeId) -> bool {
        self.active.contains(&id)
    }

    /// A use site was reached while the type was still being built
    pub fn mark_cyclic(&mut self, id: TypeId) {
        self.cyclic.insert(id);
    }

    /// Record the finished node of a type and decide whether it stays in `$defs`
    pub fn store(&mut self, id: TypeId, node: Schema, config: &ReflectorConfig) {
        let Some(assignment) = self.assignments.get(&id) else {
            return;
        };

        if let Some(instance_type) = node.instance_type {
            self.reference_types
                .insert(assignment.reference.clone(), instance_type);
        }

        let in_place = self.in_place_root == Some(id);
        let keep = !in_place
            && (!config.do_not_reference || node.anchor.is_some() || self.cyclic.contains(&id));

        if keep {
            self.definitions.insert(assignment.key.clone(), node.clone());
        } else {
            self.definitions.remove(&assignment.key);
        }
        self.built.insert(id, node);
    }

    /// Copy of a finished node for inlining at a use site
    pub fn inline_copy(&self, id: TypeId) -> Option<Schema> {
        self.built.get(&id).map(|node| Schema {
            id: None,
            anchor: None,
            ..node.clone()
        })
    }

    /// Take the full node of a finished type, identifiers included
    pub fn take_built(&mut self, id: TypeId) -> Option<Schema> {
        self.built.remove(&id)
    }

    /// Instance type behind a reference, when known
    pub fn instance_type_of(&self, reference: &str) -> Option<InstanceType> {
        self.reference_types.get(reference).copied()
    }

    pub fn into_definitions(self) -> Option<Definitions> {
        if self.definitions.is_empty() {
            None
        } else {
            Some(self.definitions)
        }
    }
}
