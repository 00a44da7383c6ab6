//! The reflection walk: records, fields, embedding and document assembly

use crate::builder::{apply_annotations, Annotations, Resolved};
use crate::classify::{classify, is_definable, peel, well_known_schema, Shape};
use crate::config::ReflectorConfig;
use crate::definitions::RefManager;
use crate::error::{SchemaError, SchemaResult};
use crate::schema::{AdditionalProperties, InstanceType, Schema, DRAFT_2020_12};
use crate::tags::{NameTag, SchemaTag};
use crate::types::{Field, Reflect, TypeDef, TypeKind, TypeRef};
use crate::utils::to_kebab_case;
use std::any::TypeId;
use tracing::{debug, trace};

/// Generates JSON Schema documents from reflectable types.
///
/// A reflector only holds its configuration; every call builds its own
/// definitions table, so one reflector can serve many threads at once.
#[derive(Debug, Clone, Default)]
pub struct Reflector {
    config: ReflectorConfig,
}

impl Reflector {
    pub fn new(config: ReflectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReflectorConfig {
        &self.config
    }

    /// Reflect `T` into a complete schema document
    pub fn reflect<T: Reflect + ?Sized>(&self) -> SchemaResult<Schema> {
        self.reflect_from_type(TypeRef::of::<T>())
    }

    /// Reflect `T` and render the document as pretty-printed JSON
    pub fn reflect_to_string<T: Reflect + ?Sized>(&self) -> SchemaResult<String> {
        let schema = self.reflect::<T>()?;
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    /// Reflect the type behind a handle into a complete schema document
    pub fn reflect_from_type(&self, ty: TypeRef) -> SchemaResult<Schema> {
        let (root, def) = peel(ty);
        let root_name = def
            .name
            .clone()
            .unwrap_or_else(|| ty.rust_name().to_string());

        match classify(&def) {
            Shape::Record(_) | Shape::Mapping { .. } | Shape::Custom(_) => {}
            _ => return Err(SchemaError::InvalidRootType(root_name)),
        }

        debug!(root = %root_name, "reflecting schema");

        let mut walk = Walk::new(&self.config);
        let definable = is_definable(&def);
        let in_place = definable && (self.config.expanded_root || self.config.do_not_reference);
        if in_place {
            walk.refs.set_in_place_root(root.id());
        }

        let site = Site {
            owner: &root_name,
            field: "",
        };
        let top = walk.resolve(root, site)?;
        let mut document = if in_place {
            walk.refs.take_built(root.id()).unwrap_or(top)
        } else {
            top
        };

        let root_has_lookup = walk
            .refs
            .assignment(root.id())
            .map(|assignment| assignment.lookup_id.is_some())
            .unwrap_or(false);
        if document.id.is_none() && !root_has_lookup {
            if let (Some(base), Some(name)) = (&self.config.base_schema_id, def.name.as_deref()) {
                document.id = Some(format!("{}/{}", base.trim_end_matches('/'), to_kebab_case(name)));
            }
        }

        document.version = Some(DRAFT_2020_12.to_string());
        document.definitions = walk.refs.into_definitions();

        debug!(
            root = %root_name,
            definitions = document.definitions.as_ref().map(|d| d.len()).unwrap_or(0),
            "schema reflected"
        );
        Ok(document)
    }
}

/// Error context for the type being resolved
#[derive(Clone, Copy)]
struct Site<'s> {
    owner: &'s str,
    field: &'s str,
}

/// How a field ends up in its record
enum Disposition {
    Skip,
    /// Splice the fields of the embedded type into the container
    Promote { required: bool },
    Property { name: String, required: bool },
}

/// State of a single reflection call
struct Walk<'c> {
    config: &'c ReflectorConfig,
    refs: RefManager,
    /// Records whose fields are currently being spliced into one container
    embedding: Vec<TypeId>,
}

impl<'c> Walk<'c> {
    fn new(config: &'c ReflectorConfig) -> Self {
        Self {
            config,
            refs: RefManager::new(),
            embedding: Vec::new(),
        }
    }

    /// Schema of a type at a use site: a reference, an inlined copy or a
    /// structural node
    fn resolve(&mut self, ty: TypeRef, site: Site<'_>) -> SchemaResult<Schema> {
        let config = self.config;
        let mut current = ty;
        loop {
            if let Some(mapper) = &config.mapper {
                if let Some(schema) = mapper(&current) {
                    return Ok(schema);
                }
            }

            let def = current.def();
            if is_definable(&def) {
                return self.reference(current, def, site);
            }

            match classify(&def) {
                Shape::Transparent(target) => current = target,
                shape => return self.build(current, &def, shape, site),
            }
        }
    }

    fn reference(&mut self, ty: TypeRef, def: TypeDef, site: Site<'_>) -> SchemaResult<Schema> {
        let id = ty.id();

        if let Some(assignment) = self.refs.assignment(id) {
            let reference = assignment.reference.clone();
            if self.refs.is_active(id) {
                trace!(reference = %reference, "cyclic reference");
                self.refs.mark_cyclic(id);
                return Ok(Schema::new_ref(reference));
            }
            if !self.config.do_not_reference {
                return Ok(Schema::new_ref(reference));
            }
            return Ok(self
                .refs
                .inline_copy(id)
                .unwrap_or_else(|| Schema::new_ref(reference)));
        }

        let assignment = self.refs.assign(&ty, &def, self.config);
        self.refs.enter(id);
        let built = self.build(ty, &def, classify(&def), site);
        self.refs.leave(id);
        let mut node = built?;

        if node.anchor.is_none() {
            node.anchor = def
                .anchor
                .clone()
                .or_else(|| self.config.assign_anchor.then(|| def.display_name()));
        }
        if let Some(lookup_id) = &assignment.lookup_id {
            node.id = Some(lookup_id.clone());
        }
        self.refs.store(id, node, self.config);

        if self.config.do_not_reference {
            if let Some(copy) = self.refs.inline_copy(id) {
                return Ok(copy);
            }
        }
        Ok(Schema::new_ref(assignment.reference))
    }

    fn build(
        &mut self,
        ty: TypeRef,
        def: &TypeDef,
        shape: Shape<'_>,
        site: Site<'_>,
    ) -> SchemaResult<Schema> {
        match shape {
            Shape::Custom(schema) => Ok(schema()),
            Shape::WellKnown(known) => Ok(well_known_schema(known)),
            Shape::IntegerEnum => Ok(Schema {
                description: def.description.clone(),
                ..Schema::typed(InstanceType::Integer)
            }),
            Shape::Primitive(instance_type) => Ok(Schema::typed(instance_type)),
            Shape::Any => Ok(Schema::default()),
            Shape::Sequence { items, len } => {
                let mut node = Schema::typed(InstanceType::Array);
                node.items = Some(Box::new(self.resolve(items, site)?));
                if let Some(len) = len {
                    node.min_items = Some(len as u64);
                    node.max_items = Some(len as u64);
                }
                Ok(node)
            }
            Shape::Mapping { value, .. } => {
                let mut node = Schema::typed(InstanceType::Object);
                let value = self.resolve(value, site)?;
                if !value.is_empty() {
                    node.additional_properties = Some(AdditionalProperties::Schema(Box::new(value)));
                }
                Ok(node)
            }
            Shape::Record(fields) => self.build_record(ty, def, fields),
            Shape::Transparent(target) => self.resolve(target, site),
            Shape::Unsupported(reason) => {
                Err(SchemaError::unsupported_error(site.owner, site.field, reason))
            }
        }
    }

    fn build_record(&mut self, ty: TypeRef, def: &TypeDef, fields: &[Field]) -> SchemaResult<Schema> {
        let mut node = Schema::object();
        node.description = def
            .description
            .clone()
            .or_else(|| self.comment(def, None));
        if !self.config.allow_additional_properties {
            node.additional_properties = Some(AdditionalProperties::Allowed(false));
        }
        if self.config.is_ignored(&ty) {
            trace!(record = %def.display_name(), "fields not walked for ignored type");
            return Ok(node);
        }

        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        let outer = std::mem::replace(&mut self.embedding, vec![ty.id()]);
        let walked = self.walk_fields(ty, def, fields, &mut node, &mut groups);
        self.embedding = outer;
        walked?;

        for (label, required) in groups {
            node.one_of.push(Schema {
                title: Some(label),
                required,
                ..Default::default()
            });
        }
        Ok(node)
    }

    /// Declared fields first, then the synthetic ones
    fn walk_fields(
        &mut self,
        ty: TypeRef,
        def: &TypeDef,
        fields: &[Field],
        node: &mut Schema,
        groups: &mut Vec<(String, Vec<String>)>,
    ) -> SchemaResult<()> {
        for field in fields {
            self.field(def, field, node, groups)?;
        }
        let config = self.config;
        if let Some(additional) = &config.additional_fields {
            for field in additional(&ty) {
                self.field(def, &field, node, groups)?;
            }
        }
        Ok(())
    }

    fn field(
        &mut self,
        owner: &TypeDef,
        field: &Field,
        node: &mut Schema,
        groups: &mut Vec<(String, Vec<String>)>,
    ) -> SchemaResult<()> {
        let owner_name = owner.display_name();
        let tag = SchemaTag::parse(field.tags.schema.as_deref().unwrap_or_default()).map_err(|e| {
            SchemaError::annotation_error(&owner_name, &field.ident, &e.term, e.reason)
        })?;

        match self.disposition(field, &tag) {
            Disposition::Skip => Ok(()),
            Disposition::Promote { required } => {
                let (target, target_def) = peel(field.ty);
                match &target_def.kind {
                    TypeKind::Record(fields) if target_def.custom_schema.is_none() => {
                        if self.embedding.contains(&target.id()) {
                            // Embedding cycle: nest the type instead of splicing it again
                            return self.property(owner, field, &tag, field.ident.clone(), required, node, groups);
                        }
                        if self.config.is_ignored(&target) {
                            return Ok(());
                        }
                        self.embedding.push(target.id());
                        let walked = self.walk_fields(target, &target_def, fields, node, groups);
                        self.embedding.pop();
                        walked
                    }
                    _ if !field.exported => Ok(()),
                    _ => {
                        // Only record fields can be spliced; anything else stays a property
                        debug!(
                            owner = %owner_name,
                            field = %field.ident,
                            "embedded type has no fields to promote"
                        );
                        self.property(owner, field, &tag, field.ident.clone(), required, node, groups)
                    }
                }
            }
            Disposition::Property { name, required } => {
                self.property(owner, field, &tag, name, required, node, groups)
            }
        }
    }

    fn disposition(&self, field: &Field, tag: &SchemaTag) -> Disposition {
        let json = field.tags.json.as_deref().map(NameTag::parse);
        let yaml = field.tags.yaml.as_deref().map(NameTag::parse);
        let name_tag = if self.config.prefer_yaml_schema || json.is_none() {
            yaml
        } else {
            json
        }
        .unwrap_or_default();

        if name_tag.is_ignored() || tag.excluded {
            return Disposition::Skip;
        }

        let required = (!self.config.required_from_schema_tags && !name_tag.omits_empty())
            || tag.has_keyword("required");

        if field.embedded && name_tag.name.is_empty() && !self.config.yaml_embedded_structs {
            return Disposition::Promote { required };
        }
        if name_tag.is_inline() {
            return Disposition::Promote { required };
        }
        if !field.exported && !field.embedded {
            return Disposition::Skip;
        }

        let name = if name_tag.name.is_empty() {
            field.ident.clone()
        } else {
            name_tag.name.clone()
        };

        Disposition::Property { name, required }
    }

    #[allow(clippy::too_many_arguments)]
    fn property(
        &mut self,
        owner: &TypeDef,
        field: &Field,
        tag: &SchemaTag,
        name: String,
        required: bool,
        node: &mut Schema,
        groups: &mut Vec<(String, Vec<String>)>,
    ) -> SchemaResult<()> {
        let owner_name = owner.display_name();
        let site = Site {
            owner: &owner_name,
            field: &field.ident,
        };

        let base = self.resolve(field.ty, site)?;
        let resolved = self.resolved(&base, field.ty);
        let annotations = Annotations {
            owner: &owner_name,
            field: &field.ident,
            tag,
            extras: field.tags.extras.as_deref(),
            description: field.tags.description.as_deref(),
        };
        let built = apply_annotations(base, resolved, &annotations)?;

        let mut property = built.schema;
        if property.description.is_none() {
            property.description = field
                .doc
                .clone()
                .or_else(|| owner.field_docs.and_then(|docs| docs(&field.ident)))
                .or_else(|| self.comment(owner, Some(&field.ident)));
        }
        if built.nullable {
            property = Schema {
                one_of: vec![property, Schema::typed(InstanceType::Null)],
                ..Default::default()
            };
        }

        if let Some(group) = built.group {
            match groups.iter_mut().find(|(label, _)| *label == group) {
                Some((_, members)) => members.push(name.clone()),
                None => groups.push((group, vec![name.clone()])),
            }
        }
        if required {
            node.push_required(&name);
        }
        if let Some(properties) = node.properties.as_mut() {
            properties.insert(name, property);
        }
        Ok(())
    }

    /// Types the annotations see, looking through references
    fn resolved(&self, node: &Schema, ty: TypeRef) -> Resolved {
        let (_, def) = peel(ty);
        Resolved {
            instance_type: self.node_type(node),
            items_type: node.items.as_deref().and_then(|items| self.node_type(items)),
            integer_enum: matches!(def.kind, TypeKind::IntegerEnum) && def.custom_schema.is_none(),
        }
    }

    fn node_type(&self, node: &Schema) -> Option<InstanceType> {
        match &node.reference {
            Some(reference) => self.refs.instance_type_of(reference),
            None => node.instance_type,
        }
    }

    fn comment(&self, def: &TypeDef, field: Option<&str>) -> Option<String> {
        let source = self.config.comments.as_ref()?;
        let path = def.qualified_name()?;
        match source.lookup(&path, field) {
            Ok(comment) => comment.filter(|c| !c.trim().is_empty()),
            Err(err) => {
                debug!(type_path = %path, field = ?field, error = %err, "comment lookup failed");
                None
            }
        }
    }
}
