//! Trait composition resolver
//!
//! Flattens an entity definition and the traits it composes into a single
//! [`Shape`]. Traits are merged in declaration order, then the entity's own
//! members. A member defined twice with an identical definition merges
//! silently; any other redefinition is a FATAL `REVIEW_SCHEMA_CONFLICT`.
//!
//! Resolution is pure: it reads the catalog only and yields the same shape
//! every time it runs.

use std::collections::BTreeMap;

use super::catalog::SchemaCatalog;
use super::errors::{SchemaError, SchemaResult};
use super::types::{ComputedDef, DefaultValue, FieldDef, FieldType, Shape};

/// Resolves entity kinds against a catalog.
pub struct ShapeResolver<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> ShapeResolver<'a> {
    /// Creates a resolver over `catalog`.
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Produces the effective shape of `kind`.
    ///
    /// # Errors
    ///
    /// - `REVIEW_UNKNOWN_ENTITY_KIND` if `kind`, a composed trait, a relation
    ///   target or a referenced enum is not defined
    /// - `REVIEW_SCHEMA_CONFLICT` if two definitions of one member disagree
    pub fn resolve(&self, kind: &str) -> SchemaResult<Shape> {
        let entity = self
            .catalog
            .entity(kind)
            .ok_or_else(|| SchemaError::unknown_entity_kind(kind))?;

        let mut fields = BTreeMap::new();
        let mut relations = BTreeMap::new();

        for trait_name in &entity.traits {
            let def = self
                .catalog
                .trait_def(trait_name)
                .ok_or_else(|| SchemaError::unknown_entity_kind(trait_name))?;

            if def.link {
                return Err(SchemaError::schema_conflict(
                    kind,
                    trait_name,
                    "link traits can only be composed through a relation",
                ));
            }

            for (name, field) in &def.fields {
                merge_member(kind, &mut fields, name, field, trait_name)?;
            }
            for (name, relation) in &def.relations {
                merge_member(kind, &mut relations, name, relation, trait_name)?;
            }
        }

        for (name, field) in &entity.fields {
            merge_member(kind, &mut fields, name, field, kind)?;
        }
        for (name, relation) in &entity.relations {
            merge_member(kind, &mut relations, name, relation, kind)?;
        }

        for name in relations.keys() {
            if fields.contains_key(name) {
                return Err(SchemaError::schema_conflict(
                    kind,
                    name,
                    "defined both as an attribute and as a relation",
                ));
            }
        }

        for (name, field) in &fields {
            check_default(kind, name, field)?;
        }

        for (name, relation) in relations.iter_mut() {
            if self.catalog.entity(&relation.target).is_none() {
                return Err(SchemaError::unknown_entity_kind(&relation.target));
            }

            let Some(via) = relation.via.clone() else {
                continue;
            };
            let link = self
                .catalog
                .trait_def(&via)
                .ok_or_else(|| SchemaError::unknown_entity_kind(&via))?;
            if !link.link {
                return Err(SchemaError::schema_conflict(
                    kind,
                    name,
                    format!("'{}' is not a link trait", via),
                ));
            }
            for (attr, field) in &link.fields {
                merge_member(kind, &mut relation.edge_fields, attr, field, &via)?;
            }
        }

        for (name, computed) in &entity.computed {
            if fields.contains_key(name) || relations.contains_key(name) {
                return Err(SchemaError::schema_conflict(
                    kind,
                    name,
                    "derived attribute shadows a stored member",
                ));
            }
            let ComputedDef::Concat { sources, .. } = computed;
            for source in sources {
                match fields.get(source) {
                    Some(def) if def.field_type == FieldType::String => {}
                    Some(_) => {
                        return Err(SchemaError::schema_conflict(
                            kind,
                            name,
                            format!("source '{}' is not a string attribute", source),
                        ))
                    }
                    None => return Err(SchemaError::unknown_field(kind, source)),
                }
            }
        }

        let mut enums = BTreeMap::new();
        let edge_fields = relations.values().flat_map(|r| r.edge_fields.values());
        for field in fields.values().chain(edge_fields) {
            if let FieldType::Enum { name } = &field.field_type {
                let def = self
                    .catalog
                    .enum_def(name)
                    .ok_or_else(|| SchemaError::unknown_entity_kind(name))?;
                enums.insert(name.clone(), def.clone());
            }
        }

        Ok(Shape {
            kind: kind.to_string(),
            traits: entity.traits.clone(),
            fields,
            relations,
            computed: entity.computed.clone(),
            enums,
        })
    }

    /// Resolves every entity in the catalog, keyed by kind.
    pub fn resolve_all(&self) -> SchemaResult<BTreeMap<String, Shape>> {
        self.catalog
            .entity_names()
            .map(|kind| Ok((kind.to_string(), self.resolve(kind)?)))
            .collect()
    }
}

/// Inserts `def` under `name`, accepting only identical redefinitions.
fn merge_member<T: PartialEq + Clone>(
    kind: &str,
    members: &mut BTreeMap<String, T>,
    name: &str,
    def: &T,
    origin: &str,
) -> SchemaResult<()> {
    match members.get(name) {
        Some(existing) if existing == def => Ok(()),
        Some(_) => Err(SchemaError::schema_conflict(
            kind,
            name,
            format!("redefined incompatibly by '{}'", origin),
        )),
        None => {
            members.insert(name.to_string(), def.clone());
            Ok(())
        }
    }
}

fn check_default(kind: &str, name: &str, field: &FieldDef) -> SchemaResult<()> {
    if field.default == Some(DefaultValue::Now) && field.field_type != FieldType::Timestamp {
        return Err(SchemaError::schema_conflict(
            kind,
            name,
            "only timestamp attributes can default to now",
        ));
    }
    Ok(())
}
