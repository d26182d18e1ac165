//! Constraint validator: the final gate before a write commits
//!
//! Validation semantics:
//! - All required attributes are present, non-null and non-empty where declared
//! - No undeclared attributes exist; derived attributes are never accepted
//! - Values match their declared types exactly, enums by membership
//! - Unique attributes hold against the whole population
//! - Relation bounds hold after the operation
//!
//! The validator never mutates anything. The population it checks against
//! is reached through the [`Population`] trait so that any storage layer can
//! back it.

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::index::IndexKey;
use crate::model::{Instance, InstanceId};

use super::errors::{SchemaError, SchemaResult};
use super::types::{Cardinality, FieldDef, FieldType, RelationDef, Shape};

/// Read access to committed state needed by population-wide constraints.
pub trait Population {
    /// Instance owning `key` for the unique attribute `kind.field`
    fn unique_owner(&self, kind: &str, field: &str, key: &IndexKey) -> Option<InstanceId>;

    /// Number of outgoing edges of `relation` from `id`
    fn out_degree(&self, id: InstanceId, relation: &str) -> usize;
}

/// Validates instances against their resolved shapes.
pub struct SchemaValidator<'a> {
    population: &'a dyn Population,
}

impl<'a> SchemaValidator<'a> {
    /// Creates a validator backed by `population`.
    pub fn new(population: &'a dyn Population) -> Self {
        Self { population }
    }

    /// Runs every check against `instance`.
    ///
    /// # Errors
    ///
    /// - `REVIEW_MISSING_FIELD` for absent required attributes or relations
    /// - `REVIEW_INVALID_ENUM_VALUE` for enum values outside the set
    /// - `REVIEW_UNIQUENESS_VIOLATION` if a unique value is owned elsewhere
    /// - `REVIEW_CARDINALITY_VIOLATION` if relation bounds are not met
    /// - `REVIEW_TYPE_MISMATCH`, `REVIEW_UNKNOWN_FIELD`, `REVIEW_READ_ONLY_FIELD`
    ///   for malformed attributes
    pub fn validate(&self, instance: &Instance, shape: &Shape) -> SchemaResult<()> {
        if instance.kind() != shape.kind {
            return Err(SchemaError::type_mismatch(
                instance.kind(),
                "$kind",
                &shape.kind,
                instance.kind(),
            ));
        }

        validate_attributes(shape, instance.attributes())?;
        self.validate_unique(instance, shape)?;
        self.validate_cardinality(instance.id(), shape)?;

        Ok(())
    }

    /// Checks unique attributes against the population.
    pub fn validate_unique(&self, instance: &Instance, shape: &Shape) -> SchemaResult<()> {
        for field in shape.unique_fields() {
            let Some(key) = instance.get(field).and_then(IndexKey::from_json) else {
                continue;
            };
            match self.population.unique_owner(&shape.kind, field, &key) {
                Some(owner) if owner != instance.id() => {
                    return Err(SchemaError::uniqueness_violation(&shape.kind, field, &key));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Checks relation bounds for `id`.
    ///
    /// A missing single-valued relation is a missing field; any other bound
    /// violation is a cardinality violation.
    pub fn validate_cardinality(&self, id: InstanceId, shape: &Shape) -> SchemaResult<()> {
        for (name, relation) in &shape.relations {
            let degree = self.population.out_degree(id, name);
            check_bounds(&shape.kind, name, relation, degree)?;
        }
        Ok(())
    }
}

fn check_bounds(kind: &str, name: &str, relation: &RelationDef, degree: usize) -> SchemaResult<()> {
    let cardinality = relation.cardinality;
    if degree < cardinality.min() {
        if cardinality == Cardinality::One {
            return Err(SchemaError::missing_field(kind, name));
        }
        return Err(SchemaError::cardinality_violation(
            kind,
            name,
            format!(
                "requires at least {} {} (cardinality {}), found {}",
                cardinality.min(),
                relation.target,
                cardinality.token(),
                degree
            ),
        ));
    }
    if let Some(max) = cardinality.max() {
        if degree > max {
            return Err(SchemaError::cardinality_violation(
                kind,
                name,
                format!("allows at most {} {}, found {}", max, relation.target, degree),
            ));
        }
    }
    Ok(())
}

/// Validates stored attributes against `shape`. Population-independent.
pub fn validate_attributes(shape: &Shape, attrs: &Map<String, Value>) -> SchemaResult<()> {
    for key in attrs.keys() {
        if shape.is_computed(key) {
            return Err(SchemaError::read_only_field(&shape.kind, key));
        }
        if !shape.fields.contains_key(key) {
            return Err(SchemaError::unknown_field(&shape.kind, key));
        }
    }

    for (name, def) in &shape.fields {
        match attrs.get(name) {
            None | Some(Value::Null) if def.required => {
                return Err(SchemaError::missing_field(&shape.kind, name));
            }
            None => {}
            Some(value) => validate_value(shape, name, def, value)?,
        }
    }

    Ok(())
}

/// Validates edge attributes of `relation` on `shape`.
pub fn validate_edge_attributes(
    shape: &Shape,
    relation: &str,
    attrs: &Map<String, Value>,
) -> SchemaResult<()> {
    let def = shape
        .relation(relation)
        .ok_or_else(|| SchemaError::unknown_relation(&shape.kind, relation))?;

    let owner = format!("{}.{}", shape.kind, relation);
    for key in attrs.keys() {
        if !def.edge_fields.contains_key(key) {
            return Err(SchemaError::unknown_field(&owner, key));
        }
    }

    for (name, field) in &def.edge_fields {
        match attrs.get(name) {
            None | Some(Value::Null) if field.required => {
                return Err(SchemaError::missing_field(&owner, name));
            }
            None => {}
            Some(value) => validate_value_for(&owner, shape, name, field, value)?,
        }
    }

    Ok(())
}

fn validate_value(shape: &Shape, name: &str, def: &FieldDef, value: &Value) -> SchemaResult<()> {
    validate_value_for(&shape.kind, shape, name, def, value)
}

fn validate_value_for(
    owner: &str,
    shape: &Shape,
    name: &str,
    def: &FieldDef,
    value: &Value,
) -> SchemaResult<()> {
    let mismatch = || SchemaError::type_mismatch(owner, name, def.field_type.type_name(), json_type_name(value));

    match &def.field_type {
        FieldType::String => {
            let s = value.as_str().ok_or_else(mismatch)?;
            if def.non_empty && s.is_empty() {
                return Err(SchemaError::missing_field(owner, name));
            }
        }
        FieldType::Int16 => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            if i16::try_from(n).is_err() {
                return Err(SchemaError::type_mismatch(
                    owner,
                    name,
                    "int16",
                    &format!("{} (outside i16 range)", n),
                ));
            }
        }
        FieldType::Int => {
            if !value.is_i64() {
                return Err(mismatch());
            }
        }
        FieldType::Bool => {
            if !value.is_boolean() {
                return Err(mismatch());
            }
        }
        FieldType::Timestamp => {
            let s = value.as_str().ok_or_else(mismatch)?;
            if DateTime::parse_from_rfc3339(s).is_err() {
                return Err(SchemaError::type_mismatch(
                    owner,
                    name,
                    "timestamp",
                    &format!("'{}' (not RFC 3339)", s),
                ));
            }
        }
        FieldType::Enum { name: enum_name } => {
            let s = value.as_str().ok_or_else(mismatch)?;
            let def = shape
                .enums
                .get(enum_name)
                .ok_or_else(|| SchemaError::unknown_entity_kind(enum_name))?;
            if !def.contains(s) {
                return Err(SchemaError::invalid_enum_value(owner, name, s, &def.variants));
            }
        }
    }

    Ok(())
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
