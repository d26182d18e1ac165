//! Staged writes
//!
//! A transaction applies operations to a private copy of the model state.
//! Immediate checks (attribute types, enums, uniqueness, upper bounds) run
//! as each operation is staged. Deferred checks (required relations, lower
//! bounds) run in `finish` over every instance the transaction touched.
//! Nothing reaches the store unless `finish` succeeds.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::graph::Edge;
use crate::schema::{
    apply_defaults_at, json_type_name, reject_derived, reject_write_once, validate_attributes,
    SchemaError, SchemaResult, SchemaValidator, Shape,
};

use super::instance::{Instance, InstanceId, InstanceState};
use super::state::ModelState;

/// A change applied by a committed transaction, in application order
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Created { id: InstanceId, kind: String },
    Updated { id: InstanceId, kind: String },
    Deleted { id: InstanceId, kind: String },
    Linked(Edge),
    Unlinked(Edge),
}

/// Operations staged against a working copy of the store.
pub struct Transaction<'s> {
    shapes: &'s BTreeMap<String, Shape>,
    strict_unknown_fields: bool,
    state: ModelState,
    touched: BTreeSet<InstanceId>,
    changes: Vec<Change>,
}

impl<'s> Transaction<'s> {
    pub(crate) fn begin(
        shapes: &'s BTreeMap<String, Shape>,
        state: ModelState,
        strict_unknown_fields: bool,
    ) -> Self {
        Self {
            shapes,
            strict_unknown_fields,
            state,
            touched: BTreeSet::new(),
            changes: Vec::new(),
        }
    }

    fn shape(&self, kind: &str) -> SchemaResult<&'s Shape> {
        let shapes = self.shapes;
        shapes
            .get(kind)
            .ok_or_else(|| SchemaError::unknown_entity_kind(kind))
    }

    fn live(&self, id: InstanceId) -> SchemaResult<&Instance> {
        self.state
            .instances
            .get(&id)
            .ok_or_else(|| SchemaError::instance_not_found(id))
    }

    /// Converts a write payload into an attribute map
    fn payload(&self, shape: &Shape, value: Value) -> SchemaResult<Map<String, Value>> {
        let mut attrs = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(SchemaError::type_mismatch(
                    &shape.kind,
                    "$attributes",
                    "object",
                    json_type_name(&other),
                ))
            }
        };
        if !self.strict_unknown_fields {
            attrs.retain(|name, _| shape.field(name).is_some() || shape.is_computed(name));
        }
        Ok(attrs)
    }

    /// Instance as staged so far
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.state.instances.get(&id)
    }

    /// Staged targets of `relation` from `id`
    pub fn neighbors(&self, id: InstanceId, relation: &str) -> &[InstanceId] {
        self.state.edges.neighbors(id, relation)
    }

    /// Stages a new instance of `kind`.
    ///
    /// Defaults are filled before validation. Required relations are not
    /// checked until commit, so they can be linked later in the same
    /// transaction.
    pub fn create(&mut self, kind: &str, attributes: Value) -> SchemaResult<InstanceId> {
        let shape = self.shape(kind)?;
        let attrs = self.payload(shape, attributes)?;
        reject_derived(shape, &attrs)?;

        let now = self.state.next_timestamp();
        let mut instance = apply_defaults_at(Instance::new(kind, attrs), shape, now);
        instance.transition(InstanceState::Validating)?;

        if let Err(err) = self.admit(&instance, shape) {
            instance.transition(InstanceState::Uninitialized)?;
            return Err(err);
        }

        let id = instance.id();
        self.state.instances.insert(id, instance);
        self.touched.insert(id);
        self.changes.push(Change::Created {
            id,
            kind: kind.to_string(),
        });
        Ok(id)
    }

    /// Immediate checks for a new instance, claiming its unique values
    fn admit(&mut self, instance: &Instance, shape: &Shape) -> SchemaResult<()> {
        validate_attributes(shape, instance.attributes())?;
        self.state.index_unique(instance, shape)
    }

    /// Stages attribute changes on `id`.
    ///
    /// `changes` is merged over the current attributes; a `null` value
    /// clears an attribute.
    pub fn update(&mut self, id: InstanceId, changes: Value) -> SchemaResult<()> {
        let current = self.live(id)?.clone();
        let shape = self.shape(current.kind())?;
        let changes = self.payload(shape, changes)?;
        reject_derived(shape, &changes)?;
        reject_write_once(shape, &current, &changes)?;

        let mut next = current.clone();
        for (name, value) in changes {
            if value.is_null() {
                next.attributes_mut().remove(&name);
            } else {
                next.attributes_mut().insert(name, value);
            }
        }
        validate_attributes(shape, next.attributes())?;

        if next.state() == InstanceState::Committed {
            next.transition(InstanceState::Mutating)?;
        }
        self.state.reindex_unique(&current, &next, shape)?;

        self.state.instances.insert(id, next);
        self.touched.insert(id);
        self.changes.push(Change::Updated {
            id,
            kind: shape.kind.clone(),
        });
        Ok(())
    }

    /// Stages the deletion of `id` and everything its cascading relations
    /// own. Returns the deleted ids, `id` first.
    ///
    /// # Errors
    ///
    /// `REVIEW_CARDINALITY_VIOLATION` if a surviving instance would drop
    /// below the lower bound of a relation pointing into the deleted set.
    pub fn delete(&mut self, id: InstanceId) -> SchemaResult<Vec<InstanceId>> {
        self.live(id)?;

        let doomed = self.cascade_closure(id)?;
        let doomed_set: BTreeSet<InstanceId> = doomed.iter().copied().collect();
        self.check_restrict(&doomed, &doomed_set)?;

        for victim in &doomed {
            for edge in self.state.edges.detach(*victim) {
                self.changes.push(Change::Unlinked(edge));
            }
            let Some(mut instance) = self.state.instances.remove(victim) else {
                continue;
            };
            let shape = self.shape(instance.kind())?;
            self.state.unindex_unique(&instance, shape);
            retire(&mut instance)?;
            self.touched.remove(victim);
            self.changes.push(Change::Deleted {
                id: *victim,
                kind: shape.kind.clone(),
            });
        }

        Ok(doomed)
    }

    /// `id` plus everything reachable through cascading relations
    fn cascade_closure(&self, id: InstanceId) -> SchemaResult<Vec<InstanceId>> {
        let mut doomed = vec![id];
        let mut next = 0;
        while next < doomed.len() {
            let current = doomed[next];
            let shape = self.shape(self.live(current)?.kind())?;
            for (name, relation) in &shape.relations {
                if !relation.cascade_delete {
                    continue;
                }
                for target in self.state.edges.neighbors(current, name) {
                    if !doomed.contains(target) {
                        doomed.push(*target);
                    }
                }
            }
            next += 1;
        }
        Ok(doomed)
    }

    /// Rejects the delete if a survivor loses a required target
    fn check_restrict(
        &self,
        doomed: &[InstanceId],
        doomed_set: &BTreeSet<InstanceId>,
    ) -> SchemaResult<()> {
        for victim in doomed {
            for edge in self.state.edges.edges_touching(*victim) {
                if edge.target != *victim || doomed_set.contains(&edge.source) {
                    continue;
                }
                let source = self.live(edge.source)?;
                let shape = self.shape(source.kind())?;
                let Some(relation) = shape.relation(&edge.relation) else {
                    continue;
                };
                let remaining = self
                    .state
                    .edges
                    .neighbors(edge.source, &edge.relation)
                    .iter()
                    .filter(|target| !doomed_set.contains(target))
                    .count();
                if remaining < relation.cardinality.min() {
                    return Err(SchemaError::cardinality_violation(
                        &shape.kind,
                        &edge.relation,
                        format!(
                            "{} {} still needs {} {} (cardinality {})",
                            shape.kind,
                            edge.source,
                            relation.cardinality.min(),
                            relation.target,
                            relation.cardinality.token()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Stages an edge from `source` to `target` with no edge attributes
    pub fn link(&mut self, source: InstanceId, relation: &str, target: InstanceId) -> SchemaResult<()> {
        self.link_with(source, relation, target, Value::Null)
    }

    /// Stages an edge carrying `attributes` (e.g. a `todo` weight)
    pub fn link_with(
        &mut self,
        source: InstanceId,
        relation: &str,
        target: InstanceId,
        attributes: Value,
    ) -> SchemaResult<()> {
        let shapes = self.shapes;
        let src = self
            .state
            .instances
            .get(&source)
            .ok_or_else(|| SchemaError::instance_not_found(source))?;
        let tgt = self
            .state
            .instances
            .get(&target)
            .ok_or_else(|| SchemaError::instance_not_found(target))?;
        let shape = shapes
            .get(src.kind())
            .ok_or_else(|| SchemaError::unknown_entity_kind(src.kind()))?;

        let attributes = match attributes {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(SchemaError::type_mismatch(
                    format!("{}.{}", shape.kind, relation),
                    "$attributes",
                    "object",
                    json_type_name(&other),
                ))
            }
        };

        self.state.edges.link(src, shape, relation, tgt, attributes)?;

        if let Some(edge) = self.state.edges.get(source, relation, target) {
            self.changes.push(Change::Linked(edge));
        }
        self.touched.insert(source);
        Ok(())
    }

    /// Stages removal of the `relation` edge from `source` to `target`
    pub fn unlink(&mut self, source: InstanceId, relation: &str, target: InstanceId) -> SchemaResult<()> {
        let shapes = self.shapes;
        let src = self
            .state
            .instances
            .get(&source)
            .ok_or_else(|| SchemaError::instance_not_found(source))?;
        let shape = shapes
            .get(src.kind())
            .ok_or_else(|| SchemaError::unknown_entity_kind(src.kind()))?;

        let edge = self.state.edges.unlink(src, shape, relation, target)?;

        self.changes.push(Change::Unlinked(edge));
        self.touched.insert(source);
        Ok(())
    }

    /// Runs deferred checks and commits every touched instance.
    pub(crate) fn finish(mut self) -> SchemaResult<(ModelState, Vec<Change>)> {
        {
            let validator = SchemaValidator::new(&self.state);
            for id in &self.touched {
                let Some(instance) = self.state.instances.get(id) else {
                    continue;
                };
                let shape = self.shape(instance.kind())?;
                validator.validate(instance, shape)?;
            }
        }

        for id in &self.touched {
            if let Some(instance) = self.state.instances.get_mut(id) {
                if matches!(
                    instance.state(),
                    InstanceState::Validating | InstanceState::Mutating
                ) {
                    instance.transition(InstanceState::Committed)?;
                }
            }
        }

        Ok((self.state, self.changes))
    }
}

/// Ends the lifecycle of a removed instance.
///
/// An instance staged in this transaction was never visible, so it goes
/// back to `Uninitialized` rather than `Deleted`. A pending mutation is
/// superseded by the delete.
fn retire(instance: &mut Instance) -> SchemaResult<()> {
    match instance.state() {
        InstanceState::Validating => instance.transition(InstanceState::Uninitialized),
        InstanceState::Mutating => {
            instance.transition(InstanceState::Committed)?;
            instance.transition(InstanceState::Deleted)
        }
        _ => instance.transition(InstanceState::Deleted),
    }
}
