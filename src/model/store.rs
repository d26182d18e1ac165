//! In-memory model store
//!
//! # Invariants
//!
//! - Every committed instance satisfies its shape
//! - Every write is all-or-nothing
//! - Reads observe committed state only
//!
//! Each write runs as a transaction over a clone of the committed state.
//! The clone is O(instances + edges); the store is sized for review
//! workloads, not bulk loads.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::graph::Edge;
use crate::index::IndexKey;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};
use crate::schema::{
    derive_computed, review_schema, validate_attributes, SchemaCatalog, SchemaError, SchemaResult,
    SchemaValidator, Shape, ShapeResolver,
};

use super::instance::{Instance, InstanceId};
use super::state::ModelState;
use super::transaction::{Change, Transaction};

pub struct ModelStore {
    catalog: SchemaCatalog,
    shapes: BTreeMap<String, Shape>,
    state: ModelState,
    strict_unknown_fields: bool,
    metrics: MetricsRegistry,
}

impl ModelStore {
    /// Creates an empty store governed by `catalog`.
    ///
    /// # Errors
    ///
    /// Any resolution error of the catalog (`REVIEW_SCHEMA_CONFLICT`,
    /// `REVIEW_UNKNOWN_ENTITY_KIND`, ...).
    pub fn new(catalog: SchemaCatalog) -> SchemaResult<Self> {
        let shapes = ShapeResolver::new(&catalog).resolve_all()?;

        let entities = shapes.len().to_string();
        log_event_with_fields(Event::SchemaLoaded, &[("entities", entities.as_str())]);

        Ok(Self {
            catalog,
            shapes,
            state: ModelState::default(),
            strict_unknown_fields: true,
            metrics: MetricsRegistry::new(),
        })
    }

    /// Creates an empty store for the code review schema
    pub fn with_review_schema() -> SchemaResult<Self> {
        Self::new(review_schema())
    }

    /// When false, undeclared attributes are dropped from writes instead of
    /// rejected.
    pub fn set_strict_unknown_fields(&mut self, strict: bool) {
        self.strict_unknown_fields = strict;
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn shapes(&self) -> &BTreeMap<String, Shape> {
        &self.shapes
    }

    pub fn shape(&self, kind: &str) -> Option<&Shape> {
        self.shapes.get(kind)
    }

    /// Resolved shape of `kind`
    pub fn resolve_shape(&self, kind: &str) -> SchemaResult<Shape> {
        self.shapes
            .get(kind)
            .cloned()
            .ok_or_else(|| SchemaError::unknown_entity_kind(kind))
    }

    /// Runs `f` as one atomic transaction.
    ///
    /// If `f` or the deferred checks fail, the store is left exactly as it
    /// was and the error is returned.
    pub fn transaction<T, F>(&mut self, f: F) -> SchemaResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> SchemaResult<T>,
    {
        let mut tx = Transaction::begin(&self.shapes, self.state.clone(), self.strict_unknown_fields);

        let outcome = match f(&mut tx) {
            Ok(value) => tx.finish().map(|committed| (value, committed)),
            Err(err) => Err(err),
        };

        match outcome {
            Ok((value, (state, changes))) => {
                self.state = state;
                self.record(&changes);
                Ok(value)
            }
            Err(err) => {
                self.metrics.increment_rejections();
                log_event_with_fields(
                    Event::WriteRejected,
                    &[
                        ("code", err.code().code()),
                        ("entity", err.entity().unwrap_or("")),
                        ("field", err.field().unwrap_or("")),
                        ("message", err.message()),
                    ],
                );
                Err(err)
            }
        }
    }

    fn record(&self, changes: &[Change]) {
        for change in changes {
            match change {
                Change::Created { id, kind } => {
                    self.metrics.increment_creates();
                    let id = id.to_string();
                    log_event_with_fields(Event::InstanceCommitted, &[("id", id.as_str()), ("kind", kind.as_str())]);
                }
                Change::Updated { id, kind } => {
                    self.metrics.increment_updates();
                    let id = id.to_string();
                    log_event_with_fields(Event::InstanceUpdated, &[("id", id.as_str()), ("kind", kind.as_str())]);
                }
                Change::Deleted { id, kind } => {
                    self.metrics.increment_deletes();
                    let id = id.to_string();
                    log_event_with_fields(Event::InstanceDeleted, &[("id", id.as_str()), ("kind", kind.as_str())]);
                }
                Change::Linked(edge) => {
                    self.metrics.increment_links();
                    log_edge(Event::EdgeLinked, edge);
                }
                Change::Unlinked(edge) => {
                    self.metrics.increment_unlinks();
                    log_edge(Event::EdgeUnlinked, edge);
                }
            }
        }

        self.metrics.increment_commits();
        self.metrics
            .set_totals(self.state.instances.len() as u64, self.state.edges.len() as u64);
        let count = changes.len().to_string();
        log_event_with_fields(Event::TransactionCommitted, &[("changes", count.as_str())]);
    }

    // Single-operation writes

    /// Creates and commits an instance of `kind`.
    ///
    /// Kinds with required relations (PullRequest, Comment) need those links
    /// in the same transaction; use [`ModelStore::transaction`].
    pub fn create(&mut self, kind: &str, attributes: Value) -> SchemaResult<InstanceId> {
        self.transaction(|tx| tx.create(kind, attributes))
    }

    /// Merges `changes` into the attributes of `id`
    pub fn update(&mut self, id: InstanceId, changes: Value) -> SchemaResult<()> {
        self.transaction(|tx| tx.update(id, changes))
    }

    /// Deletes `id`, cascading where the schema says so.
    /// Returns every deleted id, `id` first.
    pub fn delete(&mut self, id: InstanceId) -> SchemaResult<Vec<InstanceId>> {
        self.transaction(|tx| tx.delete(id))
    }

    pub fn link(&mut self, source: InstanceId, relation: &str, target: InstanceId) -> SchemaResult<()> {
        self.transaction(|tx| tx.link(source, relation, target))
    }

    /// Links with edge attributes, e.g. `{"weight": 3}` on `todo`
    pub fn link_with(
        &mut self,
        source: InstanceId,
        relation: &str,
        target: InstanceId,
        attributes: Value,
    ) -> SchemaResult<()> {
        self.transaction(|tx| tx.link_with(source, relation, target, attributes))
    }

    pub fn unlink(&mut self, source: InstanceId, relation: &str, target: InstanceId) -> SchemaResult<()> {
        self.transaction(|tx| tx.unlink(source, relation, target))
    }

    // Reads

    /// Committed instance by id
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.state.instances.get(&id)
    }

    fn committed(&self, id: InstanceId) -> SchemaResult<&Instance> {
        self.get(id).ok_or_else(|| SchemaError::instance_not_found(id))
    }

    fn shape_of(&self, instance: &Instance) -> SchemaResult<&Shape> {
        self.shapes
            .get(instance.kind())
            .ok_or_else(|| SchemaError::unknown_entity_kind(instance.kind()))
    }

    /// Derived attributes of `id`, computed from current values
    pub fn derive_computed(&self, id: InstanceId) -> SchemaResult<Map<String, Value>> {
        let instance = self.committed(id)?;
        derive_computed(instance, self.shape_of(instance)?)
    }

    /// Stored and derived attributes of `id` in one map
    pub fn read(&self, id: InstanceId) -> SchemaResult<Map<String, Value>> {
        let instance = self.committed(id)?;
        let mut attrs = instance.attributes().clone();
        attrs.extend(derive_computed(instance, self.shape_of(instance)?)?);
        Ok(attrs)
    }

    /// Re-runs every check against the committed instance `id`
    pub fn validate(&self, id: InstanceId) -> SchemaResult<()> {
        let instance = self.committed(id)?;
        SchemaValidator::new(&self.state).validate(instance, self.shape_of(instance)?)
    }

    /// Checks `attributes` as a payload for `kind` without writing anything
    pub fn validate_payload(&self, kind: &str, attributes: &Map<String, Value>) -> SchemaResult<()> {
        let shape = self
            .shapes
            .get(kind)
            .ok_or_else(|| SchemaError::unknown_entity_kind(kind))?;
        validate_attributes(shape, attributes)
    }

    /// Targets of `relation` from `id`, in link order
    pub fn neighbors(&self, id: InstanceId, relation: &str) -> SchemaResult<Vec<InstanceId>> {
        let instance = self.committed(id)?;
        let shape = self.shape_of(instance)?;
        if shape.relation(relation).is_none() {
            return Err(SchemaError::unknown_relation(&shape.kind, relation));
        }
        Ok(self.state.edges.neighbors(id, relation).to_vec())
    }

    /// Sources holding a `relation` edge to `id`, in link order
    pub fn inbound(&self, id: InstanceId, relation: &str) -> SchemaResult<Vec<InstanceId>> {
        let instance = self.committed(id)?;
        let targeted = self
            .shapes
            .values()
            .any(|shape| shape.relation(relation).is_some_and(|def| def.target == instance.kind()));
        if !targeted {
            return Err(SchemaError::unknown_relation(instance.kind(), relation));
        }
        Ok(self.state.edges.inbound(id, relation).to_vec())
    }

    /// Edge record, including edge attributes
    pub fn edge(&self, source: InstanceId, relation: &str, target: InstanceId) -> Option<Edge> {
        self.state.edges.get(source, relation, target)
    }

    /// Instance owning `value` for the unique attribute `kind.field`
    pub fn find_unique(&self, kind: &str, field: &str, value: &Value) -> Option<InstanceId> {
        let key = IndexKey::from_json(value)?;
        self.state.unique.owner(kind, field, &key)
    }

    /// Committed instances of `kind`, in id order
    pub fn instances_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Instance> + 'a {
        self.state
            .instances
            .values()
            .filter(move |instance| instance.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.state.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.instances.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.state.edges.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn log_edge(event: Event, edge: &Edge) {
    let source = edge.source.to_string();
    let target = edge.target.to_string();
    log_event_with_fields(
        event,
        &[
            ("relation", edge.relation.as_str()),
            ("source", source.as_str()),
            ("target", target.as_str()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builtin::{FOLLOWEES, USER};
    use crate::schema::SchemaErrorCode;
    use serde_json::json;

    fn user_attrs(login: &str) -> Value {
        json!({"login": login, "firstname": "Amy", "lastname": "Li"})
    }

    #[test]
    fn test_create_and_read_user() {
        let mut store = ModelStore::with_review_schema().unwrap();
        let amy = store.create(USER, user_attrs("amy")).unwrap();

        let attrs = store.read(amy).unwrap();
        assert_eq!(attrs["login"], json!("amy"));
        assert_eq!(attrs["fullname"], json!("Amy Li"));
        assert!(store.get(amy).unwrap().get("fullname").is_none());
    }

    #[test]
    fn test_rejected_write_counts_in_metrics() {
        let mut store = ModelStore::with_review_schema().unwrap();
        store.create(USER, user_attrs("amy")).unwrap();
        assert!(store.create(USER, user_attrs("amy")).is_err());

        let metrics = store.metrics();
        assert_eq!(metrics.commits, 1);
        assert_eq!(metrics.rejections, 1);
        assert_eq!(metrics.instances, 1);
    }

    #[test]
    fn test_failed_transaction_leaves_store_unchanged() {
        let mut store = ModelStore::with_review_schema().unwrap();
        let amy = store.create(USER, user_attrs("amy")).unwrap();

        let err = store
            .transaction(|tx| {
                let bob = tx.create(USER, user_attrs("bob"))?;
                tx.link(amy, FOLLOWEES, bob)?;
                tx.create(USER, user_attrs("amy"))
            })
            .unwrap_err();

        assert_eq!(err.code(), SchemaErrorCode::UniquenessViolation);
        assert_eq!(store.len(), 1);
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.find_unique(USER, "login", &json!("bob")), None);
    }

    #[test]
    fn test_neighbors_unknown_relation() {
        let mut store = ModelStore::with_review_schema().unwrap();
        let amy = store.create(USER, user_attrs("amy")).unwrap();

        let err = store.neighbors(amy, "friends").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnknownRelation);
    }

    #[test]
    fn test_inbound_followers() {
        let mut store = ModelStore::with_review_schema().unwrap();
        let amy = store.create(USER, user_attrs("amy")).unwrap();
        let bob = store.create(USER, user_attrs("bob")).unwrap();
        store.link(amy, FOLLOWEES, bob).unwrap();

        assert_eq!(store.inbound(bob, FOLLOWEES).unwrap(), vec![amy]);
        assert!(store.inbound(amy, FOLLOWEES).unwrap().is_empty());
    }

    #[test]
    fn test_validate_payload() {
        let store = ModelStore::with_review_schema().unwrap();
        let payload = json!({"login": "amy"}).as_object().cloned().unwrap();

        let err = store.validate_payload(USER, &payload).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MissingField);
    }
}
