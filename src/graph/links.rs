//! Link manager: schema-aware link and unlink
//!
//! Bounds are checked at the moment of the operation:
//! - a single-valued relation rejects a second target
//! - an exclusive relation rejects a target already linked from elsewhere
//! - unlinking below the lower bound is rejected
//!
//! Deleting instances bypasses these checks through `EdgeTable::detach`;
//! the delete policy in the model decides what may go.

use serde_json::{Map, Value};

use crate::model::{Instance, InstanceId};
use crate::schema::{validate_edge_attributes, SchemaError, SchemaResult, Shape};

use super::edge::Edge;
use super::table::EdgeTable;

impl EdgeTable {
    /// Links `source` to `target` through `relation`.
    ///
    /// `shape` is the resolved shape of `source`.
    ///
    /// # Errors
    ///
    /// - `REVIEW_UNKNOWN_RELATION` if `shape` has no such relation
    /// - `REVIEW_TYPE_MISMATCH` if `target` has the wrong kind
    /// - `REVIEW_UNKNOWN_FIELD` / `REVIEW_TYPE_MISMATCH` for bad edge attributes
    /// - `REVIEW_CARDINALITY_VIOLATION` for duplicates, a full single-valued
    ///   relation, or a target already claimed through an exclusive relation
    pub fn link(
        &mut self,
        source: &Instance,
        shape: &Shape,
        relation: &str,
        target: &Instance,
        attributes: Map<String, Value>,
    ) -> SchemaResult<()> {
        let def = shape
            .relation(relation)
            .ok_or_else(|| SchemaError::unknown_relation(&shape.kind, relation))?;

        if target.kind() != def.target {
            return Err(SchemaError::type_mismatch(
                &shape.kind,
                relation,
                &def.target,
                target.kind(),
            ));
        }

        validate_edge_attributes(shape, relation, &attributes)?;

        if self.contains(source.id(), relation, target.id()) {
            return Err(SchemaError::cardinality_violation(
                &shape.kind,
                relation,
                format!("already linked to {}", target.id()),
            ));
        }

        if let Some(max) = def.cardinality.max() {
            if self.out_degree(source.id(), relation) >= max {
                return Err(SchemaError::cardinality_violation(
                    &shape.kind,
                    relation,
                    format!("already has {} {} (cardinality {})", max, def.target, def.cardinality.token()),
                ));
            }
        }

        if def.exclusive {
            if let Some(owner) = self.inbound(target.id(), relation).first() {
                return Err(SchemaError::cardinality_violation(
                    &shape.kind,
                    relation,
                    format!("{} {} already belongs to {}", def.target, target.id(), owner),
                ));
            }
        }

        self.insert(Edge::new(source.id(), relation, target.id()).with_attributes(attributes));
        Ok(())
    }

    /// Removes the `relation` edge from `source` to `target`.
    ///
    /// # Errors
    ///
    /// - `REVIEW_UNKNOWN_RELATION` if `shape` has no such relation
    /// - `REVIEW_EDGE_NOT_FOUND` if the edge does not exist
    /// - `REVIEW_CARDINALITY_VIOLATION` if the source would drop below the
    ///   relation's lower bound
    pub fn unlink(
        &mut self,
        source: &Instance,
        shape: &Shape,
        relation: &str,
        target: InstanceId,
    ) -> SchemaResult<Edge> {
        let def = shape
            .relation(relation)
            .ok_or_else(|| SchemaError::unknown_relation(&shape.kind, relation))?;

        if !self.contains(source.id(), relation, target) {
            return Err(SchemaError::edge_not_found(source.id(), relation, target));
        }

        let min = def.cardinality.min();
        if self.out_degree(source.id(), relation) <= min {
            return Err(SchemaError::cardinality_violation(
                &shape.kind,
                relation,
                format!(
                    "cannot drop below {} {} (cardinality {})",
                    min,
                    def.target,
                    def.cardinality.token()
                ),
            ));
        }

        self.remove(source.id(), relation, target)
            .ok_or_else(|| SchemaError::edge_not_found(source.id(), relation, target))
    }
}
