//! Committed model state
//!
//! One value holds everything a write can touch: instances, the unique
//! index, the edge table and the creation clock. Transactions work on a
//! clone and the store swaps it in on commit, so a rejected write never
//! leaves anything behind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::graph::EdgeTable;
use crate::index::{IndexKey, UniqueIndex};
use crate::schema::{Population, SchemaError, SchemaResult, Shape};

use super::instance::{Instance, InstanceId};

#[derive(Debug, Clone, Default)]
pub(crate) struct ModelState {
    pub(crate) instances: BTreeMap<InstanceId, Instance>,
    pub(crate) unique: UniqueIndex,
    pub(crate) edges: EdgeTable,
    /// Last timestamp handed out for `now` defaults
    last_timestamp: Option<DateTime<Utc>>,
}

impl ModelState {
    /// Wall-clock time, clamped so creation timestamps never go backwards
    pub(crate) fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    /// Fails if any unique value of `instance` is held by another instance.
    /// Never mutates, so callers check before they touch the index.
    fn check_unique(&self, instance: &Instance, shape: &Shape) -> SchemaResult<()> {
        for field in shape.unique_fields() {
            let Some(key) = instance.get(field).and_then(IndexKey::from_json) else {
                continue;
            };
            match self.unique.owner(&shape.kind, field, &key) {
                Some(owner) if owner != instance.id() => {
                    return Err(SchemaError::uniqueness_violation(&shape.kind, field, &key))
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Claims every unique value of `instance`. On error nothing is claimed.
    pub(crate) fn index_unique(&mut self, instance: &Instance, shape: &Shape) -> SchemaResult<()> {
        self.check_unique(instance, shape)?;
        for field in shape.unique_fields() {
            if let Some(key) = instance.get(field).and_then(IndexKey::from_json) {
                self.unique.insert(&shape.kind, field, key, instance.id())?;
            }
        }
        Ok(())
    }

    /// Releases every unique value of `instance`
    pub(crate) fn unindex_unique(&mut self, instance: &Instance, shape: &Shape) {
        for field in shape.unique_fields() {
            if let Some(key) = instance.get(field).and_then(IndexKey::from_json) {
                self.unique.remove(&shape.kind, field, &key, instance.id());
            }
        }
    }

    /// Moves unique claims from `before` to `after` for changed values only.
    /// On error the index is unchanged.
    pub(crate) fn reindex_unique(
        &mut self,
        before: &Instance,
        after: &Instance,
        shape: &Shape,
    ) -> SchemaResult<()> {
        self.check_unique(after, shape)?;
        for field in shape.unique_fields() {
            let old = before.get(field).and_then(IndexKey::from_json);
            let new = after.get(field).and_then(IndexKey::from_json);
            if old == new {
                continue;
            }
            if let Some(old) = old {
                self.unique.remove(&shape.kind, field, &old, before.id());
            }
            if let Some(new) = new {
                self.unique.insert(&shape.kind, field, new, after.id())?;
            }
        }
        Ok(())
    }
}

impl Population for ModelState {
    fn unique_owner(&self, kind: &str, field: &str, key: &IndexKey) -> Option<InstanceId> {
        self.unique.owner(kind, field, key)
    }

    fn out_degree(&self, id: InstanceId, relation: &str) -> usize {
        self.edges.out_degree(id, relation)
    }
}
