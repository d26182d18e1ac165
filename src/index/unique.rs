//! Secondary index enforcing unique attribute values
//!
//! One BTreeMap per (entity kind, attribute), mapping each value to the
//! single instance that owns it.

use std::collections::BTreeMap;

use crate::model::InstanceId;
use crate::schema::{SchemaError, SchemaResult};

use super::key::IndexKey;

#[derive(Debug, Clone, Default)]
pub struct UniqueIndex {
    trees: BTreeMap<(String, String), BTreeMap<IndexKey, InstanceId>>,
}

impl UniqueIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance currently holding `key` for `kind.field`
    pub fn owner(&self, kind: &str, field: &str, key: &IndexKey) -> Option<InstanceId> {
        self.trees
            .get(&(kind.to_string(), field.to_string()))
            .and_then(|tree| tree.get(key))
            .copied()
    }

    /// Claims `key` for `id`.
    ///
    /// Re-inserting a key the instance already owns is a no-op.
    ///
    /// # Errors
    ///
    /// `REVIEW_UNIQUENESS_VIOLATION` if another instance owns the key. The
    /// index is left unchanged.
    pub fn insert(
        &mut self,
        kind: &str,
        field: &str,
        key: IndexKey,
        id: InstanceId,
    ) -> SchemaResult<()> {
        let tree = self
            .trees
            .entry((kind.to_string(), field.to_string()))
            .or_default();

        match tree.get(&key) {
            Some(owner) if *owner != id => Err(SchemaError::uniqueness_violation(kind, field, &key)),
            Some(_) => Ok(()),
            None => {
                tree.insert(key, id);
                Ok(())
            }
        }
    }

    /// Releases `key` if `id` owns it. Returns whether anything was removed.
    pub fn remove(&mut self, kind: &str, field: &str, key: &IndexKey, id: InstanceId) -> bool {
        let index = (kind.to_string(), field.to_string());
        let Some(tree) = self.trees.get_mut(&index) else {
            return false;
        };

        let removed = match tree.get(key) {
            Some(owner) if *owner == id => tree.remove(key).is_some(),
            _ => false,
        };
        if tree.is_empty() {
            self.trees.remove(&index);
        }
        removed
    }

    /// Number of keys indexed for `kind.field`
    pub fn key_count(&self, kind: &str, field: &str) -> usize {
        self.trees
            .get(&(kind.to_string(), field.to_string()))
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;

    #[test]
    fn test_insert_and_lookup() {
        let mut index = UniqueIndex::new();
        let amy = InstanceId::new();

        index.insert("User", "login", IndexKey::from_string("amy"), amy).unwrap();

        assert_eq!(index.owner("User", "login", &IndexKey::from_string("amy")), Some(amy));
        assert_eq!(index.owner("User", "login", &IndexKey::from_string("bob")), None);
        assert_eq!(index.key_count("User", "login"), 1);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut index = UniqueIndex::new();
        let first = InstanceId::new();
        let second = InstanceId::new();

        index.insert("User", "login", IndexKey::from_string("amy"), first).unwrap();
        let err = index
            .insert("User", "login", IndexKey::from_string("amy"), second)
            .unwrap_err();

        assert_eq!(err.code(), SchemaErrorCode::UniquenessViolation);
        assert_eq!(index.owner("User", "login", &IndexKey::from_string("amy")), Some(first));
    }

    #[test]
    fn test_reinsert_by_owner_is_noop() {
        let mut index = UniqueIndex::new();
        let amy = InstanceId::new();

        index.insert("User", "login", IndexKey::from_string("amy"), amy).unwrap();
        index.insert("User", "login", IndexKey::from_string("amy"), amy).unwrap();
        assert_eq!(index.key_count("User", "login"), 1);
    }

    #[test]
    fn test_remove_requires_owner() {
        let mut index = UniqueIndex::new();
        let amy = InstanceId::new();
        let other = InstanceId::new();
        let key = IndexKey::from_string("amy");

        index.insert("User", "login", key.clone(), amy).unwrap();
        assert!(!index.remove("User", "login", &key, other));
        assert!(index.remove("User", "login", &key, amy));
        assert!(index.is_empty());
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut index = UniqueIndex::new();
        let key = IndexKey::from_string("x");

        index.insert("User", "login", key.clone(), InstanceId::new()).unwrap();
        index.insert("Team", "login", key, InstanceId::new()).unwrap();
    }
}
