//! Edge table with bidirectional adjacency
//!
//! Raw storage only: inserts and removals here do not look at the schema.
//! Cardinality-aware linking lives in `links.rs`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::model::InstanceId;

use super::edge::Edge;

type EdgeKey = (InstanceId, String, InstanceId);
type AdjacencyKey = (InstanceId, String);

#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    /// Attribute bag per edge
    edges: BTreeMap<EdgeKey, Map<String, Value>>,
    /// (source, relation) -> targets, in link order
    forward: BTreeMap<AdjacencyKey, Vec<InstanceId>>,
    /// (target, relation) -> sources, in link order
    reverse: BTreeMap<AdjacencyKey, Vec<InstanceId>>,
}

impl EdgeTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether the edge exists
    pub fn contains(&self, source: InstanceId, relation: &str, target: InstanceId) -> bool {
        self.edges
            .contains_key(&(source, relation.to_string(), target))
    }

    /// Looks up one edge
    pub fn get(&self, source: InstanceId, relation: &str, target: InstanceId) -> Option<Edge> {
        self.edges
            .get(&(source, relation.to_string(), target))
            .map(|attrs| Edge::new(source, relation, target).with_attributes(attrs.clone()))
    }

    /// Targets of `relation` from `source`, in link order
    pub fn neighbors(&self, source: InstanceId, relation: &str) -> &[InstanceId] {
        self.forward
            .get(&(source, relation.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sources linking to `target` through `relation`, in link order
    pub fn inbound(&self, target: InstanceId, relation: &str) -> &[InstanceId] {
        self.reverse
            .get(&(target, relation.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn out_degree(&self, source: InstanceId, relation: &str) -> usize {
        self.neighbors(source, relation).len()
    }

    pub fn in_degree(&self, target: InstanceId, relation: &str) -> usize {
        self.inbound(target, relation).len()
    }

    /// Every edge with `id` at either end, outgoing edges first
    pub fn edges_touching(&self, id: InstanceId) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .forward
            .iter()
            .filter(|((source, _), _)| *source == id)
            .flat_map(|((source, relation), targets)| {
                targets
                    .iter()
                    .filter_map(move |target| self.get(*source, relation, *target))
            })
            .collect();

        for ((target, relation), sources) in self.reverse.iter().filter(|((t, _), _)| *t == id) {
            for source in sources {
                if *source == id {
                    continue;
                }
                if let Some(edge) = self.get(*source, relation, *target) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Inserts an edge. Returns false if it already existed.
    pub(crate) fn insert(&mut self, edge: Edge) -> bool {
        let key = (edge.source, edge.relation.clone(), edge.target);
        if self.edges.contains_key(&key) {
            return false;
        }
        self.edges.insert(key, edge.attributes);
        self.forward
            .entry((edge.source, edge.relation.clone()))
            .or_default()
            .push(edge.target);
        self.reverse
            .entry((edge.target, edge.relation))
            .or_default()
            .push(edge.source);
        true
    }

    /// Removes an edge, returning it if it existed.
    pub(crate) fn remove(
        &mut self,
        source: InstanceId,
        relation: &str,
        target: InstanceId,
    ) -> Option<Edge> {
        let attrs = self
            .edges
            .remove(&(source, relation.to_string(), target))?;
        remove_from(&mut self.forward, (source, relation.to_string()), target);
        remove_from(&mut self.reverse, (target, relation.to_string()), source);
        Some(Edge::new(source, relation, target).with_attributes(attrs))
    }

    /// Removes every edge touching `id`, returning them.
    pub(crate) fn detach(&mut self, id: InstanceId) -> Vec<Edge> {
        let edges = self.edges_touching(id);
        for edge in &edges {
            self.remove(edge.source, &edge.relation, edge.target);
        }
        edges
    }
}

fn remove_from(
    adjacency: &mut BTreeMap<AdjacencyKey, Vec<InstanceId>>,
    key: AdjacencyKey,
    id: InstanceId,
) {
    if let Some(ids) = adjacency.get_mut(&key) {
        ids.retain(|other| *other != id);
        if ids.is_empty() {
            adjacency.remove(&key);
        }
    }
}
