//! Edge records

use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::InstanceId;

/// One link between two instances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub source: InstanceId,
    pub relation: String,
    pub target: InstanceId,
    /// Edge-local attributes; empty for relations without a link trait
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Edge {
    pub fn new(source: InstanceId, relation: impl Into<String>, target: InstanceId) -> Self {
        Self {
            source,
            relation: relation.into(),
            target,
            attributes: Map::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Edge attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}
