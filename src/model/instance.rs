//! Entity instances and their lifecycle
//!
//! ```text
//! Uninitialized -> Validating -> Committed <-> Mutating
//!       ^              |             |
//!       +--------------+             +-> Deleted
//! ```
//!
//! Only `Committed` instances are visible outside a transaction. A failed
//! validation sends a new instance back to `Uninitialized` and it is
//! discarded. `Deleted` is terminal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::schema::{SchemaError, SchemaResult};

/// Opaque instance identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Allocates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Uninitialized,
    Validating,
    Committed,
    Mutating,
    Deleted,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Uninitialized => "uninitialized",
            InstanceState::Validating => "validating",
            InstanceState::Committed => "committed",
            InstanceState::Mutating => "mutating",
            InstanceState::Deleted => "deleted",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: InstanceState) -> bool {
        use InstanceState::*;
        matches!(
            (self, next),
            (Uninitialized, Validating)
                | (Validating, Committed)
                | (Validating, Uninitialized)
                | (Committed, Mutating)
                | (Mutating, Committed)
                | (Committed, Deleted)
        )
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single entity instance: stored attributes only, never derived ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    id: InstanceId,
    kind: String,
    attributes: Map<String, Value>,
    state: InstanceState,
}

impl Instance {
    /// Creates an uninitialized instance of `kind`
    pub fn new(kind: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            id: InstanceId::new(),
            kind: kind.into(),
            attributes,
            state: InstanceState::Uninitialized,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    /// Attribute value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Whether other operations may observe this instance
    pub fn is_visible(&self) -> bool {
        self.state == InstanceState::Committed
    }

    /// Moves to `next`, enforcing the lifecycle.
    pub fn transition(&mut self, next: InstanceState) -> SchemaResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SchemaError::invalid_transition(self.id, self.state, next));
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;

    #[test]
    fn test_new_instance_is_uninitialized() {
        let instance = Instance::new("User", Map::new());
        assert_eq!(instance.state(), InstanceState::Uninitialized);
        assert!(!instance.is_visible());
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut instance = Instance::new("User", Map::new());
        instance.transition(InstanceState::Validating).unwrap();
        instance.transition(InstanceState::Committed).unwrap();
        assert!(instance.is_visible());
        instance.transition(InstanceState::Mutating).unwrap();
        assert!(!instance.is_visible());
        instance.transition(InstanceState::Committed).unwrap();
        instance.transition(InstanceState::Deleted).unwrap();
        assert!(!instance.is_visible());
    }

    #[test]
    fn test_failed_validation_returns_to_uninitialized() {
        let mut instance = Instance::new("User", Map::new());
        instance.transition(InstanceState::Validating).unwrap();
        instance.transition(InstanceState::Uninitialized).unwrap();
        assert_eq!(instance.state(), InstanceState::Uninitialized);
    }

    #[test]
    fn test_deleted_is_terminal() {
        let mut instance = Instance::new("User", Map::new());
        instance.transition(InstanceState::Validating).unwrap();
        instance.transition(InstanceState::Committed).unwrap();
        instance.transition(InstanceState::Deleted).unwrap();

        for next in [
            InstanceState::Uninitialized,
            InstanceState::Validating,
            InstanceState::Committed,
            InstanceState::Mutating,
        ] {
            let err = instance.transition(next).unwrap_err();
            assert_eq!(err.code(), SchemaErrorCode::InvalidTransition);
        }
    }

    #[test]
    fn test_cannot_skip_validation() {
        let mut instance = Instance::new("User", Map::new());
        assert!(instance.transition(InstanceState::Committed).is_err());
    }

    #[test]
    fn test_instance_id_parse() {
        let id = InstanceId::new();
        let parsed: InstanceId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<InstanceId>().is_err());
    }
}
