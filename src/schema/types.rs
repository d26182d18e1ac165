//! Schema definitions as data
//!
//! Traits, enums and entities are plain serializable records. Entities name
//! the traits they compose; the resolver flattens them into a [`Shape`].
//!
//! Supported attribute types:
//! - string: UTF-8 string
//! - int16: integer in the i16 range
//! - int: 64-bit signed integer
//! - bool: Boolean
//! - timestamp: RFC 3339 string
//! - enum: string drawn from a named enum definition

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Integer in the 16-bit signed range
    Int16,
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// RFC 3339 timestamp
    Timestamp,
    /// Member of a named enum
    Enum {
        /// Enum definition name
        name: String,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int16 => "int16",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Timestamp => "timestamp",
            FieldType::Enum { .. } => "enum",
        }
    }

    /// Enum type referencing `name`
    pub fn enumeration(name: impl Into<String>) -> Self {
        FieldType::Enum { name: name.into() }
    }
}

/// Value generated for an omitted attribute at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Wall-clock time at the creation instant
    Now,
    /// Fixed value
    Value(Value),
}

/// Attribute definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Attribute data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the attribute must be present on a committed instance
    pub required: bool,
    /// Whether values must be unique across all instances of the entity
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Generated value when omitted at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Set once at creation, never changed afterwards
    #[serde(default, skip_serializing_if = "is_false")]
    pub write_once: bool,
    /// Empty strings count as missing
    #[serde(default, skip_serializing_if = "is_false")]
    pub non_empty: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl FieldDef {
    fn of(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
            unique: false,
            default: None,
            write_once: false,
            non_empty: false,
        }
    }

    /// Create a required string field
    pub fn required_string() -> Self {
        Self::of(FieldType::String, true)
    }

    /// Create an optional string field
    pub fn optional_string() -> Self {
        Self::of(FieldType::String, false)
    }

    /// Create a required int field
    pub fn required_int() -> Self {
        Self::of(FieldType::Int, true)
    }

    /// Create an optional int16 field
    pub fn optional_int16() -> Self {
        Self::of(FieldType::Int16, false)
    }

    /// Create a required bool field
    pub fn required_bool() -> Self {
        Self::of(FieldType::Bool, true)
    }

    /// Create a required timestamp field
    pub fn required_timestamp() -> Self {
        Self::of(FieldType::Timestamp, true)
    }

    /// Create a required field holding a member of enum `name`
    pub fn required_enum(name: impl Into<String>) -> Self {
        Self::of(FieldType::enumeration(name), true)
    }

    /// Mark values as unique across the entity population
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Generate `default` when the attribute is omitted at creation
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Forbid changes after creation
    pub fn write_once(mut self) -> Self {
        self.write_once = true;
        self
    }

    /// Treat the empty string as missing
    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }
}

/// Link cardinality, read from the source side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// Exactly one target
    #[serde(rename = "1")]
    One,
    /// Any number of targets
    #[serde(rename = "*")]
    Many,
    /// At least one target
    #[serde(rename = "1*")]
    AtLeastOne,
}

impl Cardinality {
    /// Lower bound on targets per source
    pub fn min(&self) -> usize {
        match self {
            Cardinality::One | Cardinality::AtLeastOne => 1,
            Cardinality::Many => 0,
        }
    }

    /// Upper bound on targets per source, if any
    pub fn max(&self) -> Option<usize> {
        match self {
            Cardinality::One => Some(1),
            Cardinality::Many | Cardinality::AtLeastOne => None,
        }
    }

    /// Cardinality token as written in schema files
    pub fn token(&self) -> &'static str {
        match self {
            Cardinality::One => "1",
            Cardinality::Many => "*",
            Cardinality::AtLeastOne => "1*",
        }
    }
}

/// Relation (link) definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Target entity kind
    pub target: String,
    /// Targets per source
    pub cardinality: Cardinality,
    /// A target may be linked from at most one source through this relation
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive: bool,
    /// Deleting the source deletes its targets in the same step
    #[serde(default, skip_serializing_if = "is_false")]
    pub cascade_delete: bool,
    /// Abstract link trait whose attributes every edge carries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    /// Edge attributes (merged from `via` by the resolver)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub edge_fields: BTreeMap<String, FieldDef>,
}

impl RelationDef {
    /// Relation to `target` with the given cardinality
    pub fn new(target: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            target: target.into(),
            cardinality,
            exclusive: false,
            cascade_delete: false,
            via: None,
            edge_fields: BTreeMap::new(),
        }
    }

    /// Each target belongs to at most one source
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Targets are deleted together with the source
    pub fn cascade_delete(mut self) -> Self {
        self.cascade_delete = true;
        self
    }

    /// Edges carry the attributes of link trait `link_trait`
    pub fn via(mut self, link_trait: impl Into<String>) -> Self {
        self.via = Some(link_trait.into());
        self
    }
}

/// Derived attribute, evaluated on every read and never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputedDef {
    /// String attributes joined with a separator
    Concat {
        /// Source attribute names, in order
        sources: Vec<String>,
        /// Text placed between sources
        separator: String,
    },
}

/// Composable trait: attributes and relations merged into entities.
///
/// A link trait (`link == true`) is an abstract relationship shape; its
/// fields describe edge attributes and it may only be used through
/// [`RelationDef::via`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub link: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDef>,
}

impl TraitDef {
    /// Trait composed into entities
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: false,
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Abstract link shape whose fields live on edges
    pub fn link(name: impl Into<String>) -> Self {
        Self {
            link: true,
            ..Self::new(name)
        }
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn relation(mut self, name: impl Into<String>, def: RelationDef) -> Self {
        self.relations.insert(name.into(), def);
        self
    }
}

/// Closed set of string values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Whether `value` is a member of the set
    pub fn contains(&self, value: &str) -> bool {
        self.variants.iter().any(|v| v == value)
    }
}

/// Concrete entity definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    /// Composed traits, merged in order
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDef>,
    #[serde(default)]
    pub computed: BTreeMap<String, ComputedDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            traits: Vec::new(),
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
            computed: BTreeMap::new(),
        }
    }

    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.traits.push(name.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn relation(mut self, name: impl Into<String>, def: RelationDef) -> Self {
        self.relations.insert(name.into(), def);
        self
    }

    pub fn computed(mut self, name: impl Into<String>, def: ComputedDef) -> Self {
        self.computed.insert(name.into(), def);
        self
    }
}

/// Effective, trait-merged shape of one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Entity kind
    pub kind: String,
    /// Traits merged into this shape, in composition order
    pub traits: Vec<String>,
    pub fields: BTreeMap<String, FieldDef>,
    pub relations: BTreeMap<String, RelationDef>,
    pub computed: BTreeMap<String, ComputedDef>,
    /// Enum definitions referenced by `fields`
    pub enums: BTreeMap<String, EnumDef>,
}

impl Shape {
    /// Attribute definition by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Relation definition by name
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    /// Whether `name` is a derived attribute
    pub fn is_computed(&self, name: &str) -> bool {
        self.computed.contains_key(name)
    }

    /// Attributes with a uniqueness constraint
    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, def)| def.unique)
            .map(|(name, _)| name.as_str())
    }

    /// Relations that need at least one target on a committed instance
    pub fn bounded_relations(&self) -> impl Iterator<Item = (&str, &RelationDef)> {
        self.relations
            .iter()
            .filter(|(_, def)| def.cardinality.min() > 0)
            .map(|(name, def)| (name.as_str(), def))
    }
}
