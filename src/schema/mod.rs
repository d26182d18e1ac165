//! Schema subsystem for reviewdb
//!
//! The schema is data: traits, enums and entities registered in a
//! [`SchemaCatalog`]. Everything that enforces it lives here too.
//!
//! # Design Principles
//!
//! - Traits are flattened into one shape per entity kind, never inherited
//! - Validation is the sole authority on accepting a write
//! - Violations abort writes; nothing is partially applied
//! - Defaults are generated once, at creation
//! - Derived attributes are computed on read and never stored
//! - Deterministic resolution and validation

pub mod builtin;
mod catalog;
mod derive;
mod errors;
mod resolver;
mod types;
mod validator;

pub use builtin::review_schema;
pub use catalog::SchemaCatalog;
pub use derive::{
    apply_defaults, apply_defaults_at, derive_computed, format_timestamp, reject_derived,
    reject_write_once,
};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use resolver::ShapeResolver;
pub use types::{
    Cardinality, ComputedDef, DefaultValue, EntityDef, EnumDef, FieldDef, FieldType, RelationDef,
    Shape, TraitDef,
};
pub use validator::{validate_attributes, validate_edge_attributes, Population, SchemaValidator};
pub(crate) use validator::json_type_name;
