//! reviewdb - schema-validated object graph for code review
//!
//! Users, pull requests and comments are instances of entity kinds composed
//! from reusable traits. Every write is checked against the resolved shape
//! of its kind and applied atomically.
//!
//! ```ignore
//! use reviewdb::model::ModelStore;
//! use serde_json::json;
//!
//! let mut store = ModelStore::with_review_schema()?;
//! let amy = store.create("User", json!({"login": "amy", "firstname": "Amy", "lastname": "Li"}))?;
//! assert_eq!(store.read(amy)?["fullname"], json!("Amy Li"));
//! ```

pub mod cli;
pub mod graph;
pub mod index;
pub mod model;
pub mod observability;
pub mod schema;
