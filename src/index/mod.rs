//! Secondary indexes
//!
//! Indexes are derived state maintained alongside the instance table. They
//! never decide acceptance on their own; the schema validator consults them
//! through the [`Population`](crate::schema::Population) seam.
//!
//! # Invariants
//!
//! - A unique key maps to exactly one live instance
//! - Iteration order is deterministic (BTreeMap)

mod key;
mod unique;

pub use key::IndexKey;
pub use unique::UniqueIndex;
