//! Relationship graph
//!
//! Edges are first-class records (source, relation, target, attribute bag)
//! held in an edge table with forward and reverse adjacency, so every
//! relation can be walked from either end. Edge attributes such as the
//! `todo` weight live on the edge, never on an endpoint.
//!
//! # Invariants
//!
//! - At most one edge per (source, relation, target)
//! - Forward and reverse adjacency always mirror the edge table
//! - Neighbors are returned in link order

mod edge;
mod links;
mod table;

pub use edge::Edge;
pub use table::EdgeTable;
