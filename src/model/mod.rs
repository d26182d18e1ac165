//! Object model for reviewdb
//!
//! Instances, their lifecycle, and the store that commits them.
//!
//! # Design Principles
//!
//! - Writes go through transactions; a single call is a one-operation
//!   transaction
//! - Constraints that can only hold once several operations are staged
//!   (required relations, lower bounds) are checked at commit
//! - Committed state is replaced wholesale on commit, never patched
//! - Callers share a store behind a `Mutex`; the store itself takes
//!   `&mut self` for every write

mod instance;
mod state;
mod store;
mod transaction;

pub use instance::{Instance, InstanceId, InstanceState};
pub use store::ModelStore;
pub use transaction::{Change, Transaction};
