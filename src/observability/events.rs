//! Lifecycle events for reviewdb
//!
//! Every log line names exactly one of these events. The string forms are
//! stable and uppercase so logs can be grepped and parsed mechanically.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & configuration
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Schema resolved into shapes
    SchemaLoaded,
    /// Schema could not be loaded (FATAL)
    SchemaRejected,

    // Writes
    /// Transaction applied
    TransactionCommitted,
    /// Instance created and committed
    InstanceCommitted,
    /// Instance attributes changed
    InstanceUpdated,
    /// Instance removed
    InstanceDeleted,
    /// Edge added
    EdgeLinked,
    /// Edge removed
    EdgeUnlinked,
    /// Write refused by validation
    WriteRejected,

    // Server
    /// Request loop ready
    Serving,
    /// Request loop finished
    ServeComplete,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::SchemaRejected => "SCHEMA_REJECTED",

            Event::TransactionCommitted => "TRANSACTION_COMMITTED",
            Event::InstanceCommitted => "INSTANCE_COMMITTED",
            Event::InstanceUpdated => "INSTANCE_UPDATED",
            Event::InstanceDeleted => "INSTANCE_DELETED",
            Event::EdgeLinked => "EDGE_LINKED",
            Event::EdgeUnlinked => "EDGE_UNLINKED",
            Event::WriteRejected => "WRITE_REJECTED",

            Event::Serving => "REVIEWDB_SERVING",
            Event::ServeComplete => "REVIEWDB_SERVE_COMPLETE",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::SchemaRejected)
    }

    /// Returns true for events that report a refused operation
    pub fn is_rejection(&self) -> bool {
        matches!(self, Event::WriteRejected)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
