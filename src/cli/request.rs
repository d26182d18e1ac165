//! Request types for `reviewdb serve`
//!
//! One JSON object per line, tagged by `op`:
//!
//! ```text
//! {"op":"create","kind":"User","attributes":{"login":"amy",...}}
//! {"op":"link","source":"<id>","relation":"followees","target":"<id>"}
//! {"op":"transaction","ops":[{"op":"create",...},{"op":"link","source":"$0",...}]}
//! ```
//!
//! Inside a transaction, `$N` stands for the id created by operation `N`
//! of the same transaction.

use serde::Deserialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Create {
        kind: String,
        #[serde(default)]
        attributes: Value,
    },
    Update {
        id: String,
        changes: Value,
    },
    Delete {
        id: String,
    },
    Link {
        source: String,
        relation: String,
        target: String,
        #[serde(default)]
        attributes: Value,
    },
    Unlink {
        source: String,
        relation: String,
        target: String,
    },
    Get {
        id: String,
    },
    Neighbors {
        id: String,
        relation: String,
        /// Follow edges backwards
        #[serde(default)]
        inbound: bool,
    },
    Transaction {
        ops: Vec<Request>,
    },
    Stats,
}

/// A request that changes the model
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create {
        kind: String,
        attributes: Value,
    },
    Update {
        id: String,
        changes: Value,
    },
    Delete {
        id: String,
    },
    Link {
        source: String,
        relation: String,
        target: String,
        attributes: Value,
    },
    Unlink {
        source: String,
        relation: String,
        target: String,
    },
}

impl Request {
    /// Parse a request from one JSON line
    pub fn parse(line: &str) -> CliResult<Self> {
        let request: Request = serde_json::from_str(line)
            .map_err(|e| CliError::bad_request(format!("Invalid request: {}", e)))?;

        if let Request::Transaction { ops } = &request {
            if ops.is_empty() {
                return Err(CliError::bad_request("transaction has no operations"));
            }
            if let Some(op) = ops.iter().find(|op| !op.is_write()) {
                return Err(CliError::bad_request(format!(
                    "'{}' is not allowed inside a transaction",
                    op.name()
                )));
            }
        }

        Ok(request)
    }

    /// Whether this request can be staged in a transaction
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Request::Create { .. }
                | Request::Update { .. }
                | Request::Delete { .. }
                | Request::Link { .. }
                | Request::Unlink { .. }
        )
    }

    /// The write this request stages, if it is one
    pub fn into_write(self) -> CliResult<WriteOp> {
        match self {
            Request::Create { kind, attributes } => Ok(WriteOp::Create { kind, attributes }),
            Request::Update { id, changes } => Ok(WriteOp::Update { id, changes }),
            Request::Delete { id } => Ok(WriteOp::Delete { id }),
            Request::Link {
                source,
                relation,
                target,
                attributes,
            } => Ok(WriteOp::Link {
                source,
                relation,
                target,
                attributes,
            }),
            Request::Unlink {
                source,
                relation,
                target,
            } => Ok(WriteOp::Unlink {
                source,
                relation,
                target,
            }),
            other => Err(CliError::bad_request(format!(
                "'{}' is not a write operation",
                other.name()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::Create { .. } => "create",
            Request::Update { .. } => "update",
            Request::Delete { .. } => "delete",
            Request::Link { .. } => "link",
            Request::Unlink { .. } => "unlink",
            Request::Get { .. } => "get",
            Request::Neighbors { .. } => "neighbors",
            Request::Transaction { .. } => "transaction",
            Request::Stats => "stats",
        }
    }
}
