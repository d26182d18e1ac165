//! Request dispatch for `reviewdb serve`

use serde_json::{json, Value};

use crate::model::{InstanceId, ModelStore, Transaction};
use crate::schema::{SchemaError, SchemaResult};

use super::errors::{CliError, CliResult};
use super::io::{error_response, ok_response};
use super::request::{Request, WriteOp};

/// Applies requests to one in-memory store
pub struct RequestHandler {
    store: ModelStore,
}

impl RequestHandler {
    pub fn new(store: ModelStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Handles one request line and returns the response envelope
    pub fn handle_line(&mut self, line: &str) -> Value {
        match Request::parse(line).and_then(|request| self.handle(request)) {
            Ok(data) => ok_response(data),
            Err(err) => error_response(err.code(), &err.message()),
        }
    }

    pub fn handle(&mut self, request: Request) -> CliResult<Value> {
        match request {
            Request::Get { id } => {
                let id = parse_id(&id)?;
                let instance = self
                    .store
                    .get(id)
                    .ok_or_else(|| SchemaError::instance_not_found(id))?;
                let kind = instance.kind().to_string();
                let attributes = self.store.read(id)?;
                Ok(json!({"id": id, "kind": kind, "attributes": attributes}))
            }
            Request::Neighbors {
                id,
                relation,
                inbound,
            } => {
                let id = parse_id(&id)?;
                let ids = if inbound {
                    self.store.inbound(id, &relation)?
                } else {
                    self.store.neighbors(id, &relation)?
                };
                Ok(json!({ "ids": ids }))
            }
            Request::Stats => Ok(serde_json::to_value(self.store.metrics())?),
            Request::Transaction { ops } => {
                let ops = ops
                    .into_iter()
                    .map(Request::into_write)
                    .collect::<CliResult<Vec<_>>>()?;
                let results = self.store.transaction(|tx| {
                    let mut created = Vec::with_capacity(ops.len());
                    let mut results = Vec::with_capacity(ops.len());
                    for op in ops {
                        let (result, id) = apply(tx, op, &created)?;
                        created.push(id);
                        results.push(result);
                    }
                    Ok(results)
                })?;
                Ok(json!({ "results": results }))
            }
            write => {
                let write = write.into_write()?;
                let (result, _) = self.store.transaction(|tx| apply(tx, write, &[]))?;
                Ok(result)
            }
        }
    }
}

/// Stages one write. Returns its response data and, for `create`, the new id.
fn apply(
    tx: &mut Transaction<'_>,
    op: WriteOp,
    created: &[Option<InstanceId>],
) -> SchemaResult<(Value, Option<InstanceId>)> {
    match op {
        WriteOp::Create { kind, attributes } => {
            let id = tx.create(&kind, attributes)?;
            Ok((json!({ "id": id }), Some(id)))
        }
        WriteOp::Update { id, changes } => {
            let id = resolve(&id, created)?;
            tx.update(id, changes)?;
            Ok((json!({ "id": id }), None))
        }
        WriteOp::Delete { id } => {
            let id = resolve(&id, created)?;
            let deleted = tx.delete(id)?;
            Ok((json!({ "deleted": deleted }), None))
        }
        WriteOp::Link {
            source,
            relation,
            target,
            attributes,
        } => {
            let source = resolve(&source, created)?;
            let target = resolve(&target, created)?;
            tx.link_with(source, &relation, target, attributes)?;
            Ok((
                json!({"source": source, "relation": relation, "target": target}),
                None,
            ))
        }
        WriteOp::Unlink {
            source,
            relation,
            target,
        } => {
            let source = resolve(&source, created)?;
            let target = resolve(&target, created)?;
            tx.unlink(source, &relation, target)?;
            Ok((
                json!({"source": source, "relation": relation, "target": target}),
                None,
            ))
        }
    }
}

fn parse_id(text: &str) -> CliResult<InstanceId> {
    text.parse()
        .map_err(|_| CliError::bad_request(format!("'{}' is not an instance id", text)))
}

/// An instance id, or `$N` for the id created by operation `N`
fn resolve(text: &str, created: &[Option<InstanceId>]) -> SchemaResult<InstanceId> {
    if let Some(index) = text.strip_prefix('$') {
        return index
            .parse::<usize>()
            .ok()
            .and_then(|i| created.get(i).copied().flatten())
            .ok_or_else(|| SchemaError::instance_not_found(text));
    }
    text.parse()
        .map_err(|_| SchemaError::instance_not_found(text))
}
