//! Default and derived value engine
//!
//! Defaults are filled exactly once, when an instance is created. Derived
//! attributes are pure functions of stored attributes: they are computed on
//! every read and never written back.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::model::Instance;

use super::errors::{SchemaError, SchemaResult};
use super::types::{ComputedDef, DefaultValue, Shape};

/// Formats a timestamp the way `timestamp` attributes are stored.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fills omitted defaulted attributes using the current wall-clock time.
pub fn apply_defaults(instance: Instance, shape: &Shape) -> Instance {
    apply_defaults_at(instance, shape, Utc::now())
}

/// Fills omitted defaulted attributes, using `now` for `DefaultValue::Now`.
///
/// Attributes the caller supplied are left alone.
pub fn apply_defaults_at(mut instance: Instance, shape: &Shape, now: DateTime<Utc>) -> Instance {
    for (name, def) in &shape.fields {
        let Some(default) = &def.default else {
            continue;
        };
        if instance.get(name).is_some_and(|v| !v.is_null()) {
            continue;
        }
        let value = match default {
            DefaultValue::Now => Value::String(format_timestamp(now)),
            DefaultValue::Value(v) => v.clone(),
        };
        instance.attributes_mut().insert(name.clone(), value);
    }
    instance
}

/// Computes every derived attribute of `instance` from its current values.
pub fn derive_computed(instance: &Instance, shape: &Shape) -> SchemaResult<Map<String, Value>> {
    let mut derived = Map::new();
    for (name, def) in &shape.computed {
        derived.insert(name.clone(), evaluate(instance, shape, def)?);
    }
    Ok(derived)
}

fn evaluate(instance: &Instance, shape: &Shape, def: &ComputedDef) -> SchemaResult<Value> {
    match def {
        ComputedDef::Concat { sources, separator } => {
            let parts = sources
                .iter()
                .map(|source| {
                    instance
                        .get(source)
                        .and_then(Value::as_str)
                        .ok_or_else(|| SchemaError::missing_field(&shape.kind, source))
                })
                .collect::<SchemaResult<Vec<_>>>()?;
            Ok(Value::String(parts.join(separator)))
        }
    }
}

/// Rejects writes naming a derived attribute.
pub fn reject_derived(shape: &Shape, attrs: &Map<String, Value>) -> SchemaResult<()> {
    match attrs.keys().find(|key| shape.is_computed(key)) {
        Some(key) => Err(SchemaError::read_only_field(&shape.kind, key)),
        None => Ok(()),
    }
}

/// Rejects changes to write-once attributes of an existing instance.
///
/// Re-sending the current value is accepted.
pub fn reject_write_once(
    shape: &Shape,
    current: &Instance,
    changes: &Map<String, Value>,
) -> SchemaResult<()> {
    for (name, value) in changes {
        let Some(def) = shape.field(name) else {
            continue;
        };
        if def.write_once && current.get(name) != Some(value) {
            return Err(SchemaError::read_only_field(&shape.kind, name));
        }
    }
    Ok(())
}
