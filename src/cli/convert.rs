//! JSON <-> engine value conversion utilities
//!
//! Vertices are written as objects with a single `@vertex` key:
//!
//! ```text
//! {"@vertex": {"id": "4", "properties": {"__guid": "a1", "Table.name": "orders"}}}
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number, Value, json};

use super::CliError;
use crate::{QueryResult, RawValue, Vertex};

const VERTEX_KEY: &str = "@vertex";

/// Convert serde_json::Value to an engine value
pub fn json_to_raw(v: Value) -> Result<RawValue, CliError> {
    Ok(match v {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RawValue::Integer(i),
            None => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map(RawValue::Decimal)
                    .map_err(|e| CliError::InvalidInput(format!("number {}: {}", text, e)))?
            }
        },
        Value::String(s) => RawValue::String(s),
        Value::Array(arr) => RawValue::List(
            arr.into_iter()
                .map(json_to_raw)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(mut obj) => match obj.remove(VERTEX_KEY) {
            Some(vertex) if obj.is_empty() => RawValue::Vertex(json_to_vertex(vertex)?),
            Some(vertex) => {
                obj.insert(VERTEX_KEY.to_string(), vertex);
                RawValue::Map(json_to_map(obj)?)
            }
            None => RawValue::Map(json_to_map(obj)?),
        },
    })
}

fn json_to_map(obj: Map<String, Value>) -> Result<HashMap<String, RawValue>, CliError> {
    obj.into_iter()
        .map(|(k, v)| json_to_raw(v).map(|v| (k, v)))
        .collect()
}

fn json_to_vertex(v: Value) -> Result<Vertex, CliError> {
    let Value::Object(mut obj) = v else {
        return Err(CliError::InvalidInput(format!("'{}' must be an object", VERTEX_KEY)));
    };
    let id = match obj.remove("id") {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(CliError::InvalidInput("vertex without an id".to_string())),
    };
    let properties = match obj.remove("properties") {
        Some(Value::Object(props)) => json_to_map(props)?,
        None => HashMap::new(),
        Some(_) => {
            return Err(CliError::InvalidInput(format!(
                "properties of vertex {} must be an object",
                id
            )));
        }
    };
    Ok(Vertex { id, properties })
}

/// Convert an engine value to serde_json::Value
pub fn raw_to_json(v: &RawValue) -> Value {
    match v {
        RawValue::Null => Value::Null,
        RawValue::Boolean(b) => Value::Bool(*b),
        RawValue::Integer(i) => Value::Number((*i).into()),
        RawValue::Decimal(d) => d
            .to_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(d.to_string())),
        RawValue::String(s) => Value::String(s.clone()),
        RawValue::List(items) => Value::Array(items.iter().map(raw_to_json).collect()),
        RawValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), raw_to_json(v)))
                .collect(),
        ),
        RawValue::Vertex(vertex) => {
            let properties: Map<String, Value> = vertex
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), raw_to_json(v)))
                .collect();
            let mut obj = Map::new();
            obj.insert(
                VERTEX_KEY.to_string(),
                json!({ "id": vertex.id, "properties": properties }),
            );
            Value::Object(obj)
        }
    }
}

/// Convert a typed query result to serde_json::Value
pub fn result_to_json(result: &QueryResult) -> Result<Value, CliError> {
    Ok(match result {
        QueryResult::EntityList(headers) => json!({
            "kind": "entities",
            "entities": serde_json::to_value(headers)?,
        }),
        QueryResult::TraitRows(headers) => json!({
            "kind": "trait_rows",
            "rows": serde_json::to_value(headers)?,
        }),
        QueryResult::AttributeTable { columns, rows } => json!({
            "kind": "attributes",
            "columns": columns,
            "rows": rows
                .iter()
                .map(|row| Value::Array(row.iter().map(raw_to_json).collect()))
                .collect::<Vec<_>>(),
        }),
    })
}
