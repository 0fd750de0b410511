//! Conversion between JSON documents and Tally values/records.
//!
//! Collaborators speak JSON; the tables speak `Value`. Nested objects are
//! not representable as a field value and are rejected.

use crate::error::{Error, Result};
use crate::record::{fields, Record};
use crate::time::format_millis;
use crate::value::Value;
use serde_json::{Map, Number, Value as Json};

/// Converts a JSON value to a Tally value.
///
/// - null: Null
/// - bool: Boolean
/// - integral number within i64: Int64, any other number: Float64
/// - string: String (timestamps stay strings; windows parse them lazily)
/// - array: List
/// - object: error
pub fn json_to_value(json: &Json) -> Result<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float64(f))
            } else {
                Err(Error::parse(format!("Unrepresentable number {}", n)))
            }
        }
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(json_to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Json::Object(_) => Err(Error::parse("Nested objects are not supported as field values")),
    }
}

/// Converts a Tally value to JSON.
///
/// DateTime becomes an RFC 3339 string; non-finite floats become null.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int64(i) => Json::Number((*i).into()),
        Value::Float64(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::DateTime(ms) => Json::String(format_millis(*ms)),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
    }
}

/// Converts a JSON object into an unstamped record.
pub fn json_to_record(json: &Json) -> Result<Record> {
    let object = json
        .as_object()
        .ok_or_else(|| Error::parse("Expected a JSON object for a record"))?;
    let mut record = Record::new();
    for (name, value) in object {
        record.set(name.clone(), json_to_value(value)?);
    }
    Ok(record)
}

/// Converts a record into a JSON object.
///
/// Appended records also expose `sequence_id` and `ingestion_time` unless a
/// stored field of the same name shadows them.
pub fn record_to_json(record: &Record) -> Json {
    let mut object = Map::new();
    for (name, value) in record.fields() {
        object.insert(name.to_string(), value_to_json(value));
    }
    if record.is_stamped() && !record.is_derived() {
        for name in [fields::SEQUENCE_ID, fields::INGESTION_TIME] {
            if !object.contains_key(name) {
                object.insert(name.to_string(), value_to_json(&record.lookup(name)));
            }
        }
    }
    Json::Object(object)
}
