//! Structural conversion between JSON values and BSON.
//!
//! Request bodies arrive as `serde_json` values and responses leave as `serde_json`
//! values; the store speaks BSON. Both directions are total pattern matches over
//! the value variants, so no reflection or intermediate string form is involved.
//! Object key order is preserved in both directions.

use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

/// Converts a JSON value to BSON.
///
/// Integers that fit in 32 bits become `Int32`, other integers `Int64`. Floats and
/// unsigned integers beyond `i64::MAX` become `Double`.
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => number_to_bson(&n),
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(json_object_to_document(map)),
    }
}

/// Converts a JSON object to a BSON document, keeping key order.
pub fn json_object_to_document(map: Map<String, Value>) -> Document {
    map.into_iter()
        .map(|(k, v)| (k, json_to_bson(v)))
        .collect()
}

fn number_to_bson(n: &Number) -> Bson {
    if let Some(i) = n.as_i64() {
        return match i32::try_from(i) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(i),
        };
    }

    Bson::Double(n.as_f64().unwrap_or(f64::NAN))
}

/// Converts a BSON value to JSON.
///
/// Meant for values that already went through the
/// [`DocumentSerializer`](crate::serializer::DocumentSerializer); any `ObjectId`
/// still present is written as its hex string. Dates become RFC 3339 strings and
/// other BSON-only types fall back to their extended JSON representation.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(document_to_json_object(doc)),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Value::from(dt.timestamp_millis())),
        other => serde_json::to_value(&other).unwrap_or(Value::Null),
    }
}

/// Converts a BSON document to a JSON object, keeping key order.
pub fn document_to_json_object(document: Document) -> Map<String, Value> {
    document
        .into_iter()
        .map(|(k, v)| (k, bson_to_json(v)))
        .collect()
}
