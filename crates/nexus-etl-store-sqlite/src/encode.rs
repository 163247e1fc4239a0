//! Conversion between row values and SQLite storage classes.
//!
//! Timestamps are stored as `%Y-%m-%d %H:%M:%S` text and booleans as 0/1;
//! both come back untyped and are restored by the coercion layer against the
//! declared column type. Blobs are read back as lowercase hex text.

use nexus_etl_core::row::{TIMESTAMP_FORMAT, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};

pub fn encode_value(value: &Value) -> SqlValue {
  match value {
    v if v.is_null() => SqlValue::Null,
    Value::Null => SqlValue::Null,
    Value::Text(s) => SqlValue::Text(s.clone()),
    Value::Int(i) => SqlValue::Integer(*i),
    Value::Float(f) => SqlValue::Real(*f),
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Timestamp(ts) => SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
  }
}

pub fn decode_value(raw: ValueRef<'_>) -> Value {
  match raw {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::Int(i),
    ValueRef::Real(f) => Value::Float(f),
    ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
    ValueRef::Blob(bytes) => Value::Text(hex::encode(bytes)),
  }
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }
