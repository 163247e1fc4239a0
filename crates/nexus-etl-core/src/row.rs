//! Rows: ordered column maps of typed scalar values.
//!
//! Every entity table is handled as a [`RowSet`]: a collection of [`Row`]s
//! that share one column schema. Values are kept in column insertion order so
//! that rows written back to the warehouse keep a stable layout.

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Text layout used whenever a timestamp is rendered as a string.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
  #[default]
  Null,
  Text(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  Timestamp(NaiveDateTime),
}

static NULL: Value = Value::Null;

impl Value {
  /// True for `Null` and for NaN floats, which stand in for "no value" in
  /// upstream extracts.
  pub fn is_null(&self) -> bool {
    match self {
      Value::Null => true,
      Value::Float(f) => f.is_nan(),
      _ => false,
    }
  }

  /// Map NaN-like sentinels to [`Value::Null`].
  pub fn normalized(self) -> Self { if self.is_null() { Value::Null } else { self } }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Text(s) => Some(s),
      _ => None,
    }
  }

  /// Append the type-tagged byte encoding of this value to `out`.
  fn encode_into(&self, out: &mut Vec<u8>) {
    if self.is_null() {
      out.push(0);
      return;
    }
    match self {
      Value::Null => out.push(0),
      Value::Text(s) => {
        out.push(1);
        out.extend_from_slice(&(s.len() as u64).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
      }
      Value::Int(i) => {
        out.push(2);
        out.extend_from_slice(&i.to_le_bytes());
      }
      Value::Float(f) => {
        out.push(3);
        // -0.0 and 0.0 compare equal, so they must encode equal too.
        let f = if *f == 0.0 { 0.0 } else { *f };
        out.extend_from_slice(&f.to_bits().to_le_bytes());
      }
      Value::Bool(b) => {
        out.push(4);
        out.push(u8::from(*b));
      }
      Value::Timestamp(ts) => {
        out.push(5);
        let utc = ts.and_utc();
        out.extend_from_slice(&utc.timestamp().to_le_bytes());
        out.extend_from_slice(&utc.timestamp_subsec_nanos().to_le_bytes());
      }
    }
  }
}

/// Format a float the way it reads back unambiguously as a float (`1.0`, not
/// `1`).
pub(crate) fn format_float(f: f64) -> String { format!("{f:?}") }

impl fmt::Display for Value {
  /// Canonical text of the value. Nulls render as the empty string, which is
  /// what identifier salting expects.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_null() {
      return Ok(());
    }
    match self {
      Value::Null => Ok(()),
      Value::Text(s) => f.write_str(s),
      Value::Int(i) => write!(f, "{i}"),
      Value::Float(x) => f.write_str(&format_float(*x)),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Value::Text(s.to_owned()) }
}

impl From<String> for Value {
  fn from(s: String) -> Self { Value::Text(s) }
}

impl From<&String> for Value {
  fn from(s: &String) -> Self { Value::Text(s.clone()) }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self { Value::Int(i) }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self { Value::Int(i64::from(i)) }
}

impl From<f64> for Value {
  fn from(f: f64) -> Self { Value::Float(f) }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<NaiveDateTime> for Value {
  fn from(ts: NaiveDateTime) -> Self { Value::Timestamp(ts) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Value::Null, Into::into) }
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Canonical encoding of an ordered tuple of values.
///
/// Two keys are equal exactly when the tuples are equal, with null matching
/// null. Used for primary-key joins and, hashed, for content fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Vec<u8>);

impl Key {
  pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
    let mut out = Vec::new();
    for value in values {
      value.encode_into(&mut out);
    }
    Key(out)
  }

  /// SHA-256 of the encoded tuple.
  pub fn digest(&self) -> [u8; 32] { Sha256::digest(&self.0).into() }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// An ordered mapping from column name to [`Value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, Value>);

/// An unordered collection of rows of one entity type.
pub type RowSet = Vec<Row>;

impl Row {
  pub fn new() -> Self { Self::default() }

  /// The value in `column`, or [`Value::Null`] when the column is absent.
  pub fn get(&self, column: &str) -> &Value { self.0.get(column).unwrap_or(&NULL) }

  pub fn get_mut(&mut self, column: &str) -> Option<&mut Value> { self.0.get_mut(column) }

  /// The text in `column`, if it holds non-null text.
  pub fn text(&self, column: &str) -> Option<&str> { self.get(column).as_str() }

  pub fn contains(&self, column: &str) -> bool { self.0.contains_key(column) }

  /// Set `column`, keeping its position if it already exists.
  pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(column.into(), value.into());
  }

  /// Builder form of [`Row::set`].
  pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.set(column, value);
    self
  }

  /// Remove `column`, preserving the order of the remaining columns.
  pub fn remove(&mut self, column: &str) -> Value {
    self.0.shift_remove(column).unwrap_or_default()
  }

  /// Copy `columns` from `other` into this row, overwriting existing values.
  pub fn copy_from(&mut self, other: &Row, columns: &[&str]) {
    for column in columns {
      self.set(*column, other.get(column).clone());
    }
  }

  pub fn columns(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// The key of this row over `columns`, in the given order.
  pub fn key<S: AsRef<str>>(&self, columns: &[S]) -> Key {
    Key::from_values(columns.iter().map(|c| self.get(c.as_ref())))
  }
}

impl FromIterator<(String, Value)> for Row {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    Row(iter.into_iter().collect())
  }
}

impl IntoIterator for Row {
  type Item = (String, Value);
  type IntoIter = indexmap::map::IntoIter<String, Value>;

  fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

/// Build a [`Row`] from `column => value` pairs.
///
/// ```
/// use nexus_etl_core::row;
///
/// let r = row! { "pk" => "A", "val" => 1 };
/// assert_eq!(r.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
  () => { $crate::row::Row::new() };
  ($($column:expr => $value:expr),+ $(,)?) => {{
    let mut row = $crate::row::Row::new();
    $( row.set($column, $value); )+
    row
  }};
}
