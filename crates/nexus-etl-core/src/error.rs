//! Error types for `nexus-etl-core`.

use thiserror::Error;

use crate::row::Row;

#[derive(Debug, Error)]
pub enum Error {
  /// A value could not be converted to its column's declared type.
  #[error("cannot coerce {value:?} in {table}.{column} to {target}")]
  Coercion {
    table:  String,
    column: String,
    value:  String,
    target: &'static str,
  },

  #[error("declared type {declared:?} of column {column:?} has no mapping")]
  UnmappedType { column: String, declared: String },

  /// Two or more classified rows share one primary-key tuple.
  #[error("{} rows share a primary key after delta classification", .rows.len())]
  DuplicateKey { rows: Vec<Row> },

  /// More than one historical list-group URI matched even with the list
  /// position included in the lookup.
  #[error(
    "{matches} historical list-group URIs match question {question_id:?} in \
     group {group_id:?} at position {index:?}"
  )]
  AmbiguousIdentity {
    question_id: String,
    group_id:    Option<String>,
    index:       Option<String>,
    matches:     usize,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
