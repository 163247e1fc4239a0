//! Error type for `nexus-etl-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] nexus_etl_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("no such table: {0}")]
  UnknownTable(String),

  /// A scope predicate or row named a column the table does not declare.
  #[error("table {table} has no column {column:?}")]
  UnknownColumn { table: String, column: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
