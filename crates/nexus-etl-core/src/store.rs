//! The `Warehouse` trait and the scope predicates it reads and writes by.
//!
//! The trait is implemented by storage backends (e.g.
//! `nexus-etl-store-sqlite`). Entity pipelines depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  row::{RowSet, Value},
  schema::TableSchema,
};

// ─── Scope ───────────────────────────────────────────────────────────────────

/// A conjunction of `column = value` predicates selecting one load's rows.
///
/// Null values match null, so a scope can pin a column to "absent".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
  pub predicates: Vec<(String, Value)>,
}

impl Scope {
  /// The whole table.
  pub fn all() -> Self { Self::default() }

  pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.predicates.push((column.into(), value.into()));
    self
  }

  /// Add a predicate only when `value` is present.
  pub fn eq_opt<V: Into<Value>>(self, column: impl Into<String>, value: Option<V>) -> Self {
    match value {
      Some(v) => self.eq(column, v),
      None => self,
    }
  }

  pub fn columns(&self) -> impl Iterator<Item = &str> {
    self.predicates.iter().map(|(c, _)| c.as_str())
  }

  pub fn is_empty(&self) -> bool { self.predicates.is_empty() }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational staging store.
///
/// Every load reads the persisted rows of its scope, computes a delta and
/// writes the full payload back. Tables are created by the backend when it
/// is opened.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait Warehouse: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The declared columns of `table`, in table order.
  fn table_schema(
    &self,
    table: &'static str,
  ) -> impl Future<Output = Result<TableSchema, Self::Error>> + Send + '_;

  /// Every row of `table` inside `scope`.
  fn fetch(
    &self,
    table: &'static str,
    scope: Scope,
  ) -> impl Future<Output = Result<RowSet, Self::Error>> + Send + '_;

  /// Delete `scope` from `table`, then append `rows`.
  fn replace(
    &self,
    table: &'static str,
    scope: Scope,
    rows: RowSet,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
