//! [`SqliteWarehouse`]: the SQLite implementation of [`Warehouse`].

use std::path::Path;

use nexus_etl_core::{
  row::{Row, RowSet},
  schema::TableSchema,
  store::{Scope, Warehouse},
};
use rusqlite::types::Value as SqlValue;

use crate::{
  Error, Result,
  encode::{decode_value, encode_value, quote_ident},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A staging warehouse backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteWarehouse {
  conn: tokio_rusqlite::Connection,
}

impl SqliteWarehouse {
  /// Open (or create) a warehouse at `path` and create any missing tables.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory warehouse, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fail unless every scope column is declared by `schema`.
  fn check_columns<'a>(
    schema: &TableSchema,
    columns: impl IntoIterator<Item = &'a str>,
  ) -> Result<()> {
    for column in columns {
      if !schema.contains(column) {
        return Err(Error::UnknownColumn {
          table:  schema.table.clone(),
          column: column.to_owned(),
        });
      }
    }
    Ok(())
  }
}

/// `WHERE` clause and parameters for `scope`, numbered from `?1`.
fn where_clause(scope: &Scope) -> (String, Vec<SqlValue>) {
  if scope.is_empty() {
    return (String::new(), Vec::new());
  }
  let predicates: Vec<String> = scope
    .columns()
    .enumerate()
    .map(|(i, c)| format!("{} IS ?{}", quote_ident(c), i + 1))
    .collect();
  let params = scope.predicates.iter().map(|(_, v)| encode_value(v)).collect();
  (format!(" WHERE {}", predicates.join(" AND ")), params)
}

// ─── Warehouse impl ──────────────────────────────────────────────────────────

impl Warehouse for SqliteWarehouse {
  type Error = Error;

  async fn table_schema(&self, table: &'static str) -> Result<TableSchema> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));

    let declared: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    if declared.is_empty() {
      return Err(Error::UnknownTable(table.to_owned()));
    }
    let schema = TableSchema::from_declared(
      table,
      declared.iter().map(|(name, ty)| (name.as_str(), ty.as_str())),
    )?;
    Ok(schema)
  }

  async fn fetch(&self, table: &'static str, scope: Scope) -> Result<RowSet> {
    let schema = self.table_schema(table).await?;
    Self::check_columns(&schema, scope.columns())?;

    let (filter, params) = where_clause(&scope);
    let sql = format!("SELECT * FROM {}{filter}", quote_ident(table));

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> =
          stmt.column_names().into_iter().map(str::to_owned).collect();
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |r| {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
              row.set(name.as_str(), decode_value(r.get_ref(i)?));
            }
            Ok(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows)
  }

  async fn replace(&self, table: &'static str, scope: Scope, rows: RowSet) -> Result<()> {
    let schema = self.table_schema(table).await?;
    Self::check_columns(&schema, scope.columns())?;
    for row in &rows {
      Self::check_columns(&schema, row.columns())?;
    }

    let (filter, params) = where_clause(&scope);
    let delete = format!("DELETE FROM {}{filter}", quote_ident(table));
    let inserts: Vec<(String, Vec<SqlValue>)> = rows
      .iter()
      .map(|row| {
        let columns: Vec<String> = row.columns().map(quote_ident).collect();
        let slots: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
          "INSERT INTO {} ({}) VALUES ({})",
          quote_ident(table),
          columns.join(", "),
          slots.join(", ")
        );
        (sql, row.iter().map(|(_, v)| encode_value(v)).collect())
      })
      .collect();
    let count = inserts.len();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let deleted = tx.execute(&delete, rusqlite::params_from_iter(params.iter()))?;
        for (sql, values) in &inserts {
          tx.prepare_cached(sql)?
            .execute(rusqlite::params_from_iter(values.iter()))?;
        }
        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    tracing::debug!("{table}: replaced {deleted} rows with {count}");
    Ok(())
  }
}
