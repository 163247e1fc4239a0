//! The generic entity load every pipeline ends in.
//!
//! A load reads the persisted rows of its scope, classifies them against the
//! freshly extracted rows, materializes the result and, unless nothing
//! changed, rewrites the scope with it.

use nexus_etl_core::{
  coerce::coerce_rows,
  delta::{DeltaSummary, classify},
  materialize::{MaterializeOptions, UriScope, materialize},
  row::{Row, RowSet},
  store::{Scope, Warehouse},
};

use crate::{Error, Result, context::EtlContext};

/// Static description of one warehouse entity.
#[derive(Debug, Clone, Copy)]
pub struct EntitySpec {
  pub table:        &'static str,
  pub uri_column:   &'static str,
  pub pk_columns:   &'static [&'static str],
  /// Salted into derived URIs. Empty means random URIs.
  pub salt_columns: &'static [&'static str],
  pub generate_uri: bool,
  pub uri_scope:    UriScope,
}

impl EntitySpec {
  /// An entity whose URI is derived from its primary key.
  pub const fn keyed(
    table: &'static str,
    uri_column: &'static str,
    pk_columns: &'static [&'static str],
  ) -> Self {
    Self {
      table,
      uri_column,
      pk_columns,
      salt_columns: pk_columns,
      generate_uri: true,
      uri_scope: UriScope::AllInserts,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
  pub table:   &'static str,
  pub summary: DeltaSummary,
  /// Whether the scope was rewritten.
  pub written: bool,
}

/// Load `incoming` into `spec.table`, replacing the rows selected by `scope`.
pub async fn load_entity<W: Warehouse>(
  ctx: &EtlContext<W>,
  spec: &EntitySpec,
  scope: Scope,
  incoming: RowSet,
) -> Result<LoadReport> {
  load_entity_with(ctx, spec, scope, incoming, |_, _| Ok(()), |_| Ok(())).await
}

/// [`load_entity`] with two hooks: `prepare` sees the typed stored rows and
/// may rewrite the incoming ones before classification; `finish` may rewrite
/// the materialized payload before it is written.
pub async fn load_entity_with<W, P, F>(
  ctx: &EtlContext<W>,
  spec: &EntitySpec,
  scope: Scope,
  incoming: RowSet,
  prepare: P,
  finish: F,
) -> Result<LoadReport>
where
  W: Warehouse,
  P: FnOnce(&[Row], &mut [Row]) -> Result<()>,
  F: FnOnce(&mut RowSet) -> Result<()>,
{
  let schema = ctx.warehouse.table_schema(spec.table).await.map_err(Error::store)?;
  let mut incoming = coerce_rows(&schema, schema.conform_all(&incoming))?;

  let existing = ctx
    .warehouse
    .fetch(spec.table, scope.clone())
    .await
    .map_err(Error::store)?;
  let existing = coerce_rows(&schema, schema.conform_all(&existing))?;

  prepare(&existing, &mut incoming)?;

  let delta = classify(existing, incoming, spec.uri_column, spec.pk_columns)?;
  let summary = delta.summary();
  if summary.is_noop() {
    tracing::info!("{}: {summary}; nothing to write", spec.table);
    return Ok(LoadReport { table: spec.table, summary, written: false });
  }

  let options = MaterializeOptions {
    table:        spec.table,
    uri_base:     &ctx.uri_base,
    process_time: ctx.process_time,
    uri_column:   spec.uri_column,
    generate_uri: spec.generate_uri,
    salt_columns: spec.salt_columns,
    uri_scope:    spec.uri_scope,
  };
  let mut rows = materialize(delta, &options, &ctx.ids)?;
  finish(&mut rows)?;
  let rows = coerce_rows(&schema, schema.conform_all(&rows))?;

  ctx
    .warehouse
    .replace(spec.table, scope, rows)
    .await
    .map_err(Error::store)?;
  tracing::info!("{}: {summary}", spec.table);
  Ok(LoadReport { table: spec.table, summary, written: true })
}
