//! The per-invocation run context.

use chrono::{NaiveDateTime, SubsecRound, Utc};
use nexus_etl_core::{
  coerce::coerce_rows,
  identity::IdentifierGenerator,
  row::{Row, RowSet},
  store::{Scope, Warehouse},
};

use crate::{
  Error, Result,
  config::EtlConfig,
  lookup::{Lookup, inner_join},
};

/// Identifier type of every study loaded from the archive.
pub const XNAT_PROJECT_ID: &str = "xnat_project_id";

/// Everything a pipeline needs besides its source: the warehouse, identity
/// settings and the process time shared by all loads of one invocation.
pub struct EtlContext<W> {
  pub warehouse:      W,
  pub ids:            IdentifierGenerator,
  pub uri_base:       String,
  pub process_time:   NaiveDateTime,
  pub src_system:     String,
  pub strict_lookups: bool,
}

/// The current UTC time, truncated to whole seconds.
pub fn process_time_now() -> NaiveDateTime { Utc::now().trunc_subsecs(0).naive_utc() }

impl<W: Warehouse> EtlContext<W> {
  pub fn new(warehouse: W, config: &EtlConfig) -> Self {
    Self {
      warehouse,
      ids: IdentifierGenerator::new(
        config.nexus.uri_salt.clone(),
        config.nexus.uri_salt_delimiter.clone(),
      ),
      uri_base: config.nexus.uri_base.clone(),
      process_time: process_time_now(),
      src_system: config.src_system.clone(),
      strict_lookups: config.strict_lookups,
    }
  }

  /// Rows of `table` in `scope`, coerced to their declared types.
  pub async fn fetch(&self, table: &'static str, scope: Scope) -> Result<RowSet> {
    let schema = self.warehouse.table_schema(table).await.map_err(Error::store)?;
    let rows = self.warehouse.fetch(table, scope).await.map_err(Error::store)?;
    Ok(coerce_rows(&schema, rows)?)
  }

  /// Copy parent attributes onto `rows`. Rows without a parent are dropped
  /// with a warning, or fail the load when lookups are strict.
  pub fn resolve(
    &self,
    entity: &'static str,
    rows: RowSet,
    parents: &[Row],
    lookup: &Lookup<'_>,
  ) -> Result<RowSet> {
    let (rows, dropped) = inner_join(rows, parents, lookup);
    if dropped > 0 {
      if self.strict_lookups {
        return Err(Error::MissingLookup { entity, parent: lookup.parent, count: dropped });
      }
      tracing::warn!("{entity}: dropped {dropped} rows with no {} row", lookup.parent);
    }
    Ok(rows)
  }
}

/// The rows of one archive project.
pub fn study_scope(project_id: &str) -> Scope {
  Scope::all()
    .eq("research_study_id", project_id)
    .eq("research_study_id_type", XNAT_PROJECT_ID)
}
