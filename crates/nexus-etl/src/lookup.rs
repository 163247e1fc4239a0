//! Parent-attribute lookups.
//!
//! Child entities copy identifying attributes (URIs, titles) from their
//! already-loaded parents, matched on shared key columns.

use std::collections::HashMap;

use nexus_etl_core::row::{Key, Row, RowSet, Value};

/// How a child row finds its parent.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
  /// Parent entity, for diagnostics.
  pub parent:  &'static str,
  /// Key columns present on both sides.
  pub on:      &'a [&'a str],
  /// Parent columns copied onto the child, replacing any existing value.
  pub columns: &'a [&'a str],
}

fn index<'p>(parents: &'p [Row], on: &[&str]) -> HashMap<Key, Vec<&'p Row>> {
  let mut by_key: HashMap<Key, Vec<&Row>> = HashMap::new();
  for parent in parents {
    by_key.entry(parent.key(on)).or_default().push(parent);
  }
  by_key
}

/// One output row per (row, matching parent) pair. Rows without a parent
/// are dropped; their count is returned alongside.
pub fn inner_join(rows: RowSet, parents: &[Row], lookup: &Lookup<'_>) -> (RowSet, usize) {
  let by_key = index(parents, lookup.on);
  let mut out = Vec::with_capacity(rows.len());
  let mut dropped = 0;
  for row in rows {
    match by_key.get(&row.key(lookup.on)) {
      Some(matches) => {
        for parent in matches {
          let mut joined = row.clone();
          joined.copy_from(parent, lookup.columns);
          out.push(joined);
        }
      }
      None => dropped += 1,
    }
  }
  (out, dropped)
}

/// Like [`inner_join`], but a row without a parent is kept with the lookup
/// columns set to null.
pub fn left_join(rows: RowSet, parents: &[Row], lookup: &Lookup<'_>) -> RowSet {
  let by_key = index(parents, lookup.on);
  let mut out = Vec::with_capacity(rows.len());
  for mut row in rows {
    match by_key.get(&row.key(lookup.on)) {
      Some(matches) => {
        for parent in matches {
          let mut joined = row.clone();
          joined.copy_from(parent, lookup.columns);
          out.push(joined);
        }
      }
      None => {
        for column in lookup.columns {
          row.set(*column, Value::Null);
        }
        out.push(row);
      }
    }
  }
  out
}
