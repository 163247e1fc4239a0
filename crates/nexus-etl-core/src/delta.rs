//! Delta classification: existing snapshot + fresh extract → per-row actions.
//!
//! Rows are first compared by a content fingerprint over every non-metadata
//! column. Rows whose content already exists in the persisted snapshot are
//! left alone; the rest are outer-joined on the primary key to decide
//! between insert, update and delete.

use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use strum::Display;

use crate::{
  Error, Result,
  coerce::exact_i64,
  row::{Key, Row, RowSet, Value},
};

/// Set once, when the row is first inserted.
pub const CREATED_AT: &str = "_createdat";
/// Set on insert and on every update.
pub const UPDATED_AT: &str = "_updatedat";
/// Starts at 1, incremented by exactly 1 per update.
pub const REVISION: &str = "_rev";

/// What the load must do with a classified row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DeltaAction {
  Insert,
  Update,
  Delete,
  NoChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
  pub action: DeltaAction,
  pub row:    Row,
}

/// The classified union of an existing snapshot and an incoming extract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
  pub rows: Vec<Classified>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaSummary {
  pub inserts:   usize,
  pub updates:   usize,
  pub deletes:   usize,
  pub unchanged: usize,
}

impl DeltaSummary {
  /// True when applying the delta would not change the stored rows.
  pub fn is_noop(&self) -> bool { self.inserts + self.updates + self.deletes == 0 }
}

impl fmt::Display for DeltaSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} inserted, {} updated, {} deleted, {} unchanged",
      self.inserts, self.updates, self.deletes, self.unchanged
    )
  }
}

impl Delta {
  pub fn summary(&self) -> DeltaSummary {
    let mut s = DeltaSummary::default();
    for c in &self.rows {
      match c.action {
        DeltaAction::Insert => s.inserts += 1,
        DeltaAction::Update => s.updates += 1,
        DeltaAction::Delete => s.deletes += 1,
        DeltaAction::NoChange => s.unchanged += 1,
      }
    }
    s
  }

  pub fn with_action(&self, action: DeltaAction) -> impl Iterator<Item = &Row> {
    self.rows.iter().filter(move |c| c.action == action).map(|c| &c.row)
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
  Existing,
  Incoming,
}

/// Classify every row of `existing` and `incoming`.
///
/// `uri_column` names the identity column; together with [`CREATED_AT`],
/// [`UPDATED_AT`] and [`REVISION`] it is excluded from content comparison.
/// Fails with [`Error::DuplicateKey`] when two classified rows share a
/// primary-key tuple.
pub fn classify(
  existing: RowSet,
  incoming: RowSet,
  uri_column: &str,
  pk_columns: &[&str],
) -> Result<Delta> {
  if existing.is_empty() {
    let rows = incoming
      .into_iter()
      .map(|row| Classified { action: DeltaAction::Insert, row })
      .collect();
    let delta = Delta { rows };
    check_unique(&delta, pk_columns)?;
    return Ok(delta);
  }

  let existing: RowSet = existing.into_iter().map(normalize).collect();
  let incoming: RowSet = incoming.into_iter().map(normalize).collect();

  let metadata = [uri_column, CREATED_AT, UPDATED_AT, REVISION];
  let compare = comparison_columns(&existing, &incoming, &metadata);

  let mut groups: IndexMap<[u8; 32], Vec<(Side, usize)>> = IndexMap::new();
  for (side, rows) in [(Side::Existing, &existing), (Side::Incoming, &incoming)] {
    for (i, row) in rows.iter().enumerate() {
      groups
        .entry(row.key(&compare).digest())
        .or_default()
        .push((side, i));
    }
  }

  let mut unchanged = Vec::new();
  let mut prev_candidates = Vec::new();
  let mut curr_candidates = Vec::new();

  for members in groups.values() {
    if let [(side, i)] = members.as_slice() {
      match side {
        Side::Existing => prev_candidates.push(*i),
        Side::Incoming => curr_candidates.push(*i),
      }
      continue;
    }

    let settled: Vec<usize> = members
      .iter()
      .filter(|(side, i)| *side == Side::Existing && !existing[*i].get(REVISION).is_null())
      .map(|(_, i)| *i)
      .collect();

    if settled.is_empty() {
      // Repeated content that was never persisted: keep one of each side.
      tracing::debug!("{} rows share unsettled content; keeping one per side", members.len());
      if let Some((_, i)) = members.iter().find(|(s, _)| *s == Side::Existing) {
        prev_candidates.push(*i);
      }
      if let Some((_, i)) = members.iter().find(|(s, _)| *s == Side::Incoming) {
        curr_candidates.push(*i);
      }
    } else {
      unchanged.extend(settled);
    }
  }

  let mut rows = Vec::new();
  rows.extend(unchanged.iter().map(|&i| Classified {
    action: DeltaAction::NoChange,
    row:    existing[i].clone(),
  }));
  rows.extend(join_on_key(
    &existing,
    &prev_candidates,
    &incoming,
    &curr_candidates,
    pk_columns,
    &metadata,
  ));

  let delta = Delta { rows };
  check_unique(&delta, pk_columns)?;
  Ok(delta)
}

fn normalize(row: Row) -> Row {
  row.into_iter().map(|(k, v)| (k, v.normalized())).collect()
}

/// Every non-metadata column seen on either side, in sorted order.
fn comparison_columns<'a>(
  existing: &'a [Row],
  incoming: &'a [Row],
  metadata: &[&str],
) -> Vec<&'a str> {
  let mut columns: Vec<&str> = existing
    .iter()
    .chain(incoming)
    .flat_map(Row::columns)
    .filter(|c| !metadata.contains(c))
    .collect();
  columns.sort_unstable();
  columns.dedup();
  columns
}

/// Outer-join the changed candidates on the primary key.
fn join_on_key(
  existing: &[Row],
  prev: &[usize],
  incoming: &[Row],
  curr: &[usize],
  pk_columns: &[&str],
  metadata: &[&str],
) -> Vec<Classified> {
  let mut by_key: HashMap<Key, Vec<usize>> = HashMap::new();
  for &i in prev {
    by_key.entry(existing[i].key(pk_columns)).or_default().push(i);
  }

  let mut matched = vec![false; existing.len()];
  let mut out = Vec::new();

  for &j in curr {
    let new_row = &incoming[j];
    match by_key.get(&new_row.key(pk_columns)) {
      None => out.push(Classified { action: DeltaAction::Insert, row: new_row.clone() }),
      Some(olds) => {
        for &i in olds {
          matched[i] = true;
          out.push(Classified {
            action: DeltaAction::Update,
            row:    carry_metadata(new_row, &existing[i], metadata),
          });
        }
      }
    }
  }

  out.extend(prev.iter().filter(|&&i| !matched[i]).map(|&i| Classified {
    action: DeltaAction::Delete,
    row:    existing[i].clone(),
  }));
  out
}

/// The incoming row's content with the stored row's identity, timestamps and
/// revision.
fn carry_metadata(new_row: &Row, old_row: &Row, metadata: &[&str]) -> Row {
  let mut row: Row = new_row
    .iter()
    .filter(|(c, _)| !metadata.contains(c))
    .map(|(c, v)| (c.to_owned(), v.clone()))
    .collect();
  row.copy_from(old_row, metadata);
  row
}

fn check_unique(delta: &Delta, pk_columns: &[&str]) -> Result<()> {
  let mut seen: IndexMap<Key, Vec<&Classified>> = IndexMap::new();
  for c in &delta.rows {
    seen.entry(c.row.key(pk_columns)).or_default().push(c);
  }

  let dupes: Vec<&Classified> = seen.into_values().filter(|g| g.len() > 1).flatten().collect();
  if dupes.is_empty() {
    return Ok(());
  }

  for c in &dupes {
    let dump = serde_json::to_string(&c.row).unwrap_or_else(|_| format!("{:?}", c.row));
    tracing::error!("duplicate key ({}): {dump}", c.action);
  }
  Err(Error::DuplicateKey { rows: dupes.into_iter().map(|c| c.row.clone()).collect() })
}

/// The revision a row will carry after one more update.
pub fn next_revision(current: &Value) -> Option<i64> {
  match current {
    v if v.is_null() => Some(1),
    Value::Int(i) => i.checked_add(1),
    Value::Float(f) => exact_i64(*f)?.checked_add(1),
    Value::Text(s) => s.trim().parse::<i64>().ok()?.checked_add(1),
    _ => None,
  }
}
