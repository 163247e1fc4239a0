//! Turns a classified [`Delta`] into the rows that must be stored.

use chrono::NaiveDateTime;

use crate::{
  Error, Result,
  delta::{CREATED_AT, Delta, DeltaAction, REVISION, UPDATED_AT, next_revision},
  identity::IdentifierGenerator,
  row::{RowSet, Value},
};

/// Question types whose items carry selectable answer options.
pub const ANSWER_OPTION_TYPES: &[&str] = &["select", "xnatSelect", "radio", "selectboxes"];

/// Which inserted rows receive an identity URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UriScope {
  /// Every inserted row.
  #[default]
  AllInserts,
  /// Only rows whose `question_type` has answer options; the identity column
  /// of every other inserted row is nulled.
  AnswerOptionItems,
}

#[derive(Debug, Clone)]
pub struct MaterializeOptions<'a> {
  /// Named in diagnostics.
  pub table:        &'a str,
  pub uri_base:     &'a str,
  pub process_time: NaiveDateTime,
  pub uri_column:   &'a str,
  pub generate_uri: bool,
  /// Columns salted into derived URIs. Empty means random URIs.
  pub salt_columns: &'a [&'a str],
  pub uri_scope:    UriScope,
}

/// Produce the load payload for `delta`.
///
/// Unchanged rows pass through. Updated rows get a new update time and the
/// next revision. Inserted rows get creation and update times, revision 1
/// and, when requested, an identity URI. Deleted rows are left out.
pub fn materialize(
  delta: Delta,
  options: &MaterializeOptions<'_>,
  ids: &IdentifierGenerator,
) -> Result<RowSet> {
  let mut unchanged = Vec::new();
  let mut inserts = Vec::new();
  let mut updates = Vec::new();

  for classified in delta.rows {
    let mut row = classified.row;
    match classified.action {
      DeltaAction::NoChange => unchanged.push(row),
      DeltaAction::Delete => {}
      DeltaAction::Update => {
        let rev = next_revision(row.get(REVISION)).ok_or_else(|| Error::Coercion {
          table:  options.table.to_owned(),
          column: REVISION.to_owned(),
          value:  format!("{:?}", row.get(REVISION)),
          target: "integer",
        })?;
        row.set(UPDATED_AT, options.process_time);
        row.set(REVISION, rev);
        updates.push(row);
      }
      DeltaAction::Insert => {
        row.set(CREATED_AT, options.process_time);
        row.set(UPDATED_AT, options.process_time);
        row.set(REVISION, 1);
        if options.generate_uri {
          let addressable = match options.uri_scope {
            UriScope::AllInserts => true,
            UriScope::AnswerOptionItems => row
              .text("question_type")
              .is_some_and(|t| ANSWER_OPTION_TYPES.contains(&t)),
          };
          let uri = if !addressable {
            Value::Null
          } else if options.salt_columns.is_empty() {
            Value::Text(ids.random(options.uri_base))
          } else {
            Value::Text(ids.derive_for_row(options.uri_base, &row, options.salt_columns))
          };
          row.set(options.uri_column, uri);
        }
        inserts.push(row);
      }
    }
  }

  unchanged.extend(inserts);
  unchanged.extend(updates);
  Ok(unchanged)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    delta::{Classified, classify},
    row,
    row::Row,
  };

  fn at(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(h, 0, 0).unwrap()
  }

  fn options(time: NaiveDateTime) -> MaterializeOptions<'static> {
    MaterializeOptions {
      table:        "t",
      uri_base:     "https://nexus/",
      process_time: time,
      uri_column:   "uri",
      generate_uri: true,
      salt_columns: &["pk"],
      uri_scope:    UriScope::AllInserts,
    }
  }

  fn ids() -> IdentifierGenerator { IdentifierGenerator::new("salt", "|") }

  fn run(existing: RowSet, incoming: RowSet, time: NaiveDateTime) -> RowSet {
    let delta = classify(existing, incoming, "uri", &["pk"]).unwrap();
    materialize(delta, &options(time), &ids()).unwrap()
  }

  #[test]
  fn insert_update_delete_lifecycle() {
    let first = run(vec![], vec![row! { "pk" => "A", "val" => 1 }], at(1));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].get(REVISION), &Value::Int(1));
    assert_eq!(first[0].get(CREATED_AT), &Value::Timestamp(at(1)));
    let uri = first[0].text("uri").unwrap().to_owned();
    assert!(uri.starts_with("https://nexus/"));

    let second = run(first, vec![row! { "pk" => "A", "val" => 2 }], at(2));
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].get("val"), &Value::Int(2));
    assert_eq!(second[0].get(REVISION), &Value::Int(2));
    assert_eq!(second[0].get(CREATED_AT), &Value::Timestamp(at(1)));
    assert_eq!(second[0].get(UPDATED_AT), &Value::Timestamp(at(2)));
    assert_eq!(second[0].text("uri"), Some(uri.as_str()));

    let third = run(second, vec![], at(3));
    assert!(third.is_empty());
  }

  #[test]
  fn revisions_climb_by_one_per_change() {
    let mut stored = run(vec![], vec![row! { "pk" => "A", "val" => 0 }], at(0));
    for v in 1..5 {
      stored = run(stored, vec![row! { "pk" => "A", "val" => v }], at(v as u32));
      assert_eq!(stored[0].get(REVISION), &Value::Int(i64::from(v) + 1));
    }
    stored = run(stored.clone(), vec![row! { "pk" => "A", "val" => 4 }], at(9));
    assert_eq!(stored[0].get(REVISION), &Value::Int(5));
  }

  #[test]
  fn reinserted_entity_gets_same_salted_uri() {
    let first = run(vec![], vec![row! { "pk" => "A", "val" => 1 }], at(1));
    let other = run(vec![], vec![row! { "pk" => "A", "val" => 7 }], at(5));
    assert_eq!(first[0].get("uri"), other[0].get("uri"));
  }

  #[test]
  fn no_salt_means_random_uri() {
    let delta = Delta {
      rows: vec![Classified { action: DeltaAction::Insert, row: row! { "pk" => "A" } }],
    };
    let opts = MaterializeOptions { salt_columns: &[], ..options(at(1)) };
    let a = materialize(delta.clone(), &opts, &ids()).unwrap();
    let b = materialize(delta, &opts, &ids()).unwrap();
    assert_ne!(a[0].get("uri"), b[0].get("uri"));
  }

  #[test]
  fn answer_option_scope_nulls_other_items() {
    let rows: Vec<Classified> = ["select", "textfield"]
      .into_iter()
      .map(|t| Classified {
        action: DeltaAction::Insert,
        row:    row! { "pk" => t, "question_type" => t, "uri" => "stale" },
      })
      .collect();
    let opts = MaterializeOptions { uri_scope: UriScope::AnswerOptionItems, ..options(at(1)) };
    let out = materialize(Delta { rows }, &opts, &ids()).unwrap();

    let by_type = |t: &str| out.iter().find(|r: &&Row| r.text("question_type") == Some(t));
    assert!(by_type("select").unwrap().text("uri").is_some_and(|u| u != "stale"));
    assert_eq!(by_type("textfield").unwrap().get("uri"), &Value::Null);
  }

  #[test]
  fn unreadable_revisions_name_their_table() {
    let row = row! { "pk" => "A", "val" => 2, REVISION => "seven" };
    let delta = Delta { rows: vec![Classified { action: DeltaAction::Update, row }] };
    let err = materialize(delta, &options(at(2)), &ids()).unwrap_err();
    assert!(matches!(
      err,
      Error::Coercion { ref table, ref column, .. } if table == "t" && column == REVISION
    ));
  }

  #[test]
  fn unchanged_rows_pass_through_untouched() {
    let first = run(vec![], vec![row! { "pk" => "A", "val" => 1 }], at(1));
    let again = run(first.clone(), vec![row! { "pk" => "A", "val" => 1 }], at(2));
    assert_eq!(again, first);
  }
}
