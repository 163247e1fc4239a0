//! Reuse of group and list identities minted by earlier runs.
//!
//! Freshly flattened responses get content-derived list URIs and no group
//! URIs at all. Before the delta is computed both are reconciled against the
//! persisted snapshot so that an unchanged answer keeps the identities it was
//! first stored with.

use std::collections::HashMap;

use super::{
  QUESTION_GROUP_ID, QUESTION_ID, QUESTION_TYPE, QUESTIONNAIRE_LABEL, RESPONSE_GROUP_URI,
  RESPONSE_INDEX, RESPONSE_ITEM_URI, RESPONSE_LIST_GROUP_URI, RESPONSE_SUBJECT_URI, parent_index,
};
use crate::{
  Error, Result,
  row::{Key, Row, Value},
};

/// Question types that contain other questions.
pub const CONTAINER_TYPES: &[&str] =
  &["columns", "container", "tree", "datagrid", "editgrid", "datamap"];

/// Columns that must agree before a stored list URI is reused.
const LIST_MATCH: &[&str] = &[
  RESPONSE_SUBJECT_URI,
  QUESTIONNAIRE_LABEL,
  QUESTION_ID,
  QUESTION_GROUP_ID,
  RESPONSE_GROUP_URI,
];

/// Set each row's `response_group_uri` to the item URI of the container row
/// it belongs to.
///
/// Containers are looked up in `prior` by subject, questionnaire, their
/// dotted group path and their index path. A row belongs to the container
/// whose path equals the row's `question_group_id` and whose index is the
/// row's index minus its last segment. Rows with no container get null.
pub fn assign_group_uris(prior: &[Row], rows: &mut [Row]) {
  let mut containers: HashMap<Key, Value> = HashMap::new();
  for row in prior {
    let is_container = row.text(QUESTION_TYPE).is_some_and(|t| CONTAINER_TYPES.contains(&t));
    let uri = row.get(RESPONSE_ITEM_URI);
    if !is_container || uri.is_null() {
      continue;
    }
    let path = match row.text(QUESTION_GROUP_ID) {
      Some(group) => format!("{group}.{}", row.get(QUESTION_ID)),
      None => row.get(QUESTION_ID).to_string(),
    };
    let key = Key::from_values(&[
      row.get(RESPONSE_SUBJECT_URI).clone(),
      row.get(QUESTIONNAIRE_LABEL).clone(),
      Value::from(path),
      row.get(RESPONSE_INDEX).clone(),
    ]);
    containers.entry(key).or_insert_with(|| uri.clone());
  }

  for row in rows.iter_mut() {
    let group_index = row.text(RESPONSE_INDEX).and_then(parent_index);
    let key = Key::from_values(&[
      row.get(RESPONSE_SUBJECT_URI).clone(),
      row.get(QUESTIONNAIRE_LABEL).clone(),
      row.get(QUESTION_GROUP_ID).clone(),
      Value::from(group_index),
    ]);
    let uri = containers.get(&key).cloned().unwrap_or_default();
    row.set(RESPONSE_GROUP_URI, uri);
  }
}

/// Replace freshly derived list URIs with the ones already stored.
///
/// A row is matched against `prior` on subject, questionnaire, question,
/// group and group URI, plus its index path when it has one. When several
/// distinct stored URIs match without an index, the lookup is retried with
/// the index. A row with no match keeps its own URI; a row that stays
/// ambiguous is an [`Error::AmbiguousIdentity`].
pub fn assign_list_uris(prior: &[Row], rows: &mut [Row]) -> Result<()> {
  let mut by_identity: HashMap<Key, Vec<&Row>> = HashMap::new();
  for row in prior {
    by_identity.entry(row.key(LIST_MATCH)).or_default().push(row);
  }

  for row in rows.iter_mut() {
    let Some(candidates) = by_identity.get(&row.key(LIST_MATCH)) else {
      continue;
    };
    let index = row.get(RESPONSE_INDEX);

    let mut found = distinct_uris(candidates, (!index.is_null()).then_some(index));
    if found.len() > 1 && index.is_null() {
      found = distinct_uris(candidates, Some(index));
    }

    match found.as_slice() {
      [] => {}
      [uri] => {
        let uri = (*uri).clone();
        row.set(RESPONSE_LIST_GROUP_URI, uri);
      }
      many => {
        return Err(Error::AmbiguousIdentity {
          question_id: row.get(QUESTION_ID).to_string(),
          group_id:    row.text(QUESTION_GROUP_ID).map(str::to_owned),
          index:       row.text(RESPONSE_INDEX).map(str::to_owned),
          matches:     many.len(),
        });
      }
    }
  }
  Ok(())
}

/// The distinct list URIs among `candidates`, optionally restricted to one
/// index path.
fn distinct_uris<'a>(candidates: &[&'a Row], index: Option<&Value>) -> Vec<&'a Value> {
  let mut found: Vec<&Value> = Vec::new();
  for row in candidates {
    if index.is_some_and(|i| row.get(RESPONSE_INDEX) != i) {
      continue;
    }
    let uri = row.get(RESPONSE_LIST_GROUP_URI);
    if !found.contains(&uri) {
      found.push(uri);
    }
  }
  found
}
