use std::collections::HashMap;

use super::{
  QUESTION_GROUP_ID, QUESTION_ID, QUESTION_TYPE, RESPONSE_CODE_DISPLAY, RESPONSE_INDEX,
  RESPONSE_LIST_GROUP_URI, RESPONSE_TEXT, ResponseNode,
};
use crate::row::{Key, Row, RowSet, Value};

/// Question types answered by ticking any number of checkboxes.
const MULTI_SELECT: &str = "selectboxes";
/// Question types whose source enumerates every option, selected or not.
const SINGLE_SELECT: &[&str] = &["select", "xnatSelect", "radio"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedResponses {
  pub rows:      RowSet,
  /// Nodes with no question metadata. Their questionnaire is no longer
  /// defined, so they are not loaded.
  pub unmatched: Vec<ResponseNode>,
}

/// Attach question metadata to flattened nodes.
///
/// `questions` rows carry `question_id`, `question_group_id`,
/// `question_type` and `response_code_display`, one row per answer option.
/// `free_form` rows describe containers whose keys are user defined and
/// match on `question_group_id` alone. Every output row is its metadata row
/// plus the node's id, group, answer text, index path and list URI.
pub fn join_responses(
  nodes: Vec<ResponseNode>,
  questions: &[Row],
  free_form: &[Row],
) -> JoinedResponses {
  let mut single: HashMap<Key, Vec<&Row>> = HashMap::new();
  let mut multi: HashMap<Key, Vec<&Row>> = HashMap::new();
  for def in questions {
    let key = def.key(&[QUESTION_ID, QUESTION_GROUP_ID]);
    if def.text(QUESTION_TYPE) == Some(MULTI_SELECT) {
      multi.entry(key).or_default().push(def);
    } else {
      single.entry(key).or_default().push(def);
    }
  }
  let mut by_group: HashMap<Key, Vec<&Row>> = HashMap::new();
  for def in free_form {
    by_group.entry(def.key(&[QUESTION_GROUP_ID])).or_default().push(def);
  }

  let mut out = JoinedResponses::default();
  for node in nodes {
    let key = Key::from_values(&[
      Value::from(node.question_id.as_str()),
      Value::from(node.group_id.as_deref()),
    ]);

    if !node.multiselect {
      if let Some(defs) = single.get(&key) {
        // Known question: unpicked options vanish, nothing is orphaned.
        out.rows.extend(
          defs
            .iter()
            .filter(|def| is_selected(def, &node))
            .map(|def| attach(def, &node)),
        );
        continue;
      }
    }

    let matched: Vec<Row> = if node.multiselect {
      multi
        .get(&key)
        .into_iter()
        .flatten()
        .filter(|def| def.text(RESPONSE_CODE_DISPLAY) == node.answer.as_deref())
        .map(|def| attach(def, &node))
        .collect()
    } else if node.group_id.is_some() {
      let group = Key::from_values(&[Value::from(node.group_id.as_deref())]);
      by_group
        .get(&group)
        .into_iter()
        .flatten()
        .map(|def| attach(def, &node))
        .collect()
    } else {
      Vec::new()
    };

    if matched.is_empty() {
      out.unmatched.push(node);
    } else {
      out.rows.extend(matched);
    }
  }
  out
}

/// Single-select rows that do not carry the option's display text stand for
/// options the respondent did not pick.
fn is_selected(def: &Row, node: &ResponseNode) -> bool {
  match def.text(QUESTION_TYPE) {
    Some(t) if SINGLE_SELECT.contains(&t) => {
      def.text(RESPONSE_CODE_DISPLAY) == node.answer.as_deref()
    }
    _ => true,
  }
}

fn attach(def: &Row, node: &ResponseNode) -> Row {
  def
    .clone()
    .with(QUESTION_ID, node.question_id.as_str())
    .with(QUESTION_GROUP_ID, node.group_id.as_deref())
    .with(RESPONSE_TEXT, node.answer.as_deref())
    .with(RESPONSE_INDEX, node.index_path.as_str())
    .with(RESPONSE_LIST_GROUP_URI, node.list_group_uri.as_deref())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::row;

  fn node(qid: &str, group: Option<&str>, answer: &str, multiselect: bool) -> ResponseNode {
    ResponseNode {
      question_id: qid.to_owned(),
      group_id: group.map(str::to_owned),
      index_path: "0.0".to_owned(),
      list_group_uri: Some("list/1".to_owned()),
      answer: Some(answer.to_owned()),
      multiselect,
    }
  }

  fn def(qid: &str, group: &str, ty: &str, display: Option<&str>) -> Row {
    row! {
      QUESTION_ID => qid,
      QUESTION_GROUP_ID => group,
      QUESTION_TYPE => ty,
      RESPONSE_CODE_DISPLAY => display,
      "questionnaire_label" => "Intake",
    }
  }

  #[test]
  fn free_text_joins_on_question_and_group() {
    let joined = join_responses(
      vec![node("age", Some("form"), "42", false)],
      &[def("age", "form", "textfield", None)],
      &[],
    );
    assert_eq!(joined.rows.len(), 1);
    let r = &joined.rows[0];
    assert_eq!(r.text(RESPONSE_TEXT), Some("42"));
    assert_eq!(r.text("questionnaire_label"), Some("Intake"));
    assert_eq!(r.text(RESPONSE_INDEX), Some("0.0"));
    assert_eq!(r.text(RESPONSE_LIST_GROUP_URI), Some("list/1"));
  }

  #[test]
  fn single_select_keeps_only_the_chosen_option() {
    let defs = [
      def("color", "form", "radio", Some("red")),
      def("color", "form", "radio", Some("blue")),
    ];
    let joined = join_responses(vec![node("color", Some("form"), "blue", false)], &defs, &[]);
    assert_eq!(joined.rows.len(), 1);
    assert_eq!(joined.rows[0].text(RESPONSE_CODE_DISPLAY), Some("blue"));
    assert!(joined.unmatched.is_empty());
  }

  #[test]
  fn multiselect_joins_on_display_text() {
    let defs = [
      def("pets", "form", MULTI_SELECT, Some("cat")),
      def("pets", "form", MULTI_SELECT, Some("dog")),
    ];
    let joined = join_responses(vec![node("pets", Some("form"), "dog", true)], &defs, &[]);
    assert_eq!(joined.rows.len(), 1);
    assert_eq!(joined.rows[0].text(RESPONSE_CODE_DISPLAY), Some("dog"));
  }

  #[test]
  fn multiselect_with_unknown_option_is_unmatched() {
    let defs = [def("pets", "form", MULTI_SELECT, Some("cat"))];
    let joined = join_responses(vec![node("pets", Some("form"), "eel", true)], &defs, &[]);
    assert!(joined.rows.is_empty());
    assert_eq!(joined.unmatched.len(), 1);
  }

  #[test]
  fn free_form_keys_fall_back_to_their_group() {
    let map = row! {
      QUESTION_GROUP_ID => "form.custom",
      "question_group_uri" => "item/7",
      "questionnaire_label" => "Intake",
    };
    let joined = join_responses(
      vec![node("shoe_size", Some("form.custom"), "44", false)],
      &[def("age", "form", "textfield", None)],
      &[map],
    );
    assert_eq!(joined.rows.len(), 1);
    let r = &joined.rows[0];
    assert_eq!(r.text(QUESTION_ID), Some("shoe_size"));
    assert_eq!(r.text("question_group_uri"), Some("item/7"));
  }

  #[test]
  fn root_level_unknowns_are_unmatched() {
    let joined = join_responses(vec![node("stray", None, "x", false)], &[], &[]);
    assert!(joined.rows.is_empty());
    assert_eq!(joined.unmatched.len(), 1);
  }
}
