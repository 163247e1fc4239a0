//! `questionnaire_response`: every answer given about one kind of entity.
//!
//! Each entity's custom-field document is flattened and joined to the
//! question definitions of its data type. Group and list identities are
//! carried forward from the stored rows before the delta is taken, and
//! container URIs are pointed at again once the new rows have theirs.

use std::collections::HashMap;

use nexus_etl_core::{
  response::{
    QUESTION_GROUP_ID, QUESTION_ID, QUESTION_TYPE, QUESTIONNAIRE_LABEL, RESPONSE_GROUP_URI,
    RESPONSE_INDEX, RESPONSE_ITEM_URI, RESPONSE_LIST_GROUP_URI, RESPONSE_SUBJECT_URI,
    RESPONSE_TEXT, assign_group_uris, assign_list_uris, flatten, join_responses,
  },
  row::{Key, Row, Value},
  store::{Scope, Warehouse},
};
use serde_json::Value as Json;

use super::{PROJECT_DATA, SUBJECT_DATA, SubjectKind};
use crate::{
  Result,
  context::{EtlContext, study_scope},
  load::{EntitySpec, LoadReport, load_entity_with},
  lookup::{Lookup, left_join},
};

pub const RESPONSES: EntitySpec = EntitySpec::keyed("questionnaire_response", RESPONSE_ITEM_URI, &[
  "research_study_id",
  "research_study_id_type",
  QUESTIONNAIRE_LABEL,
  RESPONSE_SUBJECT_URI,
  QUESTION_ID,
  "response_code",
  RESPONSE_GROUP_URI,
  RESPONSE_LIST_GROUP_URI,
  RESPONSE_INDEX,
]);

const RESPONSE_LIST_LOOKUP: Lookup<'static> = Lookup {
  parent:  "questionnaire_response_list",
  on:      &["research_study_id", QUESTIONNAIRE_LABEL, RESPONSE_SUBJECT_URI],
  columns: &["questionnaire_response_uri", "subject_type", "xnat_data_type"],
};

/// `(response column, answer-option column)` pairs every definition carries.
const SHARED_COLUMNS: &[(&str, &str)] = &[
  ("response_code", "answer_option_code"),
  ("response_code_display", "answer_option_display"),
  ("questionnaire_uuid", "questionnaire_uuid"),
  (QUESTIONNAIRE_LABEL, "questionnaire_title"),
  ("questionnaire_uri", "questionnaire_uri"),
  ("research_study_id", "research_study_id"),
  ("research_study_id_type", "research_study_id_type"),
  ("research_study_title", "research_study_title"),
  ("research_study_uri", "research_study_uri"),
  ("src_system", "src_system"),
];

/// Pairs only definitions of known questions carry.
const QUESTION_COLUMNS: &[(&str, &str)] = &[
  (QUESTION_GROUP_ID, "group_id"),
  ("question_group_uri", "group_uri"),
  (QUESTION_ID, "question_id"),
  ("question_label", "question_label"),
  (QUESTION_TYPE, "question_type"),
  ("response_code_uri", "questionnaire_item_answer_option_uri"),
  ("questionnaire_item_uri", "questionnaire_item_uri"),
  ("required_flag", "required_flag"),
];

/// Containers whose keys are chosen by the respondent.
const FREE_FORM_TYPE: &str = "datamap";

/// Answer texts that mean "no answer".
const EMPTY_ANSWERS: &[&str] = &["", "[]", "['']"];

#[derive(Debug, Default)]
struct Definitions {
  questions: Vec<Row>,
  free_form: Vec<Row>,
}

pub async fn load<W: Warehouse>(
  ctx: &EtlContext<W>,
  project_id: &str,
  kind: SubjectKind,
) -> Result<LoadReport> {
  let resource_type = kind.resource_type();
  let options = ctx.fetch("questionnaire", study_scope(project_id)).await?;
  let definitions = definitions_by_type(
    options.iter().filter(|o| o.text("subject_type") == Some(resource_type)),
  );

  let entities = ctx
    .fetch(kind.table(), Scope::all().eq("research_study_id", project_id))
    .await?;

  let mut rows = Vec::new();
  let mut unmatched = 0;
  for entity in &entities {
    let data_type = match kind {
      SubjectKind::Study => Value::from(PROJECT_DATA),
      SubjectKind::Subject => Value::from(SUBJECT_DATA),
      SubjectKind::Session => entity.get("session_type").clone(),
    };
    let Some(defs) = definitions.get(&Key::from_values([&data_type])) else {
      continue;
    };
    let Some(doc) = custom_fields(entity)? else {
      continue;
    };

    let nodes = flatten(&doc, &ctx.uri_base, &ctx.ids);
    let joined = join_responses(nodes, &defs.questions, &defs.free_form);
    unmatched += joined.unmatched.len();
    for mut row in joined.rows {
      row.set(RESPONSE_SUBJECT_URI, entity.get(kind.uri_column()).clone());
      row.set("response_subject_id", entity.get(kind.id_column()).clone());
      rows.push(row);
    }
  }
  if unmatched > 0 {
    tracing::debug!("{resource_type}: skipped {unmatched} answers with no question definition");
  }

  let scope = study_scope(project_id).eq("response_subject_type", resource_type);
  let expected = ctx.fetch("questionnaire_response_list", scope.clone()).await?;
  let mut rows = left_join(rows, &expected, &RESPONSE_LIST_LOOKUP);
  for row in &mut rows {
    clear_empty_answer(row);
    row.set("response_subject_type", resource_type);
  }

  load_entity_with(
    ctx,
    &RESPONSES,
    scope,
    rows,
    |existing, incoming| {
      assign_group_uris(existing, incoming);
      assign_list_uris(existing, incoming)?;
      Ok(())
    },
    |loaded| {
      let prior = loaded.clone();
      assign_group_uris(&prior, loaded);
      Ok(())
    },
  )
  .await
}

/// Question definitions grouped by the data type their form is attached to.
fn definitions_by_type<'a>(options: impl Iterator<Item = &'a Row>) -> HashMap<Key, Definitions> {
  let mut by_type: HashMap<Key, Definitions> = HashMap::new();
  for option in options {
    let defs = by_type.entry(option.key(&["xnat_data_type"])).or_default();
    let mut question = renamed(option, SHARED_COLUMNS);
    for (to, from) in QUESTION_COLUMNS {
      question.set(*to, option.get(from).clone());
    }
    defs.questions.push(question);

    if option.text("question_type") == Some(FREE_FORM_TYPE) {
      let path = match option.text("group_id") {
        Some(group) => format!("{group}.{}", option.get("question_id")),
        None => option.get("question_id").to_string(),
      };
      defs.free_form.push(
        renamed(option, SHARED_COLUMNS)
          .with(QUESTION_GROUP_ID, path)
          .with("question_group_uri", option.get("questionnaire_item_uri").clone()),
      );
    }
  }
  by_type
}

fn renamed(row: &Row, pairs: &[(&str, &str)]) -> Row {
  pairs
    .iter()
    .map(|(to, from)| ((*to).to_owned(), row.get(from).clone()))
    .collect()
}

/// The entity's answer document, or `None` when it has no answers.
fn custom_fields(entity: &Row) -> Result<Option<Json>> {
  let Some(text) = entity.text("xnat_custom_fields").filter(|t| !t.trim().is_empty()) else {
    return Ok(None);
  };
  let doc: Json = serde_json::from_str(text)?;
  Ok(doc.as_object().is_some_and(|o| !o.is_empty()).then_some(doc))
}

fn clear_empty_answer(row: &mut Row) {
  if row.text(RESPONSE_TEXT).is_some_and(|t| EMPTY_ANSWERS.contains(&t)) {
    row.set(RESPONSE_TEXT, Value::Null);
  }
}

#[cfg(test)]
mod tests {
  use nexus_etl_core::row;

  use super::*;

  #[test]
  fn empty_documents_have_no_answers() {
    assert!(custom_fields(&row! { "xnat_custom_fields" => "{}" }).unwrap().is_none());
    assert!(custom_fields(&row! { "xnat_custom_fields" => Value::Null }).unwrap().is_none());
    assert!(custom_fields(&row! { "xnat_custom_fields" => r#"{"f":{}}"# }).unwrap().is_some());
    assert!(custom_fields(&row! { "xnat_custom_fields" => "{not json" }).is_err());
  }

  #[test]
  fn placeholder_answers_are_cleared() {
    for text in ["", "[]", "['']"] {
      let mut row = row! { RESPONSE_TEXT => text };
      clear_empty_answer(&mut row);
      assert_eq!(row.get(RESPONSE_TEXT), &Value::Null);
    }
    let mut row = row! { RESPONSE_TEXT => "0" };
    clear_empty_answer(&mut row);
    assert_eq!(row.text(RESPONSE_TEXT), Some("0"));
  }

  #[test]
  fn datamaps_also_define_free_form_groups() {
    let options = vec![
      row! {
        "xnat_data_type" => "xnat:subjectData",
        "group_id" => "f",
        "question_id" => "extra",
        "question_type" => "datamap",
        "questionnaire_title" => "Intake",
        "questionnaire_item_uri" => "u-extra",
      },
      row! {
        "xnat_data_type" => "xnat:subjectData",
        "group_id" => "f",
        "question_id" => "age",
        "question_type" => "number",
        "questionnaire_title" => "Intake",
      },
    ];
    let defs = definitions_by_type(options.iter());
    let defs = &defs[&Key::from_values([&Value::from("xnat:subjectData")])];

    assert_eq!(defs.questions.len(), 2);
    assert_eq!(defs.questions[1].text(QUESTION_GROUP_ID), Some("f"));
    assert_eq!(defs.questions[1].text(QUESTIONNAIRE_LABEL), Some("Intake"));
    assert_eq!(defs.free_form.len(), 1);
    assert_eq!(defs.free_form[0].text(QUESTION_GROUP_ID), Some("f.extra"));
    assert_eq!(defs.free_form[0].text("question_group_uri"), Some("u-extra"));
  }
}
