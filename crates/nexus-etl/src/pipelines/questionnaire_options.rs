//! `questionnaire`: one row per (question, answer option).
//!
//! Questions without options get a single row with null option columns.
//! Only rows of option-bearing question types receive an option URI.

use std::collections::HashMap;

use nexus_etl_core::{
  materialize::UriScope,
  row::{Row, Value},
  source::SourceSystem,
  store::Warehouse,
};

use super::form_targets;
use crate::{
  Error, Result,
  context::{EtlContext, study_scope},
  form,
  load::{EntitySpec, LoadReport, load_entity},
};

const PK: &[&str] = &[
  "research_study_id",
  "research_study_id_type",
  "questionnaire_uuid",
  "group_id",
  "question_id",
  "answer_option_code",
  "subject_type",
  "xnat_data_type",
];

pub const QUESTIONNAIRE_OPTIONS: EntitySpec = EntitySpec {
  table:        "questionnaire",
  uri_column:   "questionnaire_item_answer_option_uri",
  pk_columns:   PK,
  salt_columns: PK,
  generate_uri: true,
  uri_scope:    UriScope::AnswerOptionItems,
};

/// Item attributes repeated on each of its options.
const ITEM_COLUMNS: &[&str] = &[
  "src_system",
  "research_study_id",
  "research_study_id_type",
  "research_study_title",
  "research_study_uri",
  "questionnaire_name",
  "questionnaire_title",
  "questionnaire_uri",
  "questionnaire_uuid",
  "subject_type",
  "xnat_data_type",
  "group_id",
  "group_uri",
  "question_id",
  "question_label",
  "question_type",
  "question_description",
  "questionnaire_item_uri",
  "required_flag",
];

type OptionList = Vec<(Option<String>, Option<String>)>;

pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
) -> Result<LoadReport> {
  let items = ctx
    .fetch("questionnaire_item_list", study_scope(project_id))
    .await?;

  let mut rows = Vec::new();
  for (data_type, _) in form_targets(source).await? {
    let Some(doc) = source
      .form_definitions(data_type.clone(), project_id.to_owned())
      .await
      .map_err(Error::source)?
    else {
      continue;
    };

    for f in form::forms(&doc) {
      let Some(uuid) = form::questionnaire_uuid(f) else {
        continue;
      };
      let options: HashMap<(Option<String>, String), OptionList> = form::walk(f)
        .into_iter()
        .filter_map(|i| Some(((i.group_id.clone(), i.key()?), i.options())))
        .collect();

      let stored = items.iter().filter(|r| {
        r.text("questionnaire_uuid") == Some(uuid.as_str())
          && r.text("xnat_data_type") == Some(data_type.as_str())
      });
      for item in stored {
        option_rows(item, &options, &mut rows);
      }
    }
  }

  load_entity(ctx, &QUESTIONNAIRE_OPTIONS, study_scope(project_id), rows).await
}

fn option_rows(
  item: &Row,
  options: &HashMap<(Option<String>, String), OptionList>,
  out: &mut Vec<Row>,
) {
  let mut base = Row::new();
  base.copy_from(item, ITEM_COLUMNS);

  let key = (
    item.text("group_id").map(str::to_owned),
    item.text("question_id").unwrap_or_default().to_owned(),
  );
  match options.get(&key).filter(|o| !o.is_empty()) {
    Some(list) => {
      for (code, display) in list {
        out.push(
          base
            .clone()
            .with("answer_option_code", code.clone())
            .with("answer_option_display", display.clone()),
        );
      }
    }
    None => out.push(
      base
        .with("answer_option_code", Value::Null)
        .with("answer_option_display", Value::Null),
    ),
  }
}

#[cfg(test)]
mod tests {
  use nexus_etl_core::row;

  use super::*;

  #[test]
  fn one_row_per_option_or_a_single_empty_one() {
    let mut options = HashMap::new();
    options.insert((Some("f".to_owned()), "sex".to_owned()), vec![
      (Some("F".to_owned()), Some("female".to_owned())),
      (Some("M".to_owned()), Some("male".to_owned())),
    ]);

    let sex = row! { "group_id" => "f", "question_id" => "sex", "question_type" => "radio" };
    let age = row! { "group_id" => "f", "question_id" => "age", "question_type" => "number" };
    let mut rows = Vec::new();
    option_rows(&sex, &options, &mut rows);
    option_rows(&age, &options, &mut rows);

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].text("answer_option_code"), Some("M"));
    assert_eq!(rows[1].text("answer_option_display"), Some("male"));
    assert_eq!(rows[2].get("answer_option_code"), &Value::Null);
    assert_eq!(rows[2].text("question_type"), Some("number"));
  }
}
