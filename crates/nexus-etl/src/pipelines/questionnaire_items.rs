//! `questionnaire_item_list`: every question of every form.

use std::collections::HashMap;

use nexus_etl_core::{
  row,
  row::{Key, Row, Value},
  source::SourceSystem,
  store::Warehouse,
};
use serde_json::{Map, Value as Json};

use super::{form_targets, questionnaire_list::QUESTIONNAIRE_LOOKUP, study::STUDY_LOOKUP};
use crate::{
  Error, Result,
  context::{EtlContext, study_scope},
  form::{self, FormItem},
  load::{EntitySpec, LoadReport, load_entity_with},
};

pub const QUESTIONNAIRE_ITEMS: EntitySpec =
  EntitySpec::keyed("questionnaire_item_list", "questionnaire_item_uri", &[
    "research_study_id",
    "research_study_id_type",
    "questionnaire_name",
    "group_id",
    "question_id",
    "subject_type",
    "xnat_data_type",
  ]);

/// Question types whose items group other items.
const GROUP_TYPES: &[&str] = &["container", "tree", "datamap", "datagrid", "editgrid"];

pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
) -> Result<LoadReport> {
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
      for item in form::walk(f) {
        let Some(key) = item.key() else { continue };
        rows.push(
          item_row(&item, key)
            .with("src_system", ctx.src_system.as_str())
            .with("research_study_id", project_id)
            .with("questionnaire_uuid", uuid.as_str())
            .with("xnat_data_type", data_type.as_str()),
        );
      }
    }
  }

  let entity = QUESTIONNAIRE_ITEMS.table;
  let studies = ctx.fetch("research_study", study_scope(project_id)).await?;
  let questionnaires = ctx.fetch("questionnaire_list", study_scope(project_id)).await?;
  let rows = ctx.resolve(entity, rows, &studies, &STUDY_LOOKUP)?;
  let rows = ctx.resolve(entity, rows, &questionnaires, &QUESTIONNAIRE_LOOKUP)?;

  load_entity_with(
    ctx,
    &QUESTIONNAIRE_ITEMS,
    study_scope(project_id),
    rows,
    |existing, incoming| {
      link_group_uris(existing, incoming);
      Ok(())
    },
    |loaded| {
      let containers = loaded.clone();
      link_group_uris(&containers, loaded);
      Ok(())
    },
  )
  .await
}

fn item_row(item: &FormItem<'_>, key: String) -> Row {
  let validate = item
    .item
    .get("validate")
    .cloned()
    .unwrap_or_else(|| Json::Object(Map::new()));
  let required = validate.get("required").and_then(Json::as_bool).unwrap_or(false);
  let repeats = item.item.get("multiple").and_then(Json::as_bool).unwrap_or(false);

  let condition = item.item.get("conditional");
  let when = form::text(condition.and_then(|c| c.get("when")));
  let operator = when.as_ref().map(|_| "eq");

  row! {
    "group_id" => item.group_id.clone(),
    "question_id" => key,
    "question_label" => item.field("label"),
    "question_description" => item.field("description"),
    "question_type" => item.field("type"),
    "required_flag" => required,
    "enable_when_question" => when,
    "enable_when_operator" => operator,
    "enable_when_answer" => form::text(condition.and_then(|c| c.get("eq"))),
    "validate" => validate.to_string(),
    "repeats_flag" => repeats,
  }
}

/// Point each item's `group_uri` at the item URI of the container it sits
/// in, as found among `containers`.
fn link_group_uris(containers: &[Row], rows: &mut [Row]) {
  let mut uris: HashMap<Key, Value> = HashMap::new();
  for c in containers {
    if !c.text("question_type").is_some_and(|t| GROUP_TYPES.contains(&t)) {
      continue;
    }
    let path = match c.text("group_id") {
      Some(group) => format!("{group}.{}", c.get("question_id")),
      None => c.get("question_id").to_string(),
    };
    let key = Key::from_values(&[
      c.get("questionnaire_uuid").clone(),
      c.get("xnat_data_type").clone(),
      Value::from(path),
    ]);
    uris.entry(key).or_insert_with(|| c.get("questionnaire_item_uri").clone());
  }

  for row in rows {
    let key = row.key(&["questionnaire_uuid", "xnat_data_type", "group_id"]);
    row.set("group_uri", uris.get(&key).cloned().unwrap_or_default());
  }
}
