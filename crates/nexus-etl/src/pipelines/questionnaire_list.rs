//! `questionnaire_list`: the custom forms a project defines, per data type.

use nexus_etl_core::{row, source::SourceSystem, store::Warehouse};

use super::{form_targets, study::STUDY_LOOKUP};
use crate::{
  Error, Result,
  context::{EtlContext, study_scope},
  form,
  load::{EntitySpec, LoadReport, load_entity},
  lookup::Lookup,
};

pub const QUESTIONNAIRE_LIST: EntitySpec =
  EntitySpec::keyed("questionnaire_list", "questionnaire_uri", &[
    "research_study_id",
    "research_study_id_type",
    "questionnaire_name",
    "questionnaire_uuid",
    "xnat_data_type",
    "subject_type",
  ]);

/// Questionnaire attributes copied onto its items.
pub const QUESTIONNAIRE_LOOKUP: Lookup<'static> = Lookup {
  parent:  "questionnaire_list",
  on:      &["research_study_id", "questionnaire_uuid", "xnat_data_type"],
  columns: &["questionnaire_uri", "questionnaire_name", "questionnaire_title", "subject_type"],
};

pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
) -> Result<LoadReport> {
  let mut rows = Vec::new();
  for (data_type, kind) in form_targets(source).await? {
    let Some(doc) = source
      .form_definitions(data_type.clone(), project_id.to_owned())
      .await
      .map_err(Error::source)?
    else {
      continue;
    };

    for f in form::forms(&doc) {
      let Some(uuid) = form::questionnaire_uuid(f) else {
        tracing::warn!("{data_type}: skipping a form without components");
        continue;
      };
      let title = form::text(f.get("title"));
      rows.push(row! {
        "src_system" => ctx.src_system.as_str(),
        "research_study_id" => project_id,
        "questionnaire_uuid" => uuid,
        "questionnaire_name" => title.clone(),
        "questionnaire_title" => title,
        "xnat_data_type" => data_type.as_str(),
        "subject_type" => kind.resource_type(),
      });
    }
  }

  let studies = ctx.fetch("research_study", study_scope(project_id)).await?;
  let rows = ctx.resolve(QUESTIONNAIRE_LIST.table, rows, &studies, &STUDY_LOOKUP)?;
  load_entity(ctx, &QUESTIONNAIRE_LIST, study_scope(project_id), rows).await
}
