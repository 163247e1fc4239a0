//! `research_study`: one row per archive project.

use nexus_etl_core::{row, source::SourceSystem, store::Warehouse};

use crate::{
  Error, Result,
  context::{EtlContext, XNAT_PROJECT_ID, study_scope},
  load::{EntitySpec, LoadReport, load_entity},
  lookup::Lookup,
};

pub const STUDY: EntitySpec = EntitySpec::keyed("research_study", "research_study_uri", &[
  "research_study_id",
  "research_study_id_type",
]);

/// Study attributes copied onto every child entity.
pub const STUDY_LOOKUP: Lookup<'static> = Lookup {
  parent:  "research_study",
  on:      &["research_study_id"],
  columns: &["research_study_uri", "research_study_title", "research_study_id_type"],
};

pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
) -> Result<LoadReport> {
  let project = source
    .project(project_id.to_owned())
    .await
    .map_err(Error::source)?;

  let row = row! {
    "src_system" => ctx.src_system.as_str(),
    "research_study_id" => project.id,
    "research_study_id_type" => XNAT_PROJECT_ID,
    "research_study_title" => project.name,
    "research_study_description" => project.description,
    "research_study_site" => project.site,
    "research_study_status" => project.active,
    "xnat_custom_fields" => project.custom_fields.to_string(),
  };
  load_entity(ctx, &STUDY, study_scope(project_id), vec![row]).await
}
