//! `research_subject`: the subjects enrolled in a project.

use nexus_etl_core::{row, source::SourceSystem, store::Warehouse};

use super::study::STUDY_LOOKUP;
use crate::{
  Error, Result,
  context::{EtlContext, study_scope},
  load::{EntitySpec, LoadReport, load_entity},
  lookup::Lookup,
};

pub const SUBJECT: EntitySpec = EntitySpec::keyed("research_subject", "research_subject_uri", &[
  "src_system",
  "research_subject_id",
  "research_study_id",
  "research_study_id_type",
]);

pub const SUBJECT_LOOKUP: Lookup<'static> = Lookup {
  parent:  "research_subject",
  on:      &["research_study_id", "research_subject_id"],
  columns: &["research_subject_uri"],
};

/// Load every subject of `project_id`, or just `subject` when given.
pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
  subject: Option<&str>,
) -> Result<LoadReport> {
  let labels = match subject {
    Some(label) => vec![label.to_owned()],
    None => source
      .subject_labels(project_id.to_owned())
      .await
      .map_err(Error::source)?,
  };

  let mut rows = Vec::with_capacity(labels.len());
  for label in labels {
    let record = source
      .subject(project_id.to_owned(), label)
      .await
      .map_err(Error::source)?;
    rows.push(row! {
      "src_system" => ctx.src_system.as_str(),
      "research_subject_id" => record.label,
      "research_study_id" => record.project,
      "xnat_custom_fields" => record.custom_fields.to_string(),
    });
  }

  let studies = ctx.fetch("research_study", study_scope(project_id)).await?;
  let rows = ctx.resolve(SUBJECT.table, rows, &studies, &STUDY_LOOKUP)?;

  let scope = study_scope(project_id).eq_opt("research_subject_id", subject);
  load_entity(ctx, &SUBJECT, scope, rows).await
}
