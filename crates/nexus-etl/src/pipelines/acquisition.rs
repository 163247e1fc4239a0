//! `acquisition`: the scans of each session.

use nexus_etl_core::{
  row,
  source::SourceSystem,
  store::{Scope, Warehouse},
};

use super::{
  device::DEVICE_LOOKUP,
  session::{SESSION_LOOKUP, SessionFilter},
  session_timestamp, session_types,
  study::STUDY_LOOKUP,
  subject::SUBJECT_LOOKUP,
};
use crate::{
  Error, Result,
  context::{EtlContext, XNAT_PROJECT_ID, study_scope},
  load::{EntitySpec, LoadReport, load_entity},
};

pub const ACQUISITION: EntitySpec = EntitySpec::keyed("acquisition", "acquisition_uri", &[
  "src_system",
  "research_subject_id",
  "research_study_id",
  "research_study_id_type",
  "session_id",
  "acquisition_id",
]);

pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
  filter: &SessionFilter,
) -> Result<LoadReport> {
  let mut rows = Vec::new();
  for experiment_type in session_types(source, filter.experiment_type.as_deref()).await? {
    let scans = source
      .scans(filter.query(project_id, &experiment_type))
      .await
      .map_err(Error::source)?;

    for s in scans {
      let session_date = session_timestamp(s.session_date.as_deref(), s.session_time.as_deref());
      rows.push(row! {
        "src_system" => ctx.src_system.as_str(),
        "research_study_id" => project_id,
        "research_study_id_type" => XNAT_PROJECT_ID,
        "research_subject_id" => s.subject_label,
        "session_id" => s.session_label,
        "session_type" => experiment_type.as_str(),
        "session_date" => session_date,
        "acquisition_id" => s.scan_id,
        "accession_id" => s.accession_id,
        "acquisition_type" => s.scan_type,
        "acquisition_modality" => s.modality,
        "acquisition_insert_date" => s.insert_date,
        "acquisition_last_modified" => s.last_modified,
        "acquisition_start_date" => s.start_date,
        "acquisition_start_time" => s.start_time,
        "acquisition_object_quality" => s.quality,
        "device_manufacturer" => s.scanner_manufacturer,
        "device_name" => s.scanner_model,
        "series_description" => s.series_description,
      });
    }
  }

  let subject_scope = study_scope(project_id).eq_opt("research_subject_id", filter.subject.as_deref());
  let studies = ctx.fetch("research_study", study_scope(project_id)).await?;
  let subjects = ctx.fetch("research_subject", subject_scope.clone()).await?;
  let sessions = ctx
    .fetch("session", subject_scope.eq_opt("session_id", filter.session.as_deref()))
    .await?;
  let devices = ctx
    .fetch("device", Scope::all().eq("src_system", ctx.src_system.as_str()))
    .await?;

  let entity = ACQUISITION.table;
  let rows = ctx.resolve(entity, rows, &studies, &STUDY_LOOKUP)?;
  let rows = ctx.resolve(entity, rows, &subjects, &SUBJECT_LOOKUP)?;
  let rows = ctx.resolve(entity, rows, &sessions, &SESSION_LOOKUP)?;
  let rows = ctx.resolve(entity, rows, &devices, &DEVICE_LOOKUP)?;

  load_entity(ctx, &ACQUISITION, filter.scope(project_id), rows).await
}
