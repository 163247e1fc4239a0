//! `session`: imaging sessions, one row per experiment.

use nexus_etl_core::{
  row,
  source::{ExperimentQuery, SourceSystem},
  store::{Scope, Warehouse},
};
use serde_json::{Map, Value as Json};

use super::{
  session_timestamp, session_types, study::STUDY_LOOKUP, subject::SUBJECT_LOOKUP,
};
use crate::{
  Error, Result,
  context::{EtlContext, XNAT_PROJECT_ID, study_scope},
  load::{EntitySpec, LoadReport, load_entity},
  lookup::Lookup,
};

pub const SESSION: EntitySpec = EntitySpec::keyed("session", "session_uri", &[
  "src_system",
  "research_subject_id",
  "research_study_id",
  "research_study_id_type",
  "accession_id",
]);

pub const SESSION_LOOKUP: Lookup<'static> = Lookup {
  parent:  "session",
  on:      &["research_study_id", "research_subject_id", "session_id"],
  columns: &["session_uri"],
};

/// Narrows a session or acquisition load. Every filter given is passed to
/// the source and limits the rewritten scope.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
  pub subject:         Option<String>,
  pub session:         Option<String>,
  pub experiment_type: Option<String>,
}

impl SessionFilter {
  pub(crate) fn query(&self, project_id: &str, experiment_type: &str) -> ExperimentQuery {
    ExperimentQuery {
      project_id:       project_id.to_owned(),
      experiment_type:  experiment_type.to_owned(),
      subject_label:    self.subject.clone(),
      experiment_label: self.session.clone(),
    }
  }

  pub(crate) fn scope(&self, project_id: &str) -> Scope {
    study_scope(project_id)
      .eq_opt("research_subject_id", self.subject.as_deref())
      .eq_opt("session_id", self.session.as_deref())
      .eq_opt("session_type", self.experiment_type.as_deref())
  }
}

pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
  filter: &SessionFilter,
) -> Result<LoadReport> {
  let mut rows = Vec::new();
  for experiment_type in session_types(source, filter.experiment_type.as_deref()).await? {
    let experiments = source
      .experiments(filter.query(project_id, &experiment_type))
      .await
      .map_err(Error::source)?;

    for e in experiments {
      let custom_fields = e.custom_fields.unwrap_or_else(|| Json::Object(Map::new()));
      rows.push(row! {
        "src_system" => ctx.src_system.as_str(),
        "research_study_id" => project_id,
        "research_study_id_type" => XNAT_PROJECT_ID,
        "research_subject_id" => e.subject_label,
        "session_id" => e.label,
        "accession_id" => e.accession_id,
        "session_type" => experiment_type.as_str(),
        "session_date" => session_timestamp(e.date.as_deref(), e.time.as_deref()),
        "xnat_custom_fields" => custom_fields.to_string(),
      });
    }
  }

  let studies = ctx.fetch("research_study", study_scope(project_id)).await?;
  let rows = ctx.resolve(SESSION.table, rows, &studies, &STUDY_LOOKUP)?;
  let subjects = ctx
    .fetch(
      "research_subject",
      study_scope(project_id).eq_opt("research_subject_id", filter.subject.as_deref()),
    )
    .await?;
  let rows = ctx.resolve(SESSION.table, rows, &subjects, &SUBJECT_LOOKUP)?;

  load_entity(ctx, &SESSION, filter.scope(project_id), rows).await
}
