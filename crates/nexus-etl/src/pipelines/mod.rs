//! One module per warehouse entity, each exposing an async `load`.
//!
//! Pipelines read parent entities from the warehouse, so they must run in
//! dependency order: study, subjects, sessions, devices, acquisitions, then
//! the questionnaire entities and finally responses.

pub mod acquisition;
pub mod device;
pub mod questionnaire_items;
pub mod questionnaire_list;
pub mod questionnaire_options;
pub mod response_list;
pub mod responses;
pub mod session;
pub mod study;
pub mod subject;

use nexus_etl_core::{row::Value, source::SourceSystem, store::Warehouse};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use self::session::SessionFilter;
use crate::{Error, Result, context::EtlContext, load::LoadReport};

/// Data type of project-level forms.
pub const PROJECT_DATA: &str = "xnat:projectData";
/// Data type of subject-level forms.
pub const SUBJECT_DATA: &str = "xnat:subjectData";

/// The kind of entity a questionnaire is answered about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SubjectKind {
  Study,
  Subject,
  Session,
}

impl SubjectKind {
  /// Resource type recorded in `subject_type` columns.
  pub fn resource_type(self) -> &'static str {
    match self {
      SubjectKind::Study => "fhir:ResearchStudy",
      SubjectKind::Subject => "fhir:ResearchSubject",
      SubjectKind::Session => "nidm:Session",
    }
  }

  /// Warehouse table holding entities of this kind.
  pub fn table(self) -> &'static str {
    match self {
      SubjectKind::Study => "research_study",
      SubjectKind::Subject => "research_subject",
      SubjectKind::Session => "session",
    }
  }

  pub fn id_column(self) -> &'static str {
    match self {
      SubjectKind::Study => "research_study_id",
      SubjectKind::Subject => "research_subject_id",
      SubjectKind::Session => "session_id",
    }
  }

  pub fn uri_column(self) -> &'static str {
    match self {
      SubjectKind::Study => "research_study_uri",
      SubjectKind::Subject => "research_subject_uri",
      SubjectKind::Session => "session_uri",
    }
  }
}

/// Register `project_id` and run every pipeline for it in dependency order.
pub async fn load_project<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
  project_id: &str,
) -> Result<Vec<LoadReport>> {
  device::register_project(ctx, project_id).await?;
  let everything = SessionFilter::default();

  let mut reports = vec![
    study::load(ctx, source, project_id).await?,
    subject::load(ctx, source, project_id, None).await?,
    session::load(ctx, source, project_id, &everything).await?,
    device::load(ctx, source).await?,
    acquisition::load(ctx, source, project_id, &everything).await?,
    questionnaire_list::load(ctx, source, project_id).await?,
    questionnaire_items::load(ctx, source, project_id).await?,
    questionnaire_options::load(ctx, source, project_id).await?,
    response_list::load(ctx, project_id).await?,
  ];
  for kind in SubjectKind::iter() {
    reports.push(responses::load(ctx, project_id, kind).await?);
  }
  Ok(reports)
}

/// Every data type a form can be attached to, with the kind of entity it
/// describes.
pub(crate) async fn form_targets<S: SourceSystem>(source: &S) -> Result<Vec<(String, SubjectKind)>> {
  let mut targets = vec![
    (PROJECT_DATA.to_owned(), SubjectKind::Study),
    (SUBJECT_DATA.to_owned(), SubjectKind::Subject),
  ];
  let sessions = source.session_data_types().await.map_err(Error::source)?;
  targets.extend(sessions.into_iter().map(|t| (t, SubjectKind::Session)));
  Ok(targets)
}

/// The session data types to extract: the one requested, or all of them.
pub(crate) async fn session_types<S: SourceSystem>(
  source: &S,
  requested: Option<&str>,
) -> Result<Vec<String>> {
  match requested {
    Some(t) => Ok(vec![t.to_owned()]),
    None => source.session_data_types().await.map_err(Error::source),
  }
}

/// Session start as `date time`, or the bare date when no time is recorded.
pub(crate) fn session_timestamp(date: Option<&str>, time: Option<&str>) -> Value {
  match (date, time) {
    (Some(d), Some(t)) => Value::from(format!("{d} {t}")),
    (Some(d), None) => Value::from(d),
    (None, _) => Value::Null,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn subject_kinds_parse_from_lowercase() {
    assert_eq!("session".parse::<SubjectKind>().unwrap(), SubjectKind::Session);
    assert_eq!(SubjectKind::Subject.to_string(), "subject");
    assert!("visit".parse::<SubjectKind>().is_err());
  }

  #[test]
  fn session_timestamps_join_date_and_time() {
    assert_eq!(
      session_timestamp(Some("2024-01-02"), Some("10:11:12")),
      Value::from("2024-01-02 10:11:12")
    );
    assert_eq!(session_timestamp(Some("2024-01-02"), None), Value::from("2024-01-02"));
    assert_eq!(session_timestamp(None, Some("10:11:12")), Value::Null);
  }
}
