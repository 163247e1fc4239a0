//! The `SourceSystem` trait and the records it yields.
//!
//! Records are flat, typed projections of what the imaging archive reports.
//! Entity pipelines turn them into rows; the custom-field documents stay as
//! raw JSON because their shape is defined per project by form builders.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A project, the source-side counterpart of a research study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
  pub id:            String,
  pub name:          String,
  pub description:   Option<String>,
  pub site:          Option<String>,
  pub active:        Option<String>,
  /// Form answers keyed by form UUID. Empty object when none.
  pub custom_fields: Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
  pub label:         String,
  pub project:       String,
  pub custom_fields: Json,
}

/// One imaging session (an experiment, in archive terms).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
  pub accession_id:  String,
  pub subject_label: String,
  pub label:         String,
  pub xsi_type:      String,
  pub date:          Option<String>,
  pub time:          Option<String>,
  pub custom_fields: Option<Json>,
}

/// One scan of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
  pub accession_id:         String,
  pub subject_label:        String,
  pub session_label:        String,
  pub xsi_type:             String,
  pub session_date:         Option<String>,
  pub session_time:         Option<String>,
  pub scan_id:              String,
  pub scan_type:            Option<String>,
  pub modality:             Option<String>,
  pub insert_date:          Option<String>,
  pub last_modified:        Option<String>,
  pub start_date:           Option<String>,
  pub start_time:           Option<String>,
  pub quality:              Option<String>,
  pub scanner_manufacturer: Option<String>,
  pub scanner_model:        Option<String>,
  pub series_description:   Option<String>,
}

/// Parameters for [`SourceSystem::experiments`] and [`SourceSystem::scans`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentQuery {
  pub project_id:       String,
  /// Session data type, e.g. `xnat:mrSessionData`.
  pub experiment_type:  String,
  pub subject_label:    Option<String>,
  pub experiment_label: Option<String>,
}

/// Abstraction over the upstream imaging archive.
pub trait SourceSystem: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn project(
    &self,
    project_id: String,
  ) -> impl Future<Output = Result<ProjectRecord, Self::Error>> + Send + '_;

  /// Labels of every subject in the project.
  fn subject_labels(
    &self,
    project_id: String,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn subject(
    &self,
    project_id: String,
    subject_label: String,
  ) -> impl Future<Output = Result<SubjectRecord, Self::Error>> + Send + '_;

  /// The session data types the archive defines.
  fn session_data_types(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn experiments(
    &self,
    query: ExperimentQuery,
  ) -> impl Future<Output = Result<Vec<ExperimentRecord>, Self::Error>> + Send + '_;

  fn scans(
    &self,
    query: ExperimentQuery,
  ) -> impl Future<Output = Result<Vec<ScanRecord>, Self::Error>> + Send + '_;

  /// The custom-form definitions attached to `xsi_type` in a project, as one
  /// document whose `components` are the forms. `None` when there are none.
  fn form_definitions(
    &self,
    xsi_type: String,
    project_id: String,
  ) -> impl Future<Output = Result<Option<Json>, Self::Error>> + Send + '_;
}
