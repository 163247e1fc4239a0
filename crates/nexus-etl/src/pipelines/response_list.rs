//! `questionnaire_response_list`: one expected response per (entity,
//! questionnaire) pair, for every kind of entity forms describe.

use nexus_etl_core::{
  row::Row,
  store::{Scope, Warehouse},
};
use strum::IntoEnumIterator;

use super::SubjectKind;
use crate::{
  Result,
  context::{EtlContext, study_scope},
  load::{EntitySpec, LoadReport, load_entity},
};

pub const RESPONSE_LIST: EntitySpec =
  EntitySpec::keyed("questionnaire_response_list", "questionnaire_response_uri", &[
    "research_study_id",
    "research_study_id_type",
    "questionnaire_uuid",
    "response_subject_uri",
  ]);

/// Questionnaire columns repeated on each expected response.
const QUESTIONNAIRE_COLUMNS: &[&str] = &[
  "src_system",
  "research_study_id",
  "research_study_id_type",
  "research_study_uri",
  "research_study_title",
  "questionnaire_uri",
  "questionnaire_uuid",
  "subject_type",
  "xnat_data_type",
];

pub async fn load<W: Warehouse>(ctx: &EtlContext<W>, project_id: &str) -> Result<LoadReport> {
  let questionnaires = ctx.fetch("questionnaire_list", study_scope(project_id)).await?;

  let mut rows = Vec::new();
  for kind in SubjectKind::iter() {
    let entities = ctx
      .fetch(kind.table(), Scope::all().eq("research_study_id", project_id))
      .await?;
    let forms: Vec<&Row> = questionnaires
      .iter()
      .filter(|q| q.text("subject_type") == Some(kind.resource_type()))
      .collect();
    expected_responses(kind, &entities, &forms, &mut rows);
  }

  load_entity(ctx, &RESPONSE_LIST, study_scope(project_id), rows).await
}

/// Pair every entity with every questionnaire of its kind. Sessions only
/// pair with questionnaires of their own session type.
fn expected_responses(kind: SubjectKind, entities: &[Row], forms: &[&Row], out: &mut Vec<Row>) {
  for entity in entities {
    for q in forms {
      if kind == SubjectKind::Session && entity.get("session_type") != q.get("xnat_data_type") {
        continue;
      }
      let mut row = Row::new();
      row.copy_from(q, QUESTIONNAIRE_COLUMNS);
      row.set("questionnaire_label", q.get("questionnaire_name").clone());
      row.set("response_subject_uri", entity.get(kind.uri_column()).clone());
      row.set("response_subject_id", entity.get(kind.id_column()).clone());
      row.set("response_subject_type", kind.resource_type());
      out.push(row);
    }
  }
}

#[cfg(test)]
mod tests {
  use nexus_etl_core::row;

  use super::*;

  #[test]
  fn sessions_pair_with_their_own_type() {
    let sessions = vec![
      row! { "session_id" => "mr1", "session_uri" => "u-mr1", "session_type" => "xnat:mrSessionData" },
      row! { "session_id" => "pet1", "session_uri" => "u-pet1", "session_type" => "xnat:petSessionData" },
    ];
    let mr_form = row! {
      "questionnaire_uuid" => "q-mr",
      "questionnaire_name" => "MR QC",
      "xnat_data_type" => "xnat:mrSessionData",
      "subject_type" => "nidm:Session",
    };
    let mut rows = Vec::new();
    expected_responses(SubjectKind::Session, &sessions, &[&mr_form], &mut rows);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("response_subject_uri"), Some("u-mr1"));
    assert_eq!(rows[0].text("questionnaire_label"), Some("MR QC"));
    assert_eq!(rows[0].text("response_subject_type"), Some("nidm:Session"));
  }

  #[test]
  fn subjects_pair_with_every_form() {
    let subjects = vec![
      row! { "research_subject_id" => "s1", "research_subject_uri" => "u-s1" },
      row! { "research_subject_id" => "s2", "research_subject_uri" => "u-s2" },
    ];
    let a = row! { "questionnaire_uuid" => "a", "subject_type" => "fhir:ResearchSubject" };
    let b = row! { "questionnaire_uuid" => "b", "subject_type" => "fhir:ResearchSubject" };
    let mut rows = Vec::new();
    expected_responses(SubjectKind::Subject, &subjects, &[&a, &b], &mut rows);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3].text("response_subject_id"), Some("s2"));
  }
}
