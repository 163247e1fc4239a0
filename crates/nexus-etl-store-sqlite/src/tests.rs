//! Integration tests for `SqliteWarehouse` against an in-memory database.

use chrono::NaiveDate;
use nexus_etl_core::{
  coerce::coerce_rows,
  row,
  row::{Row, Value},
  schema::ColumnType,
  store::{Scope, Warehouse},
};

use crate::{Error, SqliteWarehouse, TABLES};

async fn store() -> SqliteWarehouse {
  SqliteWarehouse::open_in_memory()
    .await
    .expect("in-memory warehouse")
}

fn study(id: &str, title: &str) -> Row {
  row! {
    "research_study_id" => id,
    "research_study_id_type" => "xnat_project_id",
    "research_study_title" => title,
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_entity_table_introspects() {
  let s = store().await;
  for &table in TABLES {
    let schema = s.table_schema(table).await.unwrap();
    assert!(schema.contains("_rev"), "{table} lacks _rev");
    assert_eq!(schema.column("_createdat").unwrap().ty, ColumnType::Timestamp);
  }
}

#[tokio::test]
async fn flag_columns_are_boolean() {
  let s = store().await;
  let schema = s.table_schema("questionnaire_item_list").await.unwrap();
  assert_eq!(schema.column("required_flag").unwrap().ty, ColumnType::Boolean);
  assert_eq!(schema.column("_rev").unwrap().ty, ColumnType::Integer);
}

#[tokio::test]
async fn unknown_table_is_an_error() {
  let s = store().await;
  let err = s.table_schema("nope").await.unwrap_err();
  assert!(matches!(err, Error::UnknownTable(ref t) if t == "nope"));
}

#[tokio::test]
async fn reopening_is_idempotent() {
  let dir = std::env::temp_dir().join(format!("nexus-etl-{}.db", std::process::id()));
  SqliteWarehouse::open(&dir).await.unwrap();
  let s = SqliteWarehouse::open(&dir).await.unwrap();
  assert!(s.table_schema("device").await.is_ok());
  let _ = std::fs::remove_file(&dir);
}

// ─── Fetch / replace ─────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_then_fetch_scoped() {
  let s = store().await;
  s.replace("research_study", Scope::all().eq("research_study_id", "p1"), vec![
    study("p1", "One"),
  ])
  .await
  .unwrap();
  s.replace("research_study", Scope::all().eq("research_study_id", "p2"), vec![
    study("p2", "Two"),
  ])
  .await
  .unwrap();

  let p1 = s
    .fetch("research_study", Scope::all().eq("research_study_id", "p1"))
    .await
    .unwrap();
  assert_eq!(p1.len(), 1);
  assert_eq!(p1[0].text("research_study_title"), Some("One"));
  assert_eq!(p1[0].get("research_study_site"), &Value::Null);

  let all = s.fetch("research_study", Scope::all()).await.unwrap();
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn replace_rewrites_only_its_scope() {
  let s = store().await;
  s.replace("research_study", Scope::all(), vec![study("p1", "One"), study("p2", "Two")])
    .await
    .unwrap();
  s.replace("research_study", Scope::all().eq("research_study_id", "p1"), vec![])
    .await
    .unwrap();

  let all = s.fetch("research_study", Scope::all()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].text("research_study_id"), Some("p2"));
}

#[tokio::test]
async fn null_scope_values_match_null() {
  let s = store().await;
  let rows = vec![
    row! { "session_id" => "a", "research_subject_id" => Value::Null },
    row! { "session_id" => "b", "research_subject_id" => "s1" },
  ];
  s.replace("session", Scope::all(), rows).await.unwrap();

  let orphans = s
    .fetch("session", Scope::all().eq("research_subject_id", Value::Null))
    .await
    .unwrap();
  assert_eq!(orphans.len(), 1);
  assert_eq!(orphans[0].text("session_id"), Some("a"));
}

#[tokio::test]
async fn typed_values_survive_through_coercion() {
  let s = store().await;
  let ts = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(7, 8, 9).unwrap();
  let row = row! {
    "question_id" => "q1",
    "required_flag" => true,
    "_createdat" => ts,
    "_rev" => 3,
  };
  s.replace("questionnaire_item_list", Scope::all(), vec![row]).await.unwrap();

  let schema = s.table_schema("questionnaire_item_list").await.unwrap();
  let fetched = s.fetch("questionnaire_item_list", Scope::all()).await.unwrap();
  let fetched = coerce_rows(&schema, fetched).unwrap();

  assert_eq!(fetched[0].get("required_flag"), &Value::Bool(true));
  assert_eq!(fetched[0].get("_createdat"), &Value::Timestamp(ts));
  assert_eq!(fetched[0].get("_rev"), &Value::Int(3));
}

#[tokio::test]
async fn unknown_columns_are_rejected() {
  let s = store().await;
  let err = s
    .fetch("device", Scope::all().eq("colour", "red"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownColumn { ref column, .. } if column == "colour"));

  let err = s
    .replace("device", Scope::all(), vec![row! { "colour" => "red" }])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownColumn { .. }));
}

#[tokio::test]
async fn project_registry_round_trips() {
  let s = store().await;
  let registry = Scope::all().eq("xnat_project_id", "p1");
  s.replace("xnat_config", registry.clone(), vec![row! { "xnat_project_id" => "p1" }])
    .await
    .unwrap();
  s.replace("xnat_config", registry, vec![row! { "xnat_project_id" => "p1" }])
    .await
    .unwrap();
  assert_eq!(s.fetch("xnat_config", Scope::all()).await.unwrap().len(), 1);
}
