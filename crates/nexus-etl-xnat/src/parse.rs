//! Decoding of XNAT JSON responses into source records.
//!
//! Single resources arrive as `{"items": [{"data_fields": {...}}]}`; searches
//! as `{"ResultSet": {"Result": [{...}]}}` with lower-cased column aliases
//! such as `xnat:mrsessiondata/label`.

use nexus_etl_core::source::{ExperimentRecord, ProjectRecord, ScanRecord, SubjectRecord};
use serde_json::{Map, Value as Json};

use crate::{Error, Result};

type Fields = Map<String, Json>;

/// The one data type every session type specialises; listing it as well would
/// return every session twice.
const GENERIC_SESSION_TYPE: &str = "xnat:imageSessionData";

fn shape(url: &str, detail: impl Into<String>) -> Error {
  Error::UnexpectedShape { url: url.to_owned(), detail: detail.into() }
}

/// `items[0].data_fields` of a single-resource response.
fn data_fields<'a>(url: &str, doc: &'a Json) -> Result<&'a Fields> {
  doc
    .pointer("/items/0/data_fields")
    .and_then(Json::as_object)
    .ok_or_else(|| shape(url, "missing items[0].data_fields"))
}

/// The rows of a search response.
fn result_rows<'a>(url: &str, doc: &'a Json) -> Result<Vec<&'a Fields>> {
  let rows = doc
    .pointer("/ResultSet/Result")
    .and_then(Json::as_array)
    .ok_or_else(|| shape(url, "missing ResultSet.Result"))?;
  rows
    .iter()
    .map(|r| r.as_object().ok_or_else(|| shape(url, "result row is not an object")))
    .collect()
}

/// Field text; empty strings and nulls are absent, scalars render as text.
fn text(fields: &Fields, key: &str) -> Option<String> {
  match fields.get(key)? {
    Json::Null => None,
    Json::String(s) if s.is_empty() => None,
    Json::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

fn required(url: &str, fields: &Fields, key: &str) -> Result<String> {
  text(fields, key).ok_or_else(|| shape(url, format!("missing field {key:?}")))
}

/// Custom-field documents are stored either inline or as a JSON-encoded
/// string. `None` when absent or empty.
fn custom_fields(fields: &Fields, key: &str) -> Result<Option<Json>> {
  match fields.get(key) {
    None | Some(Json::Null) => Ok(None),
    Some(Json::String(s)) if s.trim().is_empty() => Ok(None),
    Some(Json::String(s)) => Ok(Some(serde_json::from_str(s)?)),
    Some(doc) => Ok(Some(doc.clone())),
  }
}

fn empty_object() -> Json { Json::Object(Map::new()) }

pub fn project(url: &str, doc: &Json) -> Result<ProjectRecord> {
  let f = data_fields(url, doc)?;
  Ok(ProjectRecord {
    id:            required(url, f, "ID")?,
    name:          required(url, f, "name")?,
    description:   text(f, "description"),
    site:          text(f, "acquisition_site"),
    active:        text(f, "active"),
    custom_fields: custom_fields(f, "custom_fields")?.unwrap_or_else(empty_object),
  })
}

pub fn subject_labels(url: &str, doc: &Json) -> Result<Vec<String>> {
  result_rows(url, doc)?
    .into_iter()
    .map(|row| required(url, row, "label"))
    .collect()
}

pub fn subject(url: &str, doc: &Json) -> Result<SubjectRecord> {
  let f = data_fields(url, doc)?;
  Ok(SubjectRecord {
    label:         required(url, f, "label")?,
    project:       required(url, f, "project")?,
    custom_fields: custom_fields(f, "custom_fields")?.unwrap_or_else(empty_object),
  })
}

/// Column alias of a data-type field as it appears in search results.
fn alias(xsi_type: &str, field: &str) -> String { format!("{xsi_type}/{field}").to_lowercase() }

pub fn experiments(url: &str, doc: &Json, xsi_type: &str) -> Result<Vec<ExperimentRecord>> {
  result_rows(url, doc)?
    .into_iter()
    .map(|row| {
      Ok(ExperimentRecord {
        accession_id:  required(url, row, "ID")?,
        subject_label: required(url, row, "subject_label")?,
        label:         required(url, row, &alias(xsi_type, "label"))?,
        xsi_type:      xsi_type.to_owned(),
        date:          text(row, &alias(xsi_type, "date")),
        time:          text(row, &alias(xsi_type, "time")),
        custom_fields: custom_fields(row, &alias(xsi_type, "custom_fields"))?,
      })
    })
    .collect()
}

pub fn scans(url: &str, doc: &Json, xsi_type: &str) -> Result<Vec<ScanRecord>> {
  result_rows(url, doc)?
    .into_iter()
    .map(|row| {
      let scan = |field: &str| text(row, &format!("xnat:imagescandata/{field}"));
      Ok(ScanRecord {
        accession_id:         required(url, row, "ID")?,
        subject_label:        required(url, row, "subject_label")?,
        session_label:        required(url, row, &alias(xsi_type, "label"))?,
        xsi_type:             xsi_type.to_owned(),
        session_date:         text(row, &alias(xsi_type, "date")),
        session_time:         text(row, &alias(xsi_type, "time")),
        scan_id:              required(url, row, "xnat:imagescandata/id")?,
        scan_type:            scan("type"),
        modality:             scan("modality"),
        insert_date:          scan("meta/insert_date"),
        last_modified:        scan("meta/last_modified"),
        start_date:           scan("start_date"),
        start_time:           scan("starttime"),
        quality:              scan("quality"),
        scanner_manufacturer: scan("scanner/manufacturer"),
        scanner_model:        scan("scanner/model"),
        series_description:   scan("series_description"),
      })
    })
    .collect()
}

/// Data types whose name mentions `Session`, minus the generic parent type.
pub fn session_data_types(url: &str, doc: &Json) -> Result<Vec<String>> {
  let names = doc
    .as_array()
    .ok_or_else(|| shape(url, "data type list is not an array"))?;
  Ok(
    names
      .iter()
      .filter_map(Json::as_str)
      .filter(|name| name.contains("Session") && *name != GENERIC_SESSION_TYPE)
      .map(str::to_owned)
      .collect(),
  )
}

/// A form document, or `None` when the archive reports nothing attached.
pub fn form_definitions(doc: Json) -> Option<Json> {
  match &doc {
    Json::Object(map) if !map.is_empty() => Some(doc),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  const URL: &str = "https://xnat.test/data";

  #[test]
  fn project_reads_data_fields() {
    let doc = json!({ "items": [{ "data_fields": {
      "ID": "P1",
      "name": "Pilot",
      "description": "",
      "acquisition_site": "MPG",
      "custom_fields": "{\"f1\": {\"age\": 3}}"
    }}]});
    let p = project(URL, &doc).unwrap();
    assert_eq!(p.id, "P1");
    assert_eq!(p.description, None);
    assert_eq!(p.site.as_deref(), Some("MPG"));
    assert_eq!(p.custom_fields, json!({ "f1": { "age": 3 } }));
  }

  #[test]
  fn missing_custom_fields_become_an_empty_object() {
    let doc = json!({ "items": [{ "data_fields": { "label": "S1", "project": "P1" } }] });
    let s = subject(URL, &doc).unwrap();
    assert_eq!(s.custom_fields, json!({}));
  }

  #[test]
  fn missing_items_is_a_shape_error() {
    let err = project(URL, &json!({ "items": [] })).unwrap_err();
    assert!(matches!(err, Error::UnexpectedShape { .. }));
  }

  #[test]
  fn experiments_read_type_aliased_columns() {
    let doc = json!({ "ResultSet": { "Result": [{
      "ID": "XNAT_E001",
      "subject_label": "S1",
      "xnat:mrsessiondata/label": "S1_MR1",
      "xnat:mrsessiondata/date": "2024-01-02",
      "xnat:mrsessiondata/time": "10:11:12",
      "xnat:mrsessiondata/custom_fields": ""
    }]}});
    let rows = experiments(URL, &doc, "xnat:mrSessionData").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].label, "S1_MR1");
    assert_eq!(rows[0].time.as_deref(), Some("10:11:12"));
    assert_eq!(rows[0].custom_fields, None);
  }

  #[test]
  fn scans_read_image_scan_columns() {
    let doc = json!({ "ResultSet": { "Result": [{
      "ID": "XNAT_E001",
      "subject_label": "S1",
      "xnat:mrsessiondata/label": "S1_MR1",
      "xnat:imagescandata/id": "3",
      "xnat:imagescandata/scanner/manufacturer": "SIEMENS",
      "xnat:imagescandata/scanner/model": "Prisma",
      "xnat:imagescandata/starttime": "10:15:00"
    }]}});
    let rows = scans(URL, &doc, "xnat:mrSessionData").unwrap();
    assert_eq!(rows[0].scan_id, "3");
    assert_eq!(rows[0].scanner_model.as_deref(), Some("Prisma"));
    assert_eq!(rows[0].start_time.as_deref(), Some("10:15:00"));
    assert_eq!(rows[0].quality, None);
  }

  #[test]
  fn session_types_drop_the_generic_parent() {
    let doc = json!([
      "xnat:projectData",
      "xnat:mrSessionData",
      "xnat:imageSessionData",
      "xnat:petSessionData"
    ]);
    assert_eq!(session_data_types(URL, &doc).unwrap(), vec![
      "xnat:mrSessionData",
      "xnat:petSessionData"
    ]);
  }

  #[test]
  fn empty_form_documents_are_none() {
    assert_eq!(form_definitions(Json::Null), None);
    assert_eq!(form_definitions(json!({})), None);
    assert!(form_definitions(json!({ "components": [] })).is_some());
  }
}
