//! Async HTTP client for the XNAT REST API.

use std::time::Duration;

use nexus_etl_core::source::{
  ExperimentQuery, ExperimentRecord, ProjectRecord, ScanRecord, SourceSystem, SubjectRecord,
};
use reqwest::{Client, RequestBuilder, StatusCode, Url, header::ACCEPT};
use serde_json::Value as Json;

use crate::{Error, Result, parse};

/// Connection settings for an XNAT server.
#[derive(Debug, Clone)]
pub struct XnatConfig {
  pub server:   String,
  pub username: String,
  pub password: String,
  pub timeout:  Duration,
}

/// Async client for the XNAT JSON API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based. Requests are
/// not retried.
#[derive(Clone)]
pub struct XnatClient {
  client: Client,
  base:   Url,
  config: XnatConfig,
}

impl XnatClient {
  pub fn new(config: XnatConfig) -> Result<Self> {
    let base = Url::parse(&config.server)
      .ok()
      .filter(|url| !url.cannot_be_a_base())
      .ok_or_else(|| Error::InvalidServer(config.server.clone()))?;
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, base, config })
  }

  /// `base` with `segments` appended, each percent-encoded.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// GET `url` as JSON. An empty body decodes to `null`.
  async fn get_json(&self, url: Url, query: &[(String, String)]) -> Result<Json> {
    tracing::debug!("GET {url}");
    let resp = self
      .auth(self.client.get(url.clone()))
      .header(ACCEPT, "application/json")
      .query(&[("format", "json")])
      .query(query)
      .send()
      .await?;

    let status = resp.status();
    let body = resp.text().await?;
    decode_body(&url, status, &body)
  }

  /// Shared search over `/data/experiments` for sessions and scans.
  async fn search(&self, query: &ExperimentQuery, columns: &[String]) -> Result<(Url, Json)> {
    let url = self.endpoint(&["data", "experiments"]);
    let xsi_type = query.experiment_type.as_str();

    let mut params = vec![
      ("project".to_owned(), query.project_id.clone()),
      ("xsiType".to_owned(), xsi_type.to_owned()),
      ("columns".to_owned(), columns.join(",")),
    ];
    if let Some(subject) = &query.subject_label {
      params.push(("xnat:subjectData/label".to_owned(), subject.clone()));
    }
    if let Some(label) = &query.experiment_label {
      params.push((format!("{xsi_type}/label"), label.clone()));
    }

    let doc = self.get_json(url.clone(), &params).await?;
    Ok((url, doc))
  }
}

/// Decode a response body, failing on any non-success status.
fn decode_body(url: &Url, status: StatusCode, body: &str) -> Result<Json> {
  if !status.is_success() {
    return Err(Error::UpstreamFetch {
      url:    url.to_string(),
      status: status.as_u16(),
      body:   body.to_owned(),
    });
  }
  if body.trim().is_empty() {
    return Ok(Json::Null);
  }
  Ok(serde_json::from_str(body)?)
}

fn session_columns(xsi_type: &str) -> Vec<String> {
  let mut columns = vec!["xnat:subjectData/label".to_owned()];
  columns.extend(
    ["LABEL", "DATE", "TIME", "custom_fields"]
      .iter()
      .map(|field| format!("{xsi_type}/{field}")),
  );
  columns
}

fn scan_columns(xsi_type: &str) -> Vec<String> {
  let mut columns: Vec<String> = [
    "xnat:subjectData/label",
    "xnat:imageScanData/ID",
    "xnat:imageScanData/type",
    "xnat:imageScanData/meta/insert_date",
    "xnat:imageScanData/meta/last_modified",
    "xnat:imageScanData/quality",
    "xnat:imageScanData/modality",
    "xnat:imageScanData/scanner/model",
    "xnat:imageScanData/scanner/manufacturer",
    "xnat:imageScanData/series_description",
    "xnat:imageScanData/starttime",
    "xnat:imageScanData/start_date",
  ]
  .iter()
  .map(|c| (*c).to_owned())
  .collect();
  columns.extend(["LABEL", "DATE", "TIME"].iter().map(|field| format!("{xsi_type}/{field}")));
  columns
}

// ─── SourceSystem impl ───────────────────────────────────────────────────────

impl SourceSystem for XnatClient {
  type Error = Error;

  async fn project(&self, project_id: String) -> Result<ProjectRecord> {
    let url = self.endpoint(&["data", "projects", &project_id]);
    let doc = self.get_json(url.clone(), &[]).await?;
    parse::project(url.as_str(), &doc)
  }

  async fn subject_labels(&self, project_id: String) -> Result<Vec<String>> {
    let url = self.endpoint(&["data", "projects", &project_id, "subjects"]);
    let doc = self.get_json(url.clone(), &[]).await?;
    parse::subject_labels(url.as_str(), &doc)
  }

  async fn subject(&self, project_id: String, subject_label: String) -> Result<SubjectRecord> {
    let url = self.endpoint(&["data", "projects", &project_id, "subjects", &subject_label]);
    let doc = self.get_json(url.clone(), &[]).await?;
    parse::subject(url.as_str(), &doc)
  }

  async fn session_data_types(&self) -> Result<Vec<String>> {
    let url = self.endpoint(&["xapi", "schemas", "datatypes"]);
    let doc = self.get_json(url.clone(), &[]).await?;
    parse::session_data_types(url.as_str(), &doc)
  }

  async fn experiments(&self, query: ExperimentQuery) -> Result<Vec<ExperimentRecord>> {
    let columns = session_columns(&query.experiment_type);
    let (url, doc) = self.search(&query, &columns).await?;
    parse::experiments(url.as_str(), &doc, &query.experiment_type)
  }

  async fn scans(&self, query: ExperimentQuery) -> Result<Vec<ScanRecord>> {
    let columns = scan_columns(&query.experiment_type);
    let (url, doc) = self.search(&query, &columns).await?;
    parse::scans(url.as_str(), &doc, &query.experiment_type)
  }

  async fn form_definitions(&self, xsi_type: String, project_id: String) -> Result<Option<Json>> {
    let url = self.endpoint(&["xapi", "customforms", "element"]);
    let params = [
      ("xsiType".to_owned(), xsi_type),
      ("projectId".to_owned(), project_id.clone()),
      ("id".to_owned(), project_id),
      ("appendPrevNextButtons".to_owned(), "false".to_owned()),
    ];
    let doc = self.get_json(url, &params).await?;
    Ok(parse::form_definitions(doc))
  }
}
