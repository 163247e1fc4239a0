//! Error type for `nexus-etl-xnat`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid server URL {0:?}")]
  InvalidServer(String),

  /// The archive answered with a non-success status.
  #[error("GET {url} returned {status}: {body}")]
  UpstreamFetch { url: String, status: u16, body: String },

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),

  /// The response parsed but lacked a field the client relies on.
  #[error("unexpected response from {url}: {detail}")]
  UnexpectedShape { url: String, detail: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
