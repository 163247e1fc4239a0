//! Error type for the entity pipelines.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("warehouse error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("source error: {0}")]
  Source(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Core(#[from] nexus_etl_core::Error),

  /// A stored custom-field document is not valid JSON.
  #[error("invalid custom-field document: {0}")]
  Json(#[from] serde_json::Error),

  /// Rows whose parent entity is not loaded yet, with strict lookups on.
  #[error("{count} {entity} rows have no matching {parent} row")]
  MissingLookup {
    entity: &'static str,
    parent: &'static str,
    count:  usize,
  },
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn source(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Source(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
