//! Runtime configuration, read from an optional TOML file and the
//! environment.
//!
//! Environment variables use the `NEXUS_ETL_` prefix and `__` between nested
//! keys, e.g. `NEXUS_ETL_WAREHOUSE_PATH` or `NEXUS_ETL_NEXUS__URI_SALT`.

use std::{path::{Path, PathBuf}, time::Duration};

use nexus_etl_xnat::XnatConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
  pub warehouse_path: PathBuf,
  /// Written to every row's `src_system` column.
  #[serde(default = "default_src_system")]
  pub src_system:     String,
  /// Fail, instead of dropping rows, when a parent entity is missing.
  #[serde(default)]
  pub strict_lookups: bool,
  pub nexus:          NexusConfig,
  pub xnat:           XnatSettings,
}

/// Identity settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NexusConfig {
  pub uri_base:           String,
  pub uri_salt:           String,
  #[serde(default = "default_delimiter")]
  pub uri_salt_delimiter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XnatSettings {
  pub server:       String,
  #[serde(default)]
  pub username:     String,
  #[serde(default)]
  pub password:     String,
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
}

fn default_src_system() -> String { "MPG XNAT".to_owned() }

fn default_delimiter() -> String { "|".to_owned() }

fn default_timeout() -> u64 { 300 }

impl EtlConfig {
  /// Layer `NEXUS_ETL_*` variables over the file at `path`, which may be
  /// absent.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("NEXUS_ETL")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }
}

impl XnatSettings {
  pub fn client_config(&self) -> XnatConfig {
    XnatConfig {
      server:   self.server.clone(),
      username: self.username.clone(),
      password: self.password.clone(),
      timeout:  Duration::from_secs(self.timeout_secs),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_values_and_defaults() {
    let path = std::env::temp_dir().join(format!("nexus-etl-config-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      r#"
        warehouse_path = "~/nexus.db"

        [nexus]
        uri_base = "https://nexus.test/"
        uri_salt = "pepper"

        [xnat]
        server = "https://xnat.test"
      "#,
    )
    .unwrap();

    let cfg = EtlConfig::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(cfg.warehouse_path, PathBuf::from("~/nexus.db"));
    assert_eq!(cfg.src_system, "MPG XNAT");
    assert!(!cfg.strict_lookups);
    assert_eq!(cfg.nexus.uri_salt_delimiter, "|");
    assert_eq!(cfg.xnat.client_config().timeout, Duration::from_secs(300));
  }
}
