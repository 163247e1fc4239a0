//! `device`: scanners seen across every registered project.

use std::collections::HashSet;

use nexus_etl_core::{
  row,
  source::{ExperimentQuery, SourceSystem},
  store::{Scope, Warehouse},
};

use super::session_types;
use crate::{
  Error, Result,
  context::EtlContext,
  load::{EntitySpec, LoadReport, load_entity},
  lookup::Lookup,
};

const REGISTRY: &str = "xnat_config";
const REGISTRY_ID: &str = "xnat_project_id";

pub const DEVICE: EntitySpec = EntitySpec::keyed("device", "device_uri", &[
  "src_system",
  "device_manufacturer",
  "device_name",
]);

pub const DEVICE_LOOKUP: Lookup<'static> = Lookup {
  parent:  "device",
  on:      &["device_manufacturer", "device_name"],
  columns: &["device_uri"],
};

/// Add `project_id` to the projects the device load scans.
pub async fn register_project<W: Warehouse>(ctx: &EtlContext<W>, project_id: &str) -> Result<()> {
  ctx
    .warehouse
    .replace(
      REGISTRY,
      Scope::all().eq(REGISTRY_ID, project_id),
      vec![row! { REGISTRY_ID => project_id }],
    )
    .await
    .map_err(Error::store)?;
  tracing::info!("registered project {project_id}");
  Ok(())
}

pub async fn load<W: Warehouse, S: SourceSystem>(
  ctx: &EtlContext<W>,
  source: &S,
) -> Result<LoadReport> {
  let projects: Vec<String> = ctx
    .warehouse
    .fetch(REGISTRY, Scope::all())
    .await
    .map_err(Error::store)?
    .iter()
    .filter_map(|r| r.text(REGISTRY_ID).map(str::to_owned))
    .collect();
  let experiment_types = session_types(source, None).await?;

  let mut seen = HashSet::new();
  let mut rows = Vec::new();
  for project_id in &projects {
    for experiment_type in &experiment_types {
      let query = ExperimentQuery {
        project_id: project_id.clone(),
        experiment_type: experiment_type.clone(),
        ..ExperimentQuery::default()
      };
      let scans = source.scans(query).await.map_err(Error::source)?;
      for s in scans {
        let row = row! {
          "src_system" => ctx.src_system.as_str(),
          "device_manufacturer" => s.scanner_manufacturer,
          "device_name" => s.scanner_model,
        };
        if seen.insert(row.key(DEVICE.pk_columns)) {
          rows.push(row);
        }
      }
    }
  }

  let scope = Scope::all().eq("src_system", ctx.src_system.as_str());
  load_entity(ctx, &DEVICE, scope, rows).await
}
