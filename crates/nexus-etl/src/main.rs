//! nexus-etl command-line entry point.
//!
//! Reads `nexus-etl.toml` (or the path given with `--config`) layered under
//! `NEXUS_ETL_*` environment variables, opens the SQLite warehouse and runs
//! the requested pipeline against the configured XNAT server.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use nexus_etl::{
  config::EtlConfig,
  context::EtlContext,
  load::LoadReport,
  pipelines::{
    self, SubjectKind, acquisition, device, questionnaire_items, questionnaire_list,
    questionnaire_options, response_list, responses, session, session::SessionFilter, study,
    subject,
  },
};
use nexus_etl_store_sqlite::SqliteWarehouse;
use nexus_etl_xnat::XnatClient;
use strum::IntoEnumIterator;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Load XNAT metadata into the nexus staging warehouse")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "nexus-etl.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the warehouse tables and exit.
  Init,
  /// Add a project to those scanned for devices.
  Register { project: String },
  Study { project: String },
  Subjects {
    project: String,
    #[arg(long)]
    subject: Option<String>,
  },
  Sessions {
    project: String,
    #[command(flatten)]
    filter:  FilterArgs,
  },
  /// Scans of every session, one row each.
  Acquisitions {
    project: String,
    #[command(flatten)]
    filter:  FilterArgs,
  },
  /// Scanners seen across every registered project.
  Devices,
  Questionnaires { project: String },
  QuestionnaireItems { project: String },
  QuestionnaireOptions { project: String },
  ResponseLists { project: String },
  Responses {
    project:      String,
    /// Only answers about this kind of entity; all kinds when omitted.
    #[arg(long)]
    subject_kind: Option<SubjectKind>,
  },
  /// Register the project and run every pipeline for it.
  All { project: String },
}

#[derive(clap::Args)]
struct FilterArgs {
  #[arg(long)]
  subject:         Option<String>,
  #[arg(long)]
  session:         Option<String>,
  /// Session data type, e.g. `xnat:mrSessionData`.
  #[arg(long)]
  experiment_type: Option<String>,
}

impl From<FilterArgs> for SessionFilter {
  fn from(args: FilterArgs) -> Self {
    Self {
      subject:         args.subject,
      session:         args.session,
      experiment_type: args.experiment_type,
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = EtlConfig::load(&cli.config)
    .with_context(|| format!("failed to read configuration from {}", cli.config.display()))?;

  let warehouse_path = expand_tilde(&cfg.warehouse_path);
  let warehouse = SqliteWarehouse::open(&warehouse_path)
    .await
    .with_context(|| format!("failed to open warehouse at {warehouse_path:?}"))?;
  if matches!(cli.command, Command::Init) {
    tracing::info!("warehouse ready at {warehouse_path:?}");
    return Ok(());
  }

  let source = XnatClient::new(cfg.xnat.client_config()).context("failed to build XNAT client")?;
  let ctx = EtlContext::new(warehouse, &cfg);

  let reports = run(&ctx, &source, cli.command).await?;
  let written = reports.iter().filter(|r| r.written).count();
  tracing::info!("done: {written} of {} tables rewritten", reports.len());
  Ok(())
}

async fn run(
  ctx: &EtlContext<SqliteWarehouse>,
  source: &XnatClient,
  command: Command,
) -> anyhow::Result<Vec<LoadReport>> {
  let report = match command {
    Command::Init => return Ok(Vec::new()),
    Command::Register { project } => {
      device::register_project(ctx, &project).await?;
      return Ok(Vec::new());
    }
    Command::Study { project } => study::load(ctx, source, &project).await?,
    Command::Subjects { project, subject } => {
      subject::load(ctx, source, &project, subject.as_deref()).await?
    }
    Command::Sessions { project, filter } => {
      session::load(ctx, source, &project, &filter.into()).await?
    }
    Command::Acquisitions { project, filter } => {
      acquisition::load(ctx, source, &project, &filter.into()).await?
    }
    Command::Devices => device::load(ctx, source).await?,
    Command::Questionnaires { project } => questionnaire_list::load(ctx, source, &project).await?,
    Command::QuestionnaireItems { project } => {
      questionnaire_items::load(ctx, source, &project).await?
    }
    Command::QuestionnaireOptions { project } => {
      questionnaire_options::load(ctx, source, &project).await?
    }
    Command::ResponseLists { project } => response_list::load(ctx, &project).await?,
    Command::Responses { project, subject_kind } => {
      let kinds: Vec<SubjectKind> = match subject_kind {
        Some(kind) => vec![kind],
        None => SubjectKind::iter().collect(),
      };
      let mut reports = Vec::with_capacity(kinds.len());
      for kind in kinds {
        reports.push(responses::load(ctx, &project, kind).await?);
      }
      return Ok(reports);
    }
    Command::All { project } => {
      return pipelines::load_project(ctx, source, &project)
        .await
        .with_context(|| format!("loading project {project}"));
    }
  };
  Ok(vec![report])
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
