#[macro_use]
pub(crate) mod display;

mod commands;
pub mod logger;
pub mod routines;
pub mod settings;

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::display::Message;
use crate::cli::routines::{RoutineFailure, RoutineSuccess, RunContext};
use crate::infrastructure::warehouse::bigquery::BigQueryClient;
use crate::project::Project;
use crate::utilities::constants::{CLI_VERSION, DEFAULT_BASE_DIR, DEFAULT_PARAM_FILE};
use settings::Settings;

#[derive(Parser, Debug)]
#[command(author, version = CLI_VERSION, about, long_about = None, arg_required_else_help(true))]
pub struct Cli {
    /// Directory holding <dataset>/<view>/query.sql
    #[arg(long, global = true, default_value = DEFAULT_BASE_DIR)]
    pub basedir: PathBuf,

    /// JSON file with template parameters
    #[arg(long, global = true, alias = "paramFile", default_value = DEFAULT_PARAM_FILE)]
    pub param_file: PathBuf,

    /// BigQuery project, overrides the configured one
    #[arg(long, global = true, alias = "projectID")]
    pub project_id: Option<String>,

    /// Turn debug logging on
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of views processed at the same time, overrides the configured one
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn project(&self) -> Project {
        Project::new(&self.basedir, &self.param_file)
    }
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no further views will be started");
            token.cancel();
        }
    })
}

pub async fn top_command_handler(
    settings: Settings,
    cli: &Cli,
) -> Result<RoutineSuccess, RoutineFailure> {
    let project = cli.project();

    if let Commands::Query { name } = &cli.command {
        info!("Running query command for {}", name);
        return routines::query::query(&project, name);
    }

    let loaded = routines::load_definitions(&project)?;
    let params = routines::load_parameters(&project)?;

    let bigquery = settings.bigquery.with_project_id(cli.project_id.clone());
    let warehouse = BigQueryClient::new(&bigquery).map_err(|e| {
        RoutineFailure::new(
            Message::new(
                "Config".to_string(),
                "BigQuery connection is not configured".to_string(),
            ),
            e,
        )
    })?;
    info!("Using BigQuery project {}", warehouse.project_id());

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let context = RunContext {
        loaded: &loaded,
        params: &params,
        concurrency: cli.concurrency.unwrap_or(settings.runner.concurrency),
        cancel: &cancel,
    };

    let result = match &cli.command {
        Commands::Plan => {
            info!("Running plan command");
            routines::plan::plan(&warehouse, &context).await
        }
        Commands::Apply { dry_run: true } => {
            info!("Running apply command in dry-run mode");
            routines::apply::dry_run(&warehouse, &context).await
        }
        Commands::Apply { dry_run: false } => {
            info!("Running apply command");
            routines::apply::apply(&warehouse, &context).await
        }
        Commands::Destroy => {
            info!("Running destroy command");
            routines::destroy::destroy(&warehouse, &context).await
        }
        Commands::Query { .. } => Ok(RoutineSuccess::silent()),
    };

    interrupt.abort();
    result
}
