//! Binary entry point for the `scw-backup` CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use scw_backup::{
    ActivityLog, ApiClient, BackupHelper, BackupPlan, ResourceKind, ResourceRecord, RunReport,
    ScalewayConfig,
};

mod cli;

use cli::{Cli, Command, ListCommand, ListKind, RunCommand};

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("plan error: {0}")]
    Plan(String),
    #[error("client error: {0}")]
    Client(String),
    #[error("listing failed: {0}")]
    List(String),
    #[error("failed to write output: {0}")]
    Output(String),
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Output(value.to_string())
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli.command.unwrap_or_default() {
        Command::Run(args) => run_backups(args).await,
        Command::List(args) => list_resources(args).await,
    }
}

fn load_config() -> Result<ScalewayConfig, CliError> {
    let config =
        ScalewayConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    Ok(config)
}

fn load_plan(explicit: Option<&str>) -> Result<BackupPlan, CliError> {
    let plan = match explicit {
        Some(path) => BackupPlan::load(&Utf8PathBuf::from(path)),
        None => BackupPlan::discover().map(|(path, plan)| {
            tracing::info!(path = %path, "loaded backup plan");
            plan
        }),
    };
    plan.map_err(|err| CliError::Plan(err.to_string()))
}

async fn run_backups(args: RunCommand) -> Result<i32, CliError> {
    let config = load_config()?;
    let plan = load_plan(args.plan.as_deref())?;
    let client =
        ApiClient::from_config(&config).map_err(|err| CliError::Client(err.to_string()))?;

    let helper = BackupHelper::new(client);
    let mut log = ActivityLog::new();
    let report = helper.run(&plan, &mut log).await;

    write_run_output(io::stdout().lock(), &report, &log)?;
    Ok(i32::from(report.has_failures()))
}

async fn list_resources(args: ListCommand) -> Result<i32, CliError> {
    let config = load_config()?;
    let client =
        ApiClient::from_config(&config).map_err(|err| CliError::Client(err.to_string()))?;

    let mut log = ActivityLog::new();
    let listing = client.list(resource_kind(args.kind), &mut log).await;

    let mut stdout = io::stdout().lock();
    if let Ok(records) = &listing {
        write_records(&mut stdout, records)?;
    }
    write_log(&mut stdout, &log)?;
    listing
        .map(|_| 0)
        .map_err(|err| CliError::List(err.to_string()))
}

const fn resource_kind(kind: ListKind) -> ResourceKind {
    match kind {
        ListKind::Servers => ResourceKind::Servers,
        ListKind::Volumes => ResourceKind::Volumes,
        ListKind::Images => ResourceKind::Images,
        ListKind::Snapshots => ResourceKind::Snapshots,
    }
}

fn write_run_output(
    mut target: impl Write,
    report: &RunReport,
    log: &ActivityLog,
) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(report).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(target, "{rendered}")?;
    write_log(&mut target, log)
}

fn write_records(mut target: impl Write, records: &[ResourceRecord]) -> Result<(), CliError> {
    for record in records {
        writeln!(target, "{}\t{}", record.id, record.name)?;
    }
    Ok(())
}

fn write_log(mut target: impl Write, log: &ActivityLog) -> Result<(), CliError> {
    for entry in log.entries() {
        writeln!(target, "{entry}")?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
