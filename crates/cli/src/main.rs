#![forbid(unsafe_code)]

//! cm - congregation territory and meeting schedule manager
//!
//! Every command prints one JSON object on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use cm_storage::SqliteStore;
use serde_json::Value;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod args;
mod commands;
mod output;


use args::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let command = cli.command.name();
    match run(cli) {
        Ok(result) => {
            println!("{}", output::ok(command, result));
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(command, error = %format!("{err:#}"), "command failed");
            println!("{}", output::error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Value> {
    let config = cli.service_config();
    tracing::debug!(
        storage_dir = %cli.storage_dir.display(),
        close_policy = config.close_policy.as_str(),
        report_offset = %config.report_offset,
        "resolved configuration"
    );
    let mut store = SqliteStore::open(&cli.storage_dir)
        .with_context(|| format!("open store in {}", cli.storage_dir.display()))?;
    commands::dispatch(cli.command, &mut store, config)
}
