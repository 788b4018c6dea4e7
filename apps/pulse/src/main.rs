//! Pulse entry point: parse arguments, set up logging, dispatch.

use clap::Parser;
use pulse::cli::{self, CliError};
use pulse::config::{Cli, Command, EngineConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "pulse=info,pulse_core=info,tower_http=info";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let engine = EngineConfig::from(&cli.model);
    match cli.command {
        Command::Serve(args) => cli::cmd_serve(&cli.storage, engine, args).await,
        Command::Train { force } => cli::cmd_train(&engine, force).await.map(|_| ()),
        Command::Predict { text, json } => {
            tokio::task::block_in_place(|| cli::cmd_predict(&engine, &text, json)).map(|_| ())
        }
        Command::Status { json } => cli::cmd_status(&cli.storage, &engine, json).map(|_| ()),
    }
}
