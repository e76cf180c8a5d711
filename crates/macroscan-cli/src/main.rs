mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();
    let cli = Cli::parse();

    if let Err(error) = run(&cli).await {
        eprintln!("error: {error}");
        return ExitCode::from(error.exit_code());
    }
    ExitCode::SUCCESS
}

/// Runs the command, writes its envelope to stdout, then decides the exit.
/// The envelope is always written first so partial data is never lost.
async fn run(cli: &Cli) -> Result<(), CliError> {
    let outcome = commands::run(cli).await?;
    output::render(&outcome, cli.format, cli.pretty)?;
    debug!(
        request_id = %outcome.envelope.meta.request_id,
        latency_ms = outcome.envelope.meta.latency_ms,
        "envelope written"
    );
    outcome.verdict(cli.strict)
}
