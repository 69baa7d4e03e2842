//! oncoexpr — tumour cohort expression analysis.
//! Entry point for the `oncoexpr` binary.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use oncoexpr_common::OncoexprError;
use oncoexpr_runner::cli::Cli;
use oncoexpr_runner::{Config, Dispatcher};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<OncoexprError>() {
                Some(e) => eprintln!("{}: {e}", e.kind()),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "oncoexpr starting");

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let dispatcher = Dispatcher::new(config);
    let outcome = dispatcher.run(cli.into_request()).await;

    if let Some(err) = outcome.error {
        return Err(err.into());
    }
    for path in &outcome.artifacts {
        println!("{}", path.display());
    }
    Ok(())
}
