use std::process::ExitCode;

use clap::Parser;
use followgraph::adapter::inbound::cli::command::Cli;
use followgraph::adapter::inbound::cli::output::{self, OutputConfig};
use followgraph::adapter::inbound::cli::{diagnostic, dispatch, load_config};
use followgraph::application::cancel_pair;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            report_failure(&err.into(), &cli);
            return ExitCode::FAILURE;
        }
    };

    config.init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "followgraph starting");

    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current request");
            cancel_handle.cancel();
        }
    });

    match dispatch(&cli, &config, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err, &cli);
            ExitCode::FAILURE
        }
    }
}

fn report_failure(err: &anyhow::Error, cli: &Cli) {
    if output::is_json() {
        output::error(&format!("{err:#}"));
        return;
    }
    let report = diagnostic::render(err, &cli.config);
    eprintln!("{report:?}");
}
