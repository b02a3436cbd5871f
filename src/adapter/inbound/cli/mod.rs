//! CLI module graph and command dispatch.

pub mod bulk;
pub mod classify;
pub mod command;
pub mod diagnostic;
pub mod output;
pub mod preview;
pub mod summary;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::adapter::outbound::github::GithubClient;
use crate::application::{CancelSignal, GraphService, RateGovernor};
use crate::config::Config;

use self::command::{Cli, Commands};

/// Load configuration and apply the logging overrides from the command line.
#[allow(clippy::result_large_err)]
pub fn load_config(cli: &Cli) -> crate::error::Result<Config> {
    let mut config = Config::load_or_default(&cli.config)?;
    match (&cli.log_level, cli.verbose) {
        (Some(level), _) => config.logging.level.clone_from(level),
        (None, 0) => {}
        (None, 1) => config.logging.level = "debug".into(),
        (None, _) => config.logging.level = "trace".into(),
    }
    if cli.json_logs {
        config.logging.format = "json".into();
    }
    Ok(config)
}

/// Build the service stack against the real GitHub API.
#[allow(clippy::result_large_err)]
pub fn connect(config: &Config) -> crate::error::Result<GraphService> {
    let token = config.token()?;
    let client = GithubClient::new(&config.github, token)?;
    let governor = Arc::new(RateGovernor::new(config.governor.to_settings()));
    Ok(GraphService::new(Arc::new(client), governor, config))
}

/// Run the parsed command to completion.
pub async fn dispatch(cli: &Cli, config: &Config, cancel: &CancelSignal) -> Result<()> {
    let service = connect(config)?;
    info!(command = ?cli.command, "Running command");

    match &cli.command {
        Commands::Summary => summary::execute(&service, cancel).await,
        Commands::Classify(args) => classify::execute(&service, args.show, cancel).await,
        Commands::Preview(args) => preview::execute(&service, args.limit, args.sort, cancel).await,
        Commands::Unfollow(args) => bulk::unfollow(&service, args, cancel).await,
        Commands::Follow(args) => bulk::follow(&service, args, cancel).await,
    }
}
