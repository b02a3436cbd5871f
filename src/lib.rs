//! Followgraph - follow-graph analytics and rate-limited bulk mutation.
//!
//! Reconstructs an account's complete following and followers sets from
//! paginated listings, classifies them into mutuals, non-mutuals and
//! follow-back candidates, and runs bounded follow/unfollow batches that
//! report a per-account outcome instead of a single pass/fail flag.
//!
//! # Architecture
//!
//! - [`domain`] - Platform-agnostic types and the pure classifier
//! - [`port`] - The [`GraphApi`](port::GraphApi) trait the core consumes
//! - [`application`] - Rate governor, set fetcher, bulk executor,
//!   verifier and the [`GraphService`](application::GraphService) facade
//! - [`adapter`] - GitHub REST client and the CLI
//! - [`config`] - TOML configuration with environment credentials
//! - [`error`] - Error taxonomy
//!
//! Every outbound call goes through one shared
//! [`RateGovernor`](application::RateGovernor) per credential.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use followgraph::adapter::outbound::github::GithubClient;
//! use followgraph::application::{CancelSignal, GraphService, RateGovernor};
//! use followgraph::config::Config;
//!
//! # async fn run() -> followgraph::error::Result<()> {
//! let config = Config::load_or_default("config.toml")?;
//! let client = GithubClient::new(&config.github, config.token()?)?;
//! let governor = Arc::new(RateGovernor::new(config.governor.to_settings()));
//! let service = GraphService::new(Arc::new(client), governor, &config);
//!
//! let summary = service.get_account_summary(&CancelSignal::never()).await?;
//! println!("{} mutuals", summary.mutual);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
