//! Read-only smoke tests against the live GitHub API.
//!
//! These tests need a real token and network access. They never follow
//! or unfollow anyone.
//!
//! # Running
//!
//! Gated behind the `integration-tests` feature and marked `#[ignore]`:
//!
//! ```bash
//! export GITHUB_TOKEN="ghp_..."
//! cargo test --features integration-tests --test github_live_smoke_tests -- --ignored
//! ```
//!
//! Each run spends a handful of requests from the token's hourly budget.

#![cfg(feature = "integration-tests")]

use std::sync::Arc;

use followgraph::adapter::outbound::github::GithubClient;
use followgraph::application::{CancelSignal, GraphService, RateGovernor};
use followgraph::config::Config;
use followgraph::domain::RelationKind;
use followgraph::port::GraphApi;

fn client() -> Option<(Config, GithubClient)> {
    let config = match Config::load_or_default("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Skipping live test: {e}");
            return None;
        }
    };
    let token = match config.token() {
        Ok(token) => token.to_string(),
        Err(e) => {
            eprintln!("Skipping live test: {e}");
            return None;
        }
    };
    match GithubClient::new(&config.github, &token) {
        Ok(client) => Some((config, client)),
        Err(e) => {
            eprintln!("Skipping live test: {e}");
            None
        }
    }
}

#[tokio::test]
#[ignore = "requires GITHUB_TOKEN and network access"]
async fn first_page_reports_rate_headers() {
    let Some((_, client)) = client() else { return };

    let response = client
        .list_page(RelationKind::Followers, 1, 5)
        .await
        .expect("request should reach GitHub");

    assert!(response.is_success(), "status {}", response.status);
    assert!(response.body.len() <= 5);
    assert!(response.rate.remaining.is_some());
    assert!(response.rate.reset.is_some());
}

#[tokio::test]
#[ignore = "requires GITHUB_TOKEN and network access"]
async fn summary_of_token_owner() {
    let Some((config, client)) = client() else { return };
    let governor = Arc::new(RateGovernor::new(config.governor.to_settings()));
    let service = GraphService::new(Arc::new(client), governor, &config);

    let summary = service
        .get_account_summary(&CancelSignal::never())
        .await
        .expect("summary should succeed with a valid token");

    assert!(summary.handle.is_some());
    assert_eq!(summary.mutual + summary.non_mutual, summary.total_following);
    assert_eq!(summary.mutual + summary.follow_back, summary.total_followers);
    assert!(summary.rate.is_some());
}
