//! Service wiring over a `ScriptedApi` for integration tests.

use std::sync::Arc;

use followgraph::application::{
    BulkExecutor, FetchSettings, GovernedApi, GovernorSettings, GraphService, RateGovernor,
    SetFetcher,
};
use followgraph::config::Config;
use followgraph::testkit::api::ScriptedApi;

/// Governor with default spacing; tests run on a paused clock.
pub fn governor() -> Arc<RateGovernor> {
    Arc::new(RateGovernor::new(GovernorSettings::default()))
}

pub fn governed(api: &Arc<ScriptedApi>) -> GovernedApi {
    GovernedApi::new(api.clone(), governor())
}

pub fn fetcher(api: &Arc<ScriptedApi>, per_page: u32) -> SetFetcher {
    SetFetcher::new(
        governed(api),
        FetchSettings {
            per_page,
            max_pages: 1_000,
        },
    )
}

pub fn executor(api: &Arc<ScriptedApi>) -> BulkExecutor {
    BulkExecutor::new(governed(api))
}

pub fn service(api: &Arc<ScriptedApi>) -> GraphService {
    service_with(api, &Config::default())
}

pub fn service_with(api: &Arc<ScriptedApi>, config: &Config) -> GraphService {
    GraphService::new(api.clone(), governor(), config)
}
