//! Handler for the `preview` command (dry run of `unfollow`).

use anyhow::Result;
use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::application::{BatchLimit, CancelSignal, Candidate, CandidateSource, GraphService};

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Id")]
    id: String,
}

impl PreviewRow {
    fn new(position: usize, candidate: &Candidate) -> Self {
        let id = match candidate {
            Candidate::Entity(entity) => entity.id().to_string(),
            Candidate::Handle(_) => "-".into(),
        };
        Self {
            position,
            handle: candidate.handle().to_string(),
            id,
        }
    }
}

pub async fn execute(
    service: &GraphService,
    limit: Option<usize>,
    sort: bool,
    cancel: &CancelSignal,
) -> Result<()> {
    let limit = limit.map_or(BatchLimit::All, BatchLimit::Count);
    let spinner = output::spinner("Computing non-mutuals");
    let candidates = match service
        .preview(&CandidateSource::NonMutuals, limit, sort, cancel)
        .await
    {
        Ok(candidates) => candidates,
        Err(err) => {
            output::spinner_fail(&spinner, "Could not load relationships");
            return Err(err.into());
        }
    };
    output::spinner_success(&spinner, "Relationships loaded");

    if output::is_json() {
        let targets: Vec<_> = candidates
            .iter()
            .map(|c| c.handle().as_str().to_string())
            .collect();
        output::json_document("preview", json!({ "operation": "unfollow", "targets": targets }));
        return Ok(());
    }

    output::section(&format!("Would unfollow {} account(s)", candidates.len()));
    if candidates.is_empty() {
        output::note("Everyone you follow follows you back.");
        return Ok(());
    }

    let rows: Vec<PreviewRow> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| PreviewRow::new(i + 1, c))
        .collect();
    output::lines(&Table::new(rows).to_string());
    output::hint("nothing was changed; run `followgraph unfollow` to apply");
    Ok(())
}
