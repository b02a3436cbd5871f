//! Handler for the `classify` command.

use anyhow::Result;
use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::application::{CancelSignal, GraphService};
use crate::domain::Entity;

pub async fn execute(service: &GraphService, show: usize, cancel: &CancelSignal) -> Result<()> {
    let spinner = output::spinner("Classifying relationships");
    let classification = match service.get_classification(cancel).await {
        Ok(classification) => classification,
        Err(err) => {
            output::spinner_fail(&spinner, "Could not load relationships");
            return Err(err.into());
        }
    };
    output::spinner_success(&spinner, "Relationships classified");

    if output::is_json() {
        output::json_document(
            "classification",
            json!({
                "mutual": handles(&classification.mutual, usize::MAX),
                "non_mutual": handles(&classification.non_mutual, usize::MAX),
                "follow_back": handles(&classification.follow_back, usize::MAX),
            }),
        );
        return Ok(());
    }

    partition("Mutual", &classification.mutual, show);
    partition("Non-mutual", &classification.non_mutual, show);
    partition("Follow-back", &classification.follow_back, show);
    Ok(())
}

fn handles(entities: &[Entity], limit: usize) -> Vec<&str> {
    entities
        .iter()
        .take(limit)
        .map(|e| e.handle().as_str())
        .collect()
}

fn partition(title: &str, entities: &[Entity], show: usize) {
    output::section(&format!("{title} ({})", entities.len()));
    if entities.is_empty() {
        output::note("none");
        return;
    }
    for handle in handles(entities, show) {
        output::field("", handle);
    }
    if entities.len() > show {
        output::note(&format!("... and {} more", entities.len() - show));
    }
}
