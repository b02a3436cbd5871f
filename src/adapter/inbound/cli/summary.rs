//! Handler for the `summary` command.

use anyhow::Result;

use crate::adapter::inbound::cli::output;
use crate::application::{CancelSignal, GraphService};
use crate::domain::AccountSummary;

pub async fn execute(service: &GraphService, cancel: &CancelSignal) -> Result<()> {
    let spinner = output::spinner("Fetching following and followers");
    let summary = match service.get_account_summary(cancel).await {
        Ok(summary) => summary,
        Err(err) => {
            output::spinner_fail(&spinner, "Could not load relationships");
            return Err(err.into());
        }
    };
    output::spinner_success(&spinner, "Relationships loaded");

    if output::is_json() {
        output::json_document("summary", serde_json::to_value(&summary)?);
        return Ok(());
    }

    display(&summary);
    Ok(())
}

fn display(summary: &AccountSummary) {
    output::header(env!("CARGO_PKG_VERSION"));

    output::section("Account");
    match &summary.handle {
        Some(handle) => output::field("Handle", output::highlight(handle)),
        None => output::field("Handle", output::muted("unknown")),
    }
    if let Some(profile) = &summary.profile {
        if let Some(name) = &profile.name {
            output::field("Name", name);
        }
        if let Some(bio) = &profile.bio {
            output::field("Bio", bio);
        }
        if let Some(repos) = profile.public_repos {
            output::field("Public repos", repos);
        }
    }

    output::section("Relationships");
    output::field("Following", summary.total_following);
    output::field("Followers", summary.total_followers);
    output::field("Mutual", output::positive(summary.mutual));
    output::field("Non-mutual", output::negative(summary.non_mutual));
    output::field("Follow-back", summary.follow_back);
    match summary.follow_back_percent() {
        Some(percent) => output::field("Ratio", format!("{percent:.1}%")),
        None => output::field("Ratio", output::muted("n/a (following nobody)")),
    }

    if let Some(rate) = &summary.rate {
        output::section("Rate limit");
        output::field("Remaining", format!("{}/{}", rate.remaining, rate.limit));
        if let Some(reset) = rate.reset_at {
            output::field("Resets at", reset.format("%H:%M:%S UTC"));
        }
    }
}
