//! Handlers for the `unfollow` and `follow` commands.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::{BulkArgs, FollowArgs, UnfollowArgs};
use crate::adapter::inbound::cli::output;
use crate::application::{
    BatchLimit, BulkPlan, BulkRequest, CancelSignal, CandidateSource, GraphService,
    ProgressObserver,
};
use crate::domain::{
    BatchProgress, BatchReport, Handle, MutationKind, MutationOutcome, OutcomeStatus, RateStatus,
    StopReason,
};
use crate::error::{ApiError, Error};

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl OutcomeRow {
    fn new(position: usize, outcome: &MutationOutcome) -> Self {
        let (result, detail) = match &outcome.status {
            OutcomeStatus::Succeeded => (output::positive("succeeded"), String::new()),
            OutcomeStatus::Skipped { reason } => {
                (output::muted("skipped"), format!("{reason:?}"))
            }
            OutcomeStatus::Failed(failure) => {
                let status = failure
                    .status
                    .map(|s| format!("{s} "))
                    .unwrap_or_default();
                (output::negative("failed"), format!("{status}{}", failure.message))
            }
        };
        Self {
            position,
            handle: outcome.handle.to_string(),
            result,
            detail,
        }
    }
}

pub async fn unfollow(
    service: &GraphService,
    args: &UnfollowArgs,
    cancel: &CancelSignal,
) -> Result<()> {
    let limit = if args.all {
        BatchLimit::All
    } else {
        BatchLimit::Count(args.limit.unwrap_or(0))
    };
    let request = BulkRequest::new(MutationKind::Unfollow, CandidateSource::NonMutuals, limit)
        .sorted(args.bulk.sort);
    run(service, request, &args.bulk, cancel).await
}

pub async fn follow(
    service: &GraphService,
    args: &FollowArgs,
    cancel: &CancelSignal,
) -> Result<()> {
    let source = match &args.handles {
        Some(raw) => CandidateSource::Handles(raw.split(',').map(Handle::new).collect()),
        None => CandidateSource::FollowBack,
    };
    let limit = args.limit.map_or(BatchLimit::All, BatchLimit::Count);
    let request = BulkRequest::new(MutationKind::Follow, source, limit).sorted(args.bulk.sort);
    run(service, request, &args.bulk, cancel).await
}

async fn run(
    service: &GraphService,
    request: BulkRequest,
    args: &BulkArgs,
    cancel: &CancelSignal,
) -> Result<()> {
    let operation = request.operation;

    let spinner = output::spinner("Resolving candidates");
    let plan = match service.plan(&request, cancel).await {
        Ok(plan) => plan,
        Err(err) => {
            output::spinner_fail(&spinner, "Could not resolve candidates");
            return Err(err.into());
        }
    };
    output::spinner_success(
        &spinner,
        &format!("{} candidate(s) available", plan.candidates.len()),
    );

    if plan.is_empty() {
        output::note(&format!("Nothing to {operation}."));
    } else if !args.yes && !confirm(&plan)? {
        output::note("Aborted; nothing was changed.");
        return Ok(());
    }

    let progress = output::progress_bar(plan.targets().len());
    let observer: ProgressObserver = {
        let progress = progress.clone();
        Arc::new(move |event: &BatchProgress| {
            progress.set_message(event.outcome.handle.to_string());
            progress.inc(1);
        })
    };
    let report = service.execute_plan(&plan, Some(observer), cancel).await;
    progress.finish_and_clear();

    display(&report, &service.rate_status());

    if let Some(path) = &args.report {
        write_report(&report, path)?;
        output::success(&format!("Report written to {}", path.display()));
    }

    match report.stop() {
        Some(StopReason::Unauthorized) => {
            return Err(Error::Api(ApiError::Auth {
                status: 401,
                message: "token rejected during the batch".into(),
            })
            .into());
        }
        Some(StopReason::Cancelled) => {
            output::warning("Cancelled; the report above covers the work done so far.");
            return Err(Error::Cancelled.into());
        }
        None => {}
    }

    if args.verify && report.succeeded() > 0 {
        verify(service, &report, cancel).await?;
    }
    Ok(())
}

fn confirm(plan: &BulkPlan) -> Result<bool> {
    if output::is_json() || !std::io::stdin().is_terminal() {
        bail!("refusing to {} without --yes in non-interactive mode", plan.operation);
    }

    output::section(&format!("About to {} {} account(s)", plan.operation, plan.targets().len()));
    for candidate in plan.targets().iter().take(10) {
        output::field("", candidate.handle());
    }
    if plan.targets().len() > 10 {
        output::note(&format!("... and {} more", plan.targets().len() - 10));
    }

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Continue?")
        .default(false)
        .interact()
        .map_err(Error::from)?;
    Ok(confirmed)
}

fn display(report: &BatchReport, rate: &RateStatus) {
    if output::is_json() {
        if let Ok(value) = serde_json::to_value(report) {
            output::json_document("batch_report", value);
        }
        return;
    }

    if !report.outcomes().is_empty() {
        let rows: Vec<OutcomeRow> = report
            .outcomes()
            .iter()
            .enumerate()
            .map(|(i, o)| OutcomeRow::new(i + 1, o))
            .collect();
        output::section("Outcomes");
        output::lines(&Table::new(rows).to_string());
    }

    output::section("Summary");
    if report.is_noop() {
        output::note("No candidates were requested.");
    }
    output::field("Succeeded", output::positive(report.succeeded()));
    output::field("Skipped", report.skipped());
    output::field("Failed", output::negative(report.failed()));
    output::field(
        "Attempted",
        format!("{} of {} available", report.attempted(), report.candidates_available()),
    );
    output::field("Rate budget", format!("{}/{}", rate.remaining, rate.limit));
}

fn write_report(report: &BatchReport, path: &Path) -> Result<()> {
    let body = serde_json::to_vec_pretty(report).context("failed to serialize batch report")?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write report to {}", path.display()))
}

async fn verify(service: &GraphService, report: &BatchReport, cancel: &CancelSignal) -> Result<()> {
    let spinner = output::spinner("Confirming changes against the following list");
    let verification = match service.verify(report, cancel).await {
        Ok(verification) => verification,
        Err(err) => {
            output::spinner_fail(&spinner, "Verification did not finish");
            return Err(err.into());
        }
    };

    if output::is_json() {
        spinner.finish_and_clear();
        output::json_document(
            "verification",
            json!({
                "confirmed": verification.confirmed,
                "pending": verification.pending,
                "attempts": verification.attempts,
            }),
        );
        return Ok(());
    }

    if verification.is_complete() {
        output::spinner_success(
            &spinner,
            &format!("All {} change(s) confirmed", verification.confirmed.len()),
        );
    } else {
        output::spinner_fail(
            &spinner,
            &format!(
                "{} confirmed, {} not visible yet",
                verification.confirmed.len(),
                verification.pending.len()
            ),
        );
        output::hint(
            "the following list is cached; pending changes usually show up within minutes",
        );
    }
    Ok(())
}
