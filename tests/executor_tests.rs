//! Bulk executor behaviour under partial failure.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use followgraph::application::{cancel_pair, CancelSignal, Candidate, ProgressObserver};
use followgraph::domain::{
    BatchProgress, FailureKind, Handle, MutationKind, OutcomeStatus, SkipReason, StopReason,
};
use followgraph::port::RateSnapshot;
use followgraph::testkit::api::{ScriptedApi, ScriptedReply};
use followgraph::testkit::domain::entities;

use support::scenario::executor;

fn touched(api: &ScriptedApi) -> Vec<Handle> {
    api.mutation_calls().into_iter().map(|(_, h)| h).collect()
}

#[tokio::test(start_paused = true)]
async fn limit_zero_is_a_noop() {
    let api = Arc::new(ScriptedApi::new());

    let report = executor(&api)
        .execute(MutationKind::Unfollow, &entities(1..=5), 0, &CancelSignal::never())
        .await;

    assert_eq!(report.succeeded(), 0);
    assert_eq!(report.skipped(), 0);
    assert_eq!(report.failed(), 0);
    assert!(report.is_noop());
    assert!(api.mutation_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn all_failed_is_not_a_noop() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_mutation_statuses("user1", &[500])
            .with_mutation_statuses("user2", &[502]),
    );

    let report = executor(&api)
        .execute(MutationKind::Unfollow, &entities(1..=2), 2, &CancelSignal::never())
        .await;

    assert_eq!(report.succeeded(), 0);
    assert_eq!(report.failed(), 2);
    assert!(!report.is_noop());
}

#[tokio::test(start_paused = true)]
async fn limit_two_of_three_leaves_the_third_untouched() {
    let api = Arc::new(ScriptedApi::new());

    let report = executor(&api)
        .execute(MutationKind::Unfollow, &entities(1..=3), 2, &CancelSignal::never())
        .await;

    assert_eq!(report.outcomes().len(), 2);
    assert_eq!(report.candidates_available(), 3);
    assert_eq!(touched(&api), vec![Handle::new("user1"), Handle::new("user2")]);
}

#[tokio::test(start_paused = true)]
async fn not_found_is_skipped_and_processing_continues() {
    let api = Arc::new(ScriptedApi::new().with_mutation_statuses("user2", &[404]));

    let report = executor(&api)
        .execute(MutationKind::Unfollow, &entities(1..=3), 3, &CancelSignal::never())
        .await;

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        report.outcomes()[1].status,
        OutcomeStatus::Skipped {
            reason: SkipReason::NotFound
        }
    );
}

#[tokio::test(start_paused = true)]
async fn forbidden_is_recorded_per_candidate() {
    let api = Arc::new(ScriptedApi::new().with_mutation_statuses("user1", &[403]));

    let report = executor(&api)
        .execute(MutationKind::Follow, &entities(1..=2), 2, &CancelSignal::never())
        .await;

    assert!(report.stop().is_none());
    match &report.outcomes()[0].status {
        OutcomeStatus::Failed(detail) => {
            assert_eq!(detail.kind, FailureKind::Auth);
            assert_eq!(detail.status, Some(403));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.outcomes()[1].is_succeeded());
}

#[tokio::test(start_paused = true)]
async fn retry_waits_for_retry_after() {
    let limited = RateSnapshot {
        retry_after: Some(Duration::from_secs(30)),
        ..RateSnapshot::default()
    };
    let api = Arc::new(ScriptedApi::new().with_mutation_replies(
        "user1",
        vec![ScriptedReply::StatusWithRate(429, limited), ScriptedReply::Status(204)],
    ));

    let started = tokio::time::Instant::now();
    let report = executor(&api)
        .execute(MutationKind::Follow, &entities(1..=1), 1, &CancelSignal::never())
        .await;

    assert!(report.outcomes()[0].is_succeeded());
    assert_eq!(report.outcomes()[0].attempts, 2);
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_failure_keeps_retry_hint() {
    let limited = RateSnapshot {
        retry_after: Some(Duration::from_secs(5)),
        ..RateSnapshot::default()
    };
    let api = Arc::new(ScriptedApi::new().with_mutation_replies(
        "user1",
        vec![
            ScriptedReply::StatusWithRate(429, limited),
            ScriptedReply::StatusWithRate(429, limited),
        ],
    ));

    let report = executor(&api)
        .execute(MutationKind::Follow, &entities(1..=1), 1, &CancelSignal::never())
        .await;

    match &report.outcomes()[0].status {
        OutcomeStatus::Failed(detail) => {
            assert_eq!(detail.kind, FailureKind::RateLimited);
            assert_eq!(detail.retry_after_secs, Some(5));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn transport_error_is_transient_failure() {
    let api = Arc::new(ScriptedApi::new().with_mutation_replies(
        "user1",
        vec![ScriptedReply::Transport("connection reset".into())],
    ));

    let report = executor(&api)
        .execute(MutationKind::Unfollow, &entities(1..=2), 2, &CancelSignal::never())
        .await;

    match &report.outcomes()[0].status {
        OutcomeStatus::Failed(detail) => assert_eq!(detail.kind, FailureKind::Transient),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.outcomes()[1].is_succeeded());
}

#[tokio::test(start_paused = true)]
async fn cancellation_preserves_completed_outcomes() {
    let api = Arc::new(ScriptedApi::new());
    let (handle, cancel) = cancel_pair();
    let observer: ProgressObserver = Arc::new(move |progress: &BatchProgress| {
        if progress.position == 2 {
            handle.cancel();
        }
    });
    let candidates: Vec<Candidate> = entities(1..=5).into_iter().map(Candidate::from).collect();

    let report = executor(&api)
        .execute_candidates(MutationKind::Unfollow, &candidates, 5, &cancel, Some(observer))
        .await;

    assert_eq!(report.stop(), Some(StopReason::Cancelled));
    assert_eq!(report.succeeded(), 2);
    assert_eq!(api.mutation_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_retry_wait_keeps_first_attempt() {
    let api = Arc::new(ScriptedApi::new().with_mutation_statuses("user1", &[429]));
    let (handle, cancel) = cancel_pair();
    let exec = executor(&api);

    let run = tokio::spawn(async move {
        exec.execute(MutationKind::Follow, &entities(1..=3), 3, &cancel).await
    });
    // The governor backs off for a minute after a bare 429.
    tokio::time::sleep(Duration::from_secs(10)).await;
    handle.cancel();
    let report = run.await.unwrap();

    assert_eq!(report.stop(), Some(StopReason::Cancelled));
    assert_eq!(report.outcomes().len(), 1);
    assert!(report.outcomes()[0].is_failed());
    assert_eq!(report.outcomes()[0].attempts, 1);
    assert_eq!(api.mutation_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_with_empty_budget_and_no_reset_backs_off() {
    let exhausted = RateSnapshot {
        remaining: Some(0),
        ..RateSnapshot::default()
    };
    let api = Arc::new(ScriptedApi::new().with_mutation_replies(
        "user1",
        vec![
            ScriptedReply::StatusWithRate(429, exhausted),
            ScriptedReply::StatusWithRate(429, exhausted),
        ],
    ));

    let started = tokio::time::Instant::now();
    let report = executor(&api)
        .execute(MutationKind::Follow, &entities(1..=1), 1, &CancelSignal::never())
        .await;

    assert_eq!(report.outcomes()[0].attempts, 2);
    assert!(report.outcomes()[0].is_failed());
    // Default rate_limit_backoff is a minute.
    assert!(started.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn observer_sees_outcome_recorded_on_cancelled_retry() {
    let api = Arc::new(ScriptedApi::new().with_mutation_statuses("user1", &[429]));
    let (handle, cancel) = cancel_pair();
    let seen = Arc::new(AtomicUsize::new(0));
    let observer: ProgressObserver = {
        let seen = seen.clone();
        Arc::new(move |_: &BatchProgress| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };
    let candidates: Vec<Candidate> = entities(1..=3).into_iter().map(Candidate::from).collect();
    let exec = executor(&api);

    let run = tokio::spawn(async move {
        exec.execute_candidates(MutationKind::Follow, &candidates, 3, &cancel, Some(observer))
            .await
    });
    tokio::time::sleep(Duration::from_secs(10)).await;
    handle.cancel();
    let report = run.await.unwrap();

    assert_eq!(report.stop(), Some(StopReason::Cancelled));
    assert_eq!(report.outcomes().len(), 1);
    assert_eq!(seen.load(Ordering::SeqCst), report.outcomes().len());
}

#[tokio::test(start_paused = true)]
async fn unauthorized_stops_and_keeps_prior_work() {
    let api = Arc::new(ScriptedApi::new().with_mutation_statuses("user3", &[401]));

    let report = executor(&api)
        .execute(MutationKind::Unfollow, &entities(1..=5), 5, &CancelSignal::never())
        .await;

    assert_eq!(report.stop(), Some(StopReason::Unauthorized));
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(api.mutation_calls().len(), 3);
}
