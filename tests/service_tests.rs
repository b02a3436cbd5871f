//! End-to-end use cases through `GraphService`.

mod support;

use std::sync::{Arc, Mutex};

use followgraph::application::{
    BatchLimit, BulkRequest, CancelSignal, CandidateSource, ProgressObserver,
};
use followgraph::config::Config;
use followgraph::domain::{BatchProgress, Handle, MutationKind, OutcomeStatus, SkipReason};
use followgraph::testkit::api::ScriptedApi;
use followgraph::testkit::domain::{entities, entity, handles};

use support::scenario::{service, service_with};

#[tokio::test(start_paused = true)]
async fn summary_counts_and_profile() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_following(entities(1..=10))
            .with_followers(entities(6..=25))
            .with_viewer(entity(99, "octo")),
    );

    let summary = service(&api)
        .get_account_summary(&CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.total_following, 10);
    assert_eq!(summary.total_followers, 20);
    assert_eq!(summary.mutual, 5);
    assert_eq!(summary.non_mutual, 5);
    assert_eq!(summary.follow_back, 15);
    assert_eq!(summary.follow_back_ratio, Some(2.0));
    assert_eq!(summary.handle, Some(Handle::new("octo")));
    assert_eq!(api.viewer_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn summary_ratio_is_absent_without_following() {
    let api = Arc::new(ScriptedApi::new().with_followers(entities(1..=3)));

    let summary = service(&api)
        .get_account_summary(&CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.total_following, 0);
    assert_eq!(summary.follow_back_ratio, None);
}

#[tokio::test(start_paused = true)]
async fn configured_username_is_looked_up_directly() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_following(entities(1..=2))
            .with_users(vec![entity(7, "someone")]),
    );
    let mut config = Config::default();
    config.github.username = Some("someone".into());

    let summary = service_with(&api, &config)
        .get_account_summary(&CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(summary.handle, Some(Handle::new("someone")));
    assert_eq!(api.user_calls(), vec![Handle::new("someone")]);
    assert_eq!(api.viewer_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn classification_partitions_both_sets() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_following(entities(1..=4))
            .with_followers(entities(3..=6)),
    );

    let classification = service(&api)
        .get_classification(&CancelSignal::never())
        .await
        .unwrap();

    let ids = |list: &[followgraph::domain::Entity]| -> Vec<u64> {
        list.iter().map(|e| e.id().get()).collect()
    };
    assert_eq!(ids(&classification.mutual), vec![3, 4]);
    assert_eq!(ids(&classification.non_mutual), vec![1, 2]);
    assert_eq!(ids(&classification.follow_back), vec![5, 6]);
}

#[tokio::test(start_paused = true)]
async fn follow_back_respects_limit() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_following(entities(1..=2))
            .with_followers(entities(1..=6)),
    );

    let report = service(&api)
        .run_bulk_operation(
            BulkRequest::new(
                MutationKind::Follow,
                CandidateSource::FollowBack,
                BatchLimit::Count(3),
            ),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.candidates_available(), 4);
    let touched: Vec<Handle> = api.mutation_calls().into_iter().map(|(_, h)| h).collect();
    assert_eq!(touched, handles(&["user3", "user4", "user5"]));
}

#[tokio::test(start_paused = true)]
async fn explicit_handles_resolve_per_candidate() {
    let api = Arc::new(ScriptedApi::new().with_users(vec![entity(11, "alice"), entity(12, "bob")]));
    let source = CandidateSource::Handles(handles(&["alice", "ghost", "bob"]));

    let report = service(&api)
        .run_bulk_operation(
            BulkRequest::new(MutationKind::Follow, source, BatchLimit::All),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(
        report.outcomes()[1].status,
        OutcomeStatus::Skipped {
            reason: SkipReason::NotFound
        }
    );
    let touched: Vec<Handle> = api.mutation_calls().into_iter().map(|(_, h)| h).collect();
    assert_eq!(touched, handles(&["alice", "bob"]));
}

#[tokio::test(start_paused = true)]
async fn already_followed_handles_are_skipped_without_a_call() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_following(vec![entity(11, "alice")])
            .with_users(vec![entity(12, "bob")]),
    );
    let source = CandidateSource::Handles(handles(&["alice", "bob"]));

    let report = service(&api)
        .run_bulk_operation(
            BulkRequest::new(MutationKind::Follow, source, BatchLimit::All),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(
        report.outcomes()[0].status,
        OutcomeStatus::Skipped {
            reason: SkipReason::AlreadyApplied
        }
    );
    assert_eq!(report.outcomes()[0].attempts, 0);
    let touched: Vec<Handle> = api.mutation_calls().into_iter().map(|(_, h)| h).collect();
    assert_eq!(touched, handles(&["bob"]));
}

#[tokio::test(start_paused = true)]
async fn preview_never_mutates() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_following(entities(1..=5))
            .with_followers(entities(5..=5)),
    );

    let preview = service(&api)
        .preview(&CandidateSource::NonMutuals, BatchLimit::Count(2), false, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(preview.len(), 2);
    assert!(api.mutation_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn observer_reports_each_outcome() {
    let api = Arc::new(ScriptedApi::new().with_following(entities(1..=3)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer: ProgressObserver = {
        let seen = seen.clone();
        Arc::new(move |progress: &BatchProgress| {
            seen.lock().unwrap().push((progress.position, progress.total));
        })
    };

    service(&api)
        .run_bulk_operation(
            BulkRequest::new(MutationKind::Unfollow, CandidateSource::NonMutuals, BatchLimit::All)
                .with_observer(observer),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test(start_paused = true)]
async fn verify_waits_for_listing_to_catch_up() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_users(vec![entity(42, "newfriend")])
            .with_following_snapshots(vec![
                Vec::new(),
                Vec::new(),
                vec![entity(42, "newfriend")],
            ]),
    );
    let graph = service(&api);
    let cancel = CancelSignal::never();

    let report = graph
        .run_bulk_operation(
            BulkRequest::new(
                MutationKind::Follow,
                CandidateSource::Handles(handles(&["newfriend"])),
                BatchLimit::All,
            ),
            &cancel,
        )
        .await
        .unwrap();
    let verification = graph.verify(&report, &cancel).await.unwrap();

    assert!(verification.is_complete());
    assert_eq!(verification.attempts, 2);
    assert_eq!(verification.confirmed.len(), 1);
}
