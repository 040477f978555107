//! Integration tests for the mmlogic service
//!
//! These tests drive the public API end to end over the in-memory store:
//! - Pool resolution across filters, ignorelists and pages
//! - The proposal lifecycle and its side effects
//! - Failure policies for ignorelist reads and the worker counter
//! - The HTTP transport

mod fixtures;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use fixtures::{build_api, seed_index, seed_range, test_config, FlakyStore, StoreOp};
use mmlogic::api::{ApiServer, ApiServerConfig};
use mmlogic::config::{CounterFailurePolicy, IgnoreListFailurePolicy};
use mmlogic::error::ErrorKind;
use mmlogic::metrics::observer::{Notice, ObservedEvent};
use mmlogic::pool::{CollectingSink, FilterOutcome};
use mmlogic::{
    Filter, InMemoryStateStore, MatchObject, Operation, PlayerPool, ProposalResult, Roster,
    StateStore,
};
use std::sync::Arc;
use tower::ServiceExt;

fn proposal(id: &str, players: &[&str]) -> MatchObject {
    MatchObject {
        id: id.to_string(),
        properties: r#"{"mode":"ranked"}"#.to_string(),
        rosters: vec![Roster::from_player_ids(players.iter().copied())],
        ..Default::default()
    }
}

async fn resolve(api: &mmlogic::MmLogicApi, pool: PlayerPool) -> (usize, CollectingSink) {
    let mut sink = CollectingSink::new();
    let pages = api.get_player_pool(pool, &mut sink).await.unwrap();
    (pages, sink)
}

#[tokio::test]
async fn test_pool_intersects_filters_and_carries_attributes() {
    let store = Arc::new(InMemoryStateStore::new());
    seed_index(&store, "mmr", &[("a", 1100), ("b", 1500), ("c", 1900), ("d", 1400)]);
    seed_index(&store, "latency", &[("a", 20), ("b", 90), ("c", 30), ("d", 40)]);
    let (api, observer) = build_api(store, &test_config(10));

    let pool = PlayerPool::new(
        "ranked",
        vec![Filter::new("mmr", 1000, 1600), Filter::new("latency", 0, 50)],
    );
    let (pages, sink) = resolve(&api, pool).await;

    assert_eq!(pages, 1);
    let page = &sink.pages[0];
    let mut ids: Vec<_> = page.players().iter().map(|p| p.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "d"]);

    let a = page.players().iter().find(|p| p.id == "a").unwrap();
    assert_eq!(a.attributes.get("mmr"), Some(&1100));
    assert_eq!(a.attributes.get("latency"), Some(&20));

    assert_eq!(page.filters[0].stats.unwrap().count, 3);
    assert_eq!(page.filters[1].stats.unwrap().count, 3);
    assert_eq!(page.stats.unwrap().count, 2);
    assert_eq!(
        observer.filters(),
        vec![
            ("mmr".to_string(), FilterOutcome::Complete),
            ("latency".to_string(), FilterOutcome::Complete),
        ]
    );
}

#[tokio::test]
async fn test_unbounded_max_includes_top_of_index() {
    let store = Arc::new(InMemoryStateStore::new());
    seed_index(&store, "mmr", &[("low", 100), ("mid", 2000), ("top", i64::MAX - 1)]);
    let (api, _) = build_api(store, &test_config(10));

    let (_, sink) = resolve(&api, PlayerPool::new("open", vec![Filter::new("mmr", 1000, 0)])).await;

    let mut ids: Vec<_> = sink.pages[0].players().iter().map(|p| p.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["mid", "top"]);
}

#[tokio::test]
async fn test_empty_filter_short_circuits_later_filters() {
    let store = Arc::new(FlakyStore::new());
    seed_index(store.inner(), "mmr", &[("a", 10)]);
    seed_index(store.inner(), "latency", &[("a", 5)]);
    let (api, observer) = build_api(store.clone(), &test_config(10));

    let pool = PlayerPool::new(
        "strict",
        vec![
            Filter::new("latency", 0, 10),
            Filter::new("mmr", 5000, 6000),
            Filter::new("region", 1, 1),
        ],
    );
    let (pages, sink) = resolve(&api, pool).await;

    assert_eq!(pages, 1);
    let page = &sink.pages[0];
    assert!(page.players().is_empty());
    assert_eq!(page.filters[1].stats.unwrap().count, 0);
    assert!(page.filters[2].stats.is_none());
    assert_eq!(observer.filters().len(), 2);
    // No ignorelist read once a filter comes back empty
    assert!(!store.calls().contains(&StoreOp::SetMembers));
}

#[tokio::test]
async fn test_pages_are_bounded_and_named() {
    let store = Arc::new(InMemoryStateStore::new());
    seed_range(&store, "mmr", 7, |i| 1000 + i as i64);
    let (api, _) = build_api(store, &test_config(3));

    let (pages, sink) = resolve(&api, PlayerPool::new("all", vec![Filter::new("mmr", 0, 0)])).await;

    assert_eq!(pages, 3);
    assert_eq!(sink.page_sizes(), vec![3, 3, 1]);
    let names: Vec<_> = sink.pages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["all.page1/3", "all.page2/3", "all.page3/3"]);
    for page in &sink.pages {
        assert_eq!(page.filters.len(), 1);
        assert_eq!(page.stats.unwrap().count, 7);
    }
}

#[tokio::test]
async fn test_pagination_fetches_every_player_across_batches() {
    let store = Arc::new(InMemoryStateStore::new());
    // Batch size 4 with 10 players forces three range fetches
    seed_range(&store, "mmr", 10, |i| (i % 3) as i64 + 1);
    let (api, _) = build_api(store, &test_config(100));

    let (_, sink) = resolve(&api, PlayerPool::new("all", vec![Filter::new("mmr", 1, 3)])).await;

    assert_eq!(sink.pages[0].players().len(), 10);
}

#[tokio::test]
async fn test_too_broad_filter_is_disregarded_by_default() {
    let store = Arc::new(InMemoryStateStore::new());
    seed_range(&store, "region", 8, |_| 1);
    seed_index(&store, "mmr", &[("p0001", 1500), ("p0002", 1600)]);
    let mut config = test_config(10);
    config.pool.large_filter_threshold = 3;
    config.pool.filter_ceiling = 5;
    let (api, observer) = build_api(store, &config);

    let pool = PlayerPool::new(
        "broad",
        vec![Filter::new("region", 1, 1), Filter::new("mmr", 1000, 2000)],
    );
    let (_, sink) = resolve(&api, pool).await;

    let page = &sink.pages[0];
    assert_eq!(page.filters[0].stats.unwrap().count, 8);
    assert_eq!(page.players().len(), 2);
    assert_eq!(
        observer.filters()[0],
        ("region".to_string(), FilterOutcome::TooBroad { count: 8 })
    );
}

#[tokio::test]
async fn test_too_broad_filter_fails_when_configured() {
    let store = Arc::new(InMemoryStateStore::new());
    seed_range(&store, "region", 8, |_| 1);
    let mut config = test_config(10);
    config.pool.large_filter_threshold = 3;
    config.pool.filter_ceiling = 5;
    config.pool.fail_on_too_broad = true;
    let (api, observer) = build_api(store, &config);

    let mut sink = CollectingSink::new();
    let err = api
        .get_player_pool(
            PlayerPool::new("broad", vec![Filter::new("region", 1, 1)]),
            &mut sink,
        )
        .await
        .unwrap_err();

    assert_eq!(ErrorKind::of(&err), ErrorKind::FilterTooBroad);
    assert!(sink.pages.is_empty());
    assert!(observer
        .events()
        .contains(&ObservedEvent::Error(Operation::GetPlayerPool, ErrorKind::FilterTooBroad)));
}

#[tokio::test]
async fn test_proposal_lifecycle() {
    let store = Arc::new(InMemoryStateStore::new());
    seed_index(&store, "mmr", &[("a", 1), ("b", 2), ("c", 3), ("d", 4)]);
    store.increment("concurrentMMFs", 2).await.unwrap();
    let (api, _) = build_api(store.clone(), &test_config(10));

    let report = api.create_proposal(&proposal("match-1", &["a", "b"])).await.unwrap();
    assert_eq!(report.players_ignored, 2);
    assert!(report.enqueued);
    assert_eq!(report.workers_remaining, Some(1));

    // Proposed players drop out of later pools
    let (_, sink) = resolve(&api, PlayerPool::new("next", vec![Filter::new("mmr", 0, 0)])).await;
    let mut ids: Vec<_> = sink.pages[0].players().iter().map(|p| p.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["c", "d"]);

    assert_eq!(store.set_members("proposalq").await.unwrap(), vec!["match-1"]);
    assert_eq!(
        api.get_profile("match-1").await.unwrap(),
        proposal("match-1", &["a", "b"])
    );
}

#[tokio::test]
async fn test_append_to_ignorelist_is_idempotent() {
    let store = Arc::new(InMemoryStateStore::new());
    let (api, _) = build_api(store, &test_config(10));

    let first = api.create_proposal(&proposal("m1", &["a", "b"])).await.unwrap();
    let second = api.create_proposal(&proposal("m2", &["b", "a"])).await.unwrap();

    assert_eq!(first.players_ignored, 2);
    assert_eq!(second.players_ignored, 0);
    assert_eq!(api.list_ignored_players().await.unwrap().players.len(), 2);
}

#[tokio::test]
async fn test_error_report_decrements_counter_only() {
    let store = Arc::new(FlakyStore::new());
    let (api, _) = build_api(store.clone(), &test_config(10));

    let report = MatchObject {
        id: "mmf-failed".to_string(),
        error: "not enough players".to_string(),
        ..Default::default()
    };
    let outcome = api.create_proposal(&report).await.unwrap();

    assert!(!outcome.enqueued);
    assert_eq!(outcome.workers_remaining, Some(-1));
    assert_eq!(store.calls(), vec![StoreOp::Put, StoreOp::Decrement]);
    assert!(api.list_ignored_players().await.unwrap().players.is_empty());
}

#[tokio::test]
async fn test_counter_decremented_once_per_proposal() {
    let store = Arc::new(FlakyStore::new());
    let (api, _) = build_api(store.clone(), &test_config(10));

    api.create_proposal(&proposal("m1", &["a"])).await.unwrap();
    api.create_proposal(&MatchObject {
        id: "m2".to_string(),
        error: "timeout".to_string(),
        ..Default::default()
    })
    .await
    .unwrap();

    assert_eq!(store.decrement_count(), 2);
    assert_eq!(
        store.calls(),
        vec![
            StoreOp::Put,
            StoreOp::SetAdd,
            StoreOp::SetAdd,
            StoreOp::Decrement,
            StoreOp::Put,
            StoreOp::Decrement,
        ]
    );
}

#[tokio::test]
async fn test_ignorelist_failure_degrades_by_default() {
    let store = Arc::new(FlakyStore::new());
    seed_index(store.inner(), "mmr", &[("a", 1), ("b", 2)]);
    store.inner().set_add("proposed", &["a".to_string()]).await.unwrap();
    store.fail(StoreOp::SetMembers);
    let (api, observer) = build_api(store, &test_config(10));

    let (_, sink) = resolve(&api, PlayerPool::new("p", vec![Filter::new("mmr", 0, 0)])).await;

    // Exclusions are skipped, so the proposed player comes back
    assert_eq!(sink.pages[0].players().len(), 2);
    assert!(matches!(
        observer.notices().as_slice(),
        [Notice::IgnoreListsUnavailable { pool, .. }] if pool == "p"
    ));
}

#[tokio::test]
async fn test_ignorelist_failure_aborts_when_configured() {
    let store = Arc::new(FlakyStore::new());
    seed_index(store.inner(), "mmr", &[("a", 1)]);
    store.fail(StoreOp::SetMembers);
    let mut config = test_config(10);
    config.pool.ignore_list_failure = IgnoreListFailurePolicy::Abort;
    let (api, _) = build_api(store, &config);

    let mut sink = CollectingSink::new();
    let err = api
        .get_player_pool(PlayerPool::new("p", vec![Filter::new("mmr", 0, 0)]), &mut sink)
        .await
        .unwrap_err();

    assert_eq!(ErrorKind::of(&err), ErrorKind::Storage);
    assert!(sink.pages.is_empty());
}

#[tokio::test]
async fn test_counter_failure_surfaces_by_default() {
    let store = Arc::new(FlakyStore::new());
    store.fail(StoreOp::Decrement);
    let (api, _) = build_api(store.clone(), &test_config(10));

    let outcome = api.create_proposal(&proposal("m1", &["a"])).await;

    let result = mmlogic::api::proposal_result(&outcome);
    assert!(!result.success);
    // Everything before the decrement still happened
    assert_eq!(store.inner().set_members("proposalq").await.unwrap(), vec!["m1"]);
}

#[tokio::test]
async fn test_counter_failure_tolerated_when_configured() {
    let store = Arc::new(FlakyStore::new());
    store.fail(StoreOp::Decrement);
    let mut config = test_config(10);
    config.proposals.counter_failure = CounterFailurePolicy::Tolerate;
    let (api, observer) = build_api(store, &config);

    let report = api.create_proposal(&proposal("m1", &["a"])).await.unwrap();

    assert_eq!(report.workers_remaining, None);
    assert!(matches!(
        observer.notices().as_slice(),
        [Notice::WorkerCounterNotDecremented { proposal_id, .. }] if proposal_id == "m1"
    ));
}

#[tokio::test]
async fn test_transport_failure_stops_streaming() {
    let store = Arc::new(InMemoryStateStore::new());
    seed_range(&store, "mmr", 7, |i| i as i64 + 1);
    let (api, observer) = build_api(store, &test_config(3));

    let mut sink = CollectingSink::failing_after(1);
    let err = api
        .get_player_pool(PlayerPool::new("all", vec![Filter::new("mmr", 0, 0)]), &mut sink)
        .await
        .unwrap_err();

    assert_eq!(ErrorKind::of(&err), ErrorKind::TransportSend);
    assert_eq!(sink.pages.len(), 1);
    assert!(observer
        .events()
        .contains(&ObservedEvent::Error(Operation::GetPlayerPool, ErrorKind::TransportSend)));
}

fn http_app(store: Arc<dyn StateStore>) -> axum::Router {
    let (api, _) = build_api(store, &test_config(2));
    ApiServer::new(ApiServerConfig::default(), Arc::new(api)).router()
}

async fn read_body(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_http_proposal_failure_returns_result_body() {
    let store = Arc::new(FlakyStore::new());
    store.fail(StoreOp::Put);
    let app = http_app(store);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/proposals")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&proposal("m1", &["a"])).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let result: ProposalResult = serde_json::from_slice(&read_body(response).await).unwrap();
    assert!(!result.success);
    assert!(result.error.contains("injected failure"));
}

#[tokio::test]
async fn test_http_pool_error_before_first_page() {
    let store = Arc::new(FlakyStore::new());
    store.fail(StoreOp::CountInRange);
    let app = http_app(store);

    let pool = PlayerPool::new("p", vec![Filter::new("mmr", 0, 0)]);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/pools")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&pool).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["kind"], "storage");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_http_profile_roundtrip() {
    let store = Arc::new(InMemoryStateStore::new());
    let stored = proposal("profile-1", &["x"]);
    store
        .put("profile-1", serde_json::to_string(&stored).unwrap())
        .await
        .unwrap();
    let app = http_app(store);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/profiles/profile-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let profile: MatchObject = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(profile, stored);
}
