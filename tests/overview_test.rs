//! Overview pagination against a server with gaps and a moving active range

mod common;

use std::time::Duration;

use common::{MockServer, origin};
use nntp_reader::{Backend, Group, Range};

fn backend(server: &MockServer) -> Backend {
    Backend::with_factory(server.factory(), None)
}

fn numbers(rows: &[nntp_reader::Overview]) -> Vec<u64> {
    rows.iter().filter_map(|o| o.number).collect()
}

fn xovers(server: &MockServer) -> Vec<String> {
    server
        .ops("news.example.com")
        .into_iter()
        .filter(|op| op.starts_with("xover"))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_latest_without_gaps() {
    let server = MockServer::new().with_group("alt.test", 1, 100, 1..=100);
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.test");

    let rows = backend.overview(&group, &Range::latest(10)).await.unwrap();

    assert_eq!(numbers(&rows), (91..=100).collect::<Vec<_>>());
    assert_eq!(xovers(&server), vec!["xover 91-100"]);
    assert_eq!(rows[0].id, "<91@alt.test>");
    assert_eq!(rows[0].subject, "Article 91");
    assert_eq!(rows[0].from.email, "jane@example.com");
}

#[tokio::test(start_paused = true)]
async fn test_latest_extends_backwards_over_gap() {
    let server = MockServer::new().with_group("alt.test", 1, 100, (1..=95).chain([100]));
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.test");

    let rows = backend.overview(&group, &Range::latest(5)).await.unwrap();

    assert_eq!(numbers(&rows), vec![92, 93, 94, 95, 100]);
    assert_eq!(xovers(&server), vec!["xover 96-100", "xover 91-95"]);
}

#[tokio::test(start_paused = true)]
async fn test_forward_slice_extends_and_trims() {
    let server = MockServer::new().with_group("alt.test", 1, 10, [1, 5, 6, 7]);
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.test");

    let rows = backend.overview(&group, &Range::from(1, 3)).await.unwrap();

    assert_eq!(numbers(&rows), vec![1, 5, 6]);
    assert_eq!(xovers(&server), vec!["xover 1-3", "xover 4-6"]);
}

#[tokio::test(start_paused = true)]
async fn test_stops_at_active_boundary() {
    let server = MockServer::new().with_group("alt.test", 5, 12, [11, 12]);
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.test");

    let rows = backend.overview(&group, &Range::latest(4)).await.unwrap();

    assert_eq!(numbers(&rows), vec![11, 12]);
    assert_eq!(xovers(&server), vec!["xover 9-12", "xover 5-8"]);
}

#[tokio::test(start_paused = true)]
async fn test_request_outside_active_range() {
    let server = MockServer::new().with_group("alt.test", 5, 12, 5..=12);
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.test");

    let rows = backend.overview(&group, &Range::from(20, 5)).await.unwrap();
    assert!(rows.is_empty());

    let rows = backend
        .overview(
            &group,
            &Range {
                low: Some(1),
                high: Some(99),
                slice: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(numbers(&rows), (5..=12).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_empty_group_is_not_an_error() {
    let server = MockServer::new().with_group("alt.empty", 5, 4, []);
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.empty");

    let rows = backend.overview(&group, &Range::latest(10)).await.unwrap();

    assert!(rows.is_empty());
    assert!(xovers(&server).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_group() {
    let server = MockServer::new();
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.nowhere");

    let err = backend
        .overview(&group, &Range::latest(10))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NO_SUCH_GROUP");
}

/// The active range is read once per call: expiring articles on the server
/// mid-call does not cut the extension short.
#[tokio::test(start_paused = true)]
async fn test_active_range_is_held_for_the_whole_call() {
    let server = MockServer::new()
        .with_group("alt.test", 1, 20, [1, 2, 3, 20])
        .with_latency(Duration::from_millis(100));
    let backend = backend(&server);
    let group = Group::new(origin("news.example.com"), "alt.test");

    let expire = {
        let server = server.clone();
        tokio::spawn(async move {
            // after GROUP, during the first XOVER
            tokio::time::sleep(Duration::from_millis(350)).await;
            server.set_active("alt.test", 10, 20);
        })
    };

    let rows = backend.overview(&group, &Range::latest(4)).await.unwrap();
    expire.await.unwrap();

    assert_eq!(numbers(&rows), vec![1, 2, 3, 20]);
    let ops = server.ops("news.example.com");
    assert_eq!(ops.iter().filter(|op| *op == "group").count(), 1);
    assert_eq!(
        xovers(&server),
        vec!["xover 17-20", "xover 13-16", "xover 9-12", "xover 5-8", "xover 1-4"]
    );

    // the next call sees the new range
    let rows = backend.overview(&group, &Range::latest(4)).await.unwrap();
    assert_eq!(numbers(&rows), vec![20]);
}
