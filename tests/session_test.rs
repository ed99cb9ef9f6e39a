//! Connection arbitration across origins

mod common;

use std::time::Duration;

use common::{MockServer, assert_serialized, origin, overlapped};
use nntp_reader::{EngineConfig, Group, NewsClient, Pipeline, Range};

fn client(server: &MockServer, idle: Option<Duration>) -> NewsClient {
    NewsClient::with_factory(
        server.factory(),
        Pipeline::standard(),
        EngineConfig::default().with_idle_recycle(idle),
    )
}

fn server() -> MockServer {
    MockServer::new()
        .with_group("alt.test", 1, 10, 1..=10)
        .with_latency(Duration::from_millis(100))
}

#[tokio::test(start_paused = true)]
async fn test_same_origin_calls_never_overlap() {
    let server = server();
    let client = client(&server, None);
    let origin = origin("news.example.com");
    let group = Group::new(origin.clone(), "alt.test");
    let latest = Range::latest(5);

    let (groups, overview, article) = tokio::join!(
        client.groups(&origin, false),
        client.overview(&group, &latest),
        client.article(&origin, &group, "<3@alt.test>"),
    );

    assert!(groups.is_ok());
    assert_eq!(overview.value.len(), 5);
    assert_eq!(article.value.unwrap().subject, "Article 3");

    let events = server.events();
    assert_serialized(&events);
    assert_eq!(server.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_origins_run_in_parallel() {
    let server = server();
    let client = client(&server, None);
    let a = origin("a.example.com");
    let b = origin("b.example.com");

    let (ga, gb) = tokio::join!(client.groups(&a, false), client.groups(&b, false));
    assert!(ga.is_ok() && gb.is_ok());

    let events = server.events();
    assert_serialized(&events);
    assert!(overlapped(&events, "a.example.com", "b.example.com"));
    assert_eq!(server.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_credentials_get_their_own_connection() {
    let server = server();
    let client = client(&server, None);
    let anonymous = origin("news.example.com");
    let bob = origin("news.example.com").with_credentials("bob", "secret");

    client.groups(&anonymous, false).await;
    client.groups(&bob, false).await;
    client.groups(&bob, false).await;

    assert_eq!(server.connects(), 2);
    assert_eq!(server.ops("bob@news.example.com"), vec!["connect", "format", "list", "list"]);
}

#[tokio::test(start_paused = true)]
async fn test_first_use_connects_and_reads_format_once() {
    let server = server();
    let client = client(&server, None);
    let origin = origin("news.example.com");

    client.groups(&origin, false).await;
    client.groups(&origin, false).await;

    assert_eq!(
        server.ops("news.example.com"),
        vec!["connect", "format", "list", "list"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_is_reported_and_retried() {
    let server = server();
    let client = client(&server, None);
    let origin = origin("news.example.com");

    server.set_fail_connect(true);
    let groups = client.groups(&origin, false).await;
    assert_eq!(groups.code(), Some("CONNECTION"));
    assert!(groups.value.is_empty());

    server.set_fail_connect(false);
    let groups = client.groups(&origin, false).await;
    assert!(groups.is_ok());
    assert_eq!(groups.value.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_connection_is_recycled() {
    let server = server();
    let client = client(&server, Some(Duration::from_secs(55)));
    let origin = origin("news.example.com");

    client.groups(&origin, false).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(server.disconnects(), 1);

    client.groups(&origin, false).await;
    assert_eq!(server.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_disconnects_everything() {
    let server = server();
    let client = client(&server, None);

    client.groups(&origin("a.example.com"), false).await;
    client.groups(&origin("b.example.com"), false).await;
    client.stop().await;

    assert_eq!(server.disconnects(), 2);
    assert_eq!(client.backend().sessions().live_connections().await, 0);
}
