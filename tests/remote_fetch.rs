//! Snapshot fetch against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use appconfig_sync::error::FetchError;
use appconfig_sync::lifecycle::Shutdown;
use appconfig_sync::remote::{ContextKey, Endpoints, RemoteConfigFetcher, StaticTokenAuthenticator};
use appconfig_sync::resilience::{Backoff, RetryPolicy};
use url::Url;

mod common;

fn fetcher(addr: std::net::SocketAddr, max_attempts: u32) -> RemoteConfigFetcher {
    let endpoints = Endpoints::custom(
        Url::parse(&format!("http://{}", addr)).unwrap(),
        Url::parse(&format!("ws://{}", addr)).unwrap(),
    );
    RemoteConfigFetcher::new(
        reqwest::Client::new(),
        endpoints,
        Arc::new(StaticTokenAuthenticator::new("test-token")),
        ContextKey::new("guid-1", "web", "prod"),
        RetryPolicy::new(max_attempts, Backoff::new(5, 20)),
        Duration::from_secs(2),
    )
}

#[tokio::test]
async fn test_fetch_sends_bearer_and_parses_snapshot() {
    let (addr, log) = common::start_scripted_backend(vec![(200, common::f1_document(true, "hello"))]).await;

    let snapshot = fetcher(addr, 3).fetch(&Shutdown::new()).await.unwrap();
    assert!(snapshot.feature("f1").unwrap().enabled);
    assert_eq!(snapshot.property("banner").unwrap().value.as_str(), Some("hello"));
    assert!(snapshot.segment("s1").is_some());

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].path,
        "/apprapp/feature/v1/instances/guid-1/config?collection_id=web&environment_id=prod"
    );
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-token"));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let (addr, log) = common::start_scripted_backend(vec![
        (503, "unavailable".into()),
        (500, "boom".into()),
        (200, common::f1_document(false, "x")),
    ])
    .await;

    let snapshot = fetcher(addr, 3).fetch(&Shutdown::new()).await.unwrap();
    assert!(!snapshot.feature("f1").unwrap().enabled);
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_throttling_is_retried() {
    let (addr, log) = common::start_scripted_backend(vec![
        (429, "slow down".into()),
        (200, common::f1_document(true, "x")),
    ])
    .await;

    assert!(fetcher(addr, 3).fetch(&Shutdown::new()).await.is_ok());
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_error_is_final() {
    let (addr, log) = common::start_scripted_backend(vec![(404, "no such collection".into())]).await;

    let err = fetcher(addr, 3).fetch(&Shutdown::new()).await.unwrap_err();
    match err {
        FetchError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such collection");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_attempts_are_bounded() {
    let (addr, log) = common::start_scripted_backend(vec![(503, String::new())]).await;

    let err = fetcher(addr, 2).fetch(&Shutdown::new()).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_malformed_document_is_final() {
    let (addr, log) = common::start_scripted_backend(vec![(200, "{\"features\": 7}".into())]).await;

    let err = fetcher(addr, 3).fetch(&Shutdown::new()).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_document_is_rejected_whole() {
    let doc = serde_json::json!({
        "features": [
            {"feature_id": "ok", "type": "BOOLEAN", "enabled_value": true, "disabled_value": false},
            {"feature_id": "bad", "type": "NUMERIC", "enabled_value": "ten", "disabled_value": 0}
        ]
    })
    .to_string();
    let (addr, _log) = common::start_scripted_backend(vec![(200, doc)]).await;

    let err = fetcher(addr, 1).fetch(&Shutdown::new()).await.unwrap_err();
    assert!(matches!(err, FetchError::Snapshot(_)));
}

#[tokio::test]
async fn test_fetch_is_cancellable() {
    let addr = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        (200, String::new())
    })
    .await;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.trigger();
    });

    let started = std::time::Instant::now();
    let err = fetcher(addr, 3).fetch(&shutdown).await.unwrap_err();
    assert!(matches!(err, FetchError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}
