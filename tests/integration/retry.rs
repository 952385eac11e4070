//! Backoff schedule, retry budgets and non-retryable statuses.

use super::{builder, test_client, BASE_DELAY};
use api_client_core::credentials::MemoryKeyValueStore;
use api_client_core::transport::MockTransport;
use api_client_core::{Error, Method, RequestOptions};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_transient_failures_retried_with_exponential_backoff() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..3 {
        mock.push_json(Method::Get, "/feed", 503, json!({"message": "busy"}));
    }
    mock.push_json(Method::Get, "/feed", 200, json!({"items": [1, 2]}));
    let client = test_client(mock.clone()).await;

    let env = client.get::<serde_json::Value>("/feed", None, None).await.unwrap();
    assert_eq!(env.data["items"], json!([1, 2]));

    let sent = mock.requests_to("/feed");
    assert_eq!(sent.len(), 4);
    for (i, pair) in sent.windows(2).enumerate() {
        let gap = pair[1].sent_at.duration_since(pair[0].sent_at);
        let expected = BASE_DELAY * 2u32.pow(i as u32);
        assert!(gap >= expected, "gap {} was {:?}, expected >= {:?}", i, gap, expected);
    }

    let ids: Vec<_> = sent.iter().map(|r| r.header("X-Request-ID").unwrap().to_string()).collect();
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_budget_exhausted_surfaces_server_error() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..4 {
        mock.push_json(Method::Get, "/feed", 503, json!({"message": "Service Unavailable"}));
    }
    let client = test_client(mock.clone()).await;

    let err = client.get::<serde_json::Value>("/feed", None, None).await.unwrap_err();
    match err {
        Error::Server { status, ref message, .. } => {
            assert_eq!(status, 503);
            assert_eq!(message, "Service Unavailable");
        }
        ref other => panic!("expected server error, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test]
async fn test_network_errors_are_retried() {
    let mock = Arc::new(MockTransport::new());
    mock.push_network_error(Method::Get, "/events", "connection reset by peer");
    mock.push_json(Method::Get, "/events", 200, json!([]));
    let client = test_client(mock.clone()).await;

    let env = client.get::<serde_json::Value>("/events", None, None).await.unwrap();
    assert!(env.success);
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_network_error_exhaustion_is_transport_error() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..4 {
        mock.push_network_error(Method::Get, "/events", "network unreachable");
    }
    let client = test_client(mock.clone()).await;

    let err = client.get::<serde_json::Value>("/events", None, None).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(err.status(), None);
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test]
async fn test_skip_retry_fails_on_first_transient_error() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Post, "/checkin", 502, json!({}));
    mock.push_json(Method::Post, "/checkin", 200, json!({}));
    let client = test_client(mock.clone()).await;

    let err = client
        .post::<serde_json::Value>("/checkin", None, Some(RequestOptions::new().skip_retry()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(mock.request_count(), 1);
    assert_eq!(mock.pending(), 1);
}

#[tokio::test]
async fn test_non_retryable_statuses_fail_immediately() {
    for status in [400u16, 403, 404, 501] {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(Method::Get, "/groups", status, json!({"error": "nope"}));
        let client = test_client(mock.clone()).await;

        let err = client.get::<serde_json::Value>("/groups", None, None).await.unwrap_err();
        assert_eq!(err.status(), Some(status));
        assert_eq!(err.message(), "nope");
        assert_eq!(mock.request_count(), 1, "status {} must not be retried", status);
    }
}

#[tokio::test]
async fn test_counter_cleared_when_chain_finishes() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/feed", 429, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({}));
    mock.push_json(Method::Get, "/feed", 504, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({}));
    let client = test_client(mock.clone()).await;

    client.get::<serde_json::Value>("/feed", None, None).await.unwrap();
    assert_eq!(client.retry_attempts("/feed"), 0);

    // a later chain on the same endpoint gets the full budget again
    client.get::<serde_json::Value>("/feed", None, None).await.unwrap();
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test]
async fn test_concurrent_chains_share_one_budget() {
    let mock = Arc::new(MockTransport::new().with_latency(Duration::from_millis(10)));
    mock.push_json(Method::Get, "/feed", 503, json!({}));
    mock.push_json(Method::Get, "/feed", 503, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({"ok": true}));
    let client = builder(mock.clone())
        .max_attempts(1)
        .credential_backend(Arc::new(MemoryKeyValueStore::new()))
        .build()
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        client.get::<serde_json::Value>("/feed", None, None),
        client.get::<serde_json::Value>("/feed", None, None),
    );

    let ok = [a.is_ok(), b.is_ok()].iter().filter(|x| **x).count();
    assert_eq!(ok, 1, "one chain gets the single retry, the other fails");
    assert_eq!(mock.request_count(), 3);
}

#[tokio::test]
async fn test_finished_sibling_does_not_refill_budget() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/feed", 503, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({"from": "sibling"}));
    mock.push_json(Method::Get, "/feed", 503, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({"from": "extra retry"}));
    let client = builder(mock.clone())
        .max_attempts(1)
        .base_delay(Duration::from_millis(40))
        .credential_backend(Arc::new(MemoryKeyValueStore::new()))
        .build()
        .await
        .unwrap();

    let retrying = client.get::<serde_json::Value>("/feed", None, None);
    let sibling = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.get::<serde_json::Value>("/feed", None, None).await
    };
    let (retrying, sibling) = tokio::join!(retrying, sibling);

    assert_eq!(sibling.unwrap().data["from"], "sibling");
    let err = retrying.unwrap_err();
    assert_eq!(err.status(), Some(503));
    // first dispatch + its single retry, plus the sibling's one dispatch
    assert_eq!(mock.request_count(), 3);
    assert_eq!(mock.pending(), 1);
    assert_eq!(client.retry_attempts("/feed"), 0);
}

#[tokio::test]
async fn test_custom_retry_key_separates_budgets() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/search", 500, json!({}));
    mock.push_json(Method::Get, "/search", 200, json!({}));
    let client = builder(mock.clone())
        .max_attempts(1)
        .credential_backend(Arc::new(MemoryKeyValueStore::new()))
        .build()
        .await
        .unwrap();

    let env = client
        .get::<serde_json::Value>(
            "/search",
            None,
            Some(RequestOptions::new().with_retry_key("search:people")),
        )
        .await
        .unwrap();
    assert!(env.success);
    assert_eq!(client.retry_attempts("search:people"), 0);
    assert_eq!(client.retry_attempts("/search"), 0);
}
