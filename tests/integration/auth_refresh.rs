//! 401 recovery: refresh exchange, replay, credential clearing and single-flight.

use super::{builder, test_client};
use api_client_core::credentials::{MemoryKeyValueStore, CREDENTIALS_KEY};
use api_client_core::transport::MockTransport;
use api_client_core::{AuthState, Error, Method, RequestOptions};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const REFRESH: &str = "/auth/refresh";

#[tokio::test]
async fn test_expired_token_refreshed_and_request_replayed() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/profile", 401, json!({"message": "jwt expired"}));
    mock.push_json(Method::Post, REFRESH, 200, json!({"accessToken": "A2", "refreshToken": "R2"}));
    mock.push_json(Method::Get, "/profile", 200, json!({"name": "Ada"}));
    let client = test_client(mock.clone()).await;
    client.login("A1", "R1").await;

    let env = client.get::<serde_json::Value>("/profile", None, None).await.unwrap();
    assert_eq!(env.data["name"], "Ada");

    let profile = mock.requests_to("/profile");
    assert_eq!(profile.len(), 2);
    assert_eq!(profile[0].header("Authorization"), Some("Bearer A1"));
    assert_eq!(profile[1].header("Authorization"), Some("Bearer A2"));

    let refresh = mock.requests_to(REFRESH);
    assert_eq!(refresh.len(), 1);
    assert!(refresh[0].header("Authorization").is_none());
    assert_eq!(refresh[0].json_body(), Some(json!({"refreshToken": "R1"})));

    let pair = client.credentials().unwrap();
    assert_eq!(pair.access_token, "A2");
    assert_eq!(pair.refresh_token, "R2");
    assert_eq!(client.auth_state(), AuthState::Authenticated);
}

#[tokio::test]
async fn test_enveloped_grant_without_new_refresh_token_keeps_old_one() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/profile", 401, json!({}));
    mock.push_json(
        Method::Post,
        REFRESH,
        200,
        json!({"success": true, "data": {"accessToken": "A2"}}),
    );
    mock.push_json(Method::Get, "/profile", 200, json!({}));
    let client = test_client(mock.clone()).await;
    client.login("A1", "R1").await;

    client.get::<serde_json::Value>("/profile", None, None).await.unwrap();

    let pair = client.credentials().unwrap();
    assert_eq!(pair.access_token, "A2");
    assert_eq!(pair.refresh_token, "R1");
}

#[tokio::test]
async fn test_failed_refresh_clears_credentials() {
    let backend = Arc::new(MemoryKeyValueStore::new());
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/profile", 401, json!({}));
    mock.push_json(Method::Post, REFRESH, 401, json!({"message": "refresh token revoked"}));
    let client = builder(mock.clone())
        .credential_backend(backend.clone())
        .build()
        .await
        .unwrap();
    client.login("A1", "R1").await;
    assert!(backend.raw(CREDENTIALS_KEY).is_some());

    let err = client.get::<serde_json::Value>("/profile", None, None).await.unwrap_err();

    match &err {
        Error::Auth { message, .. } => assert!(message.contains("refresh token revoked"), "{message}"),
        other => panic!("expected auth error, got {other:?}"),
    }
    assert!(!client.is_authenticated());
    assert!(client.credentials().is_none());
    assert_eq!(client.auth_state(), AuthState::Unauthenticated);
    assert_eq!(backend.raw(CREDENTIALS_KEY), None);
    assert_eq!(mock.requests_to("/profile").len(), 1);
}

#[tokio::test]
async fn test_refresh_exchange_is_never_retried() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/profile", 401, json!({}));
    mock.push_json(Method::Post, REFRESH, 503, json!({}));
    mock.push_json(Method::Post, REFRESH, 200, json!({"accessToken": "A2"}));
    let client = test_client(mock.clone()).await;
    client.login("A1", "R1").await;

    let err = client.get::<serde_json::Value>("/profile", None, None).await.unwrap_err();

    assert!(matches!(err, Error::Auth { .. }));
    assert!(!err.is_retryable());
    assert_eq!(mock.requests_to(REFRESH).len(), 1);
    assert!(client.credentials().is_none());
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_surfaces_auth_error() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/profile", 401, json!({"message": "Unauthorized"}));
    let client = test_client(mock.clone()).await;

    let err = client.get::<serde_json::Value>("/profile", None, None).await.unwrap_err();

    assert!(matches!(err, Error::Auth { .. }));
    assert_eq!(err.status(), Some(401));
    assert!(mock.requests_to(REFRESH).is_empty());
}

#[tokio::test]
async fn test_unauthorized_replay_is_not_refreshed_again() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/admin", 401, json!({}));
    mock.push_json(Method::Post, REFRESH, 200, json!({"accessToken": "A2", "refreshToken": "R2"}));
    mock.push_json(Method::Get, "/admin", 401, json!({"message": "not an admin"}));
    let client = test_client(mock.clone()).await;
    client.login("A1", "R1").await;

    let err = client.get::<serde_json::Value>("/admin", None, None).await.unwrap_err();

    assert!(matches!(err, Error::Auth { .. }));
    assert_eq!(err.message(), "not an admin");
    assert_eq!(mock.requests_to("/admin").len(), 2);
    assert_eq!(mock.requests_to(REFRESH).len(), 1);
    // the refreshed pair stays; only a failed exchange clears it
    assert_eq!(client.credentials().unwrap().access_token, "A2");
}

#[tokio::test]
async fn test_skip_auth_request_never_triggers_refresh() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Post, "/auth/login", 401, json!({"message": "bad password"}));
    let client = test_client(mock.clone()).await;
    client.login("A1", "R1").await;

    let err = client
        .post::<serde_json::Value>(
            "/auth/login",
            Some(json!({"email": "a@b.c", "password": "x"})),
            Some(RequestOptions::new().skip_auth()),
        )
        .await
        .unwrap_err();

    assert_eq!(err.message(), "bad password");
    assert!(mock.requests_to(REFRESH).is_empty());
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_refresh() {
    let mock = Arc::new(MockTransport::new().with_latency(Duration::from_millis(15)));
    mock.push_json(Method::Get, "/feed", 401, json!({}));
    mock.push_json(Method::Get, "/feed", 401, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({}));
    mock.push_json(Method::Post, REFRESH, 200, json!({"accessToken": "A2", "refreshToken": "R2"}));
    let client = test_client(mock.clone()).await;
    client.login("A1", "R1").await;

    let (a, b) = tokio::join!(
        client.get::<serde_json::Value>("/feed", None, None),
        client.get::<serde_json::Value>("/feed", None, None),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(mock.requests_to(REFRESH).len(), 1);
    let replays: Vec<_> = mock.requests_to("/feed")[2..]
        .iter()
        .map(|r| r.header("Authorization").map(str::to_string))
        .collect();
    assert!(replays.iter().all(|h| h.as_deref() == Some("Bearer A2")));
}

#[tokio::test]
async fn test_concurrent_unauthorized_refresh_independently_without_single_flight() {
    let mock = Arc::new(MockTransport::new().with_latency(Duration::from_millis(15)));
    mock.push_json(Method::Get, "/feed", 401, json!({}));
    mock.push_json(Method::Get, "/feed", 401, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({}));
    mock.push_json(Method::Get, "/feed", 200, json!({}));
    mock.push_json(Method::Post, REFRESH, 200, json!({"accessToken": "A2", "refreshToken": "R2"}));
    mock.push_json(Method::Post, REFRESH, 200, json!({"accessToken": "A3", "refreshToken": "R3"}));
    let client = builder(mock.clone())
        .single_flight_refresh(false)
        .credential_backend(Arc::new(MemoryKeyValueStore::new()))
        .build()
        .await
        .unwrap();
    client.login("A1", "R1").await;

    let (a, b) = tokio::join!(
        client.get::<serde_json::Value>("/feed", None, None),
        client.get::<serde_json::Value>("/feed", None, None),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(mock.requests_to(REFRESH).len(), 2);
}

#[tokio::test]
async fn test_persisted_session_restored_by_new_client() {
    let backend = Arc::new(MemoryKeyValueStore::new());
    let mock = Arc::new(MockTransport::new());
    mock.push_json(Method::Get, "/profile", 200, json!({}));

    let first = builder(mock.clone())
        .credential_backend(backend.clone())
        .build()
        .await
        .unwrap();
    assert_eq!(first.auth_state(), AuthState::Unauthenticated);
    first.login("A1", "R1").await;

    let second = builder(mock.clone())
        .credential_backend(backend.clone())
        .build()
        .await
        .unwrap();
    assert!(second.is_authenticated());
    assert_eq!(second.auth_state(), AuthState::Authenticated);

    second.get::<serde_json::Value>("/profile", None, None).await.unwrap();
    assert_eq!(mock.requests()[0].header("Authorization"), Some("Bearer A1"));

    second.logout().await;
    assert_eq!(backend.raw(CREDENTIALS_KEY), None);
}
