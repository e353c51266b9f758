//! 401 recovery through the interceptor and refresh protocol

mod common;

use common::{anonymous_client, client_with_tokens, success, tokens_json, user_json};
use jobdm_http::{ClientError, ExpiryReason, SessionEvent};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_refresh(server: &MockServer, from: &str, to: (&str, &str), expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refreshToken": from })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(json!({ "tokens": tokens_json(to.0, to.1) }))),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success(json!({ "user": user_json("u1") }))),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "old-refresh", ("new-access", "new-refresh"), 1).await;

    let client = client_with_tokens(&server, "old-access", "old-refresh");
    let mut events = client.session_events();

    let user = client.profile().await.unwrap();

    assert_eq!(user.id, "u1");
    assert_eq!(client.tokens().access_token().as_deref(), Some("new-access"));
    assert_eq!(client.tokens().refresh_token().as_deref(), Some("new-refresh"));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);
}

#[tokio::test]
async fn test_retry_that_fails_again_does_not_refresh_twice() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Still unauthorized"
        })))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, "old-refresh", ("new-access", "new-refresh"), 1).await;

    let client = client_with_tokens(&server, "old-access", "old-refresh");

    let result = client.profile().await;

    match result {
        Err(ClientError::Unauthorized(message)) => assert_eq!(message, "Still unauthorized"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
    // The second 401 is reported as-is; the refreshed pair stays in place
    assert_eq!(client.tokens().access_token().as_deref(), Some("new-access"));
}

#[tokio::test]
async fn test_public_endpoint_401_never_refreshes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Invalid email or password"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_with_tokens(&server, "a1", "r1");
    let mut events = client.session_events();

    let err = client.login("ada@example.com", "wrong").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Invalid email or password");
    assert_eq!(client.tokens().access_token().as_deref(), Some("a1"));
    assert_eq!(client.tokens().refresh_token().as_deref(), Some("r1"));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_refresh_failure_clears_session_and_surfaces_refresh_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "message": "Refresh store unavailable"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_tokens(&server, "a1", "r1");
    let mut events = client.session_events();

    let err = client.profile().await.unwrap_err();

    assert!(matches!(err, ClientError::Server { status: 500, .. }));
    assert_eq!(err.user_message(), "Refresh store unavailable");
    assert_eq!(client.tokens().access_token(), None);
    assert_eq!(client.tokens().refresh_token(), None);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired {
            reason: ExpiryReason::RefreshFailed
        }
    );
}

#[tokio::test]
async fn test_refresh_rejected_with_401_expires_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile-completion"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_tokens(&server, "a1", "r1");

    let err = client.profile_completion().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Refresh token revoked");
    assert!(!client.tokens().has_access_token());
}

#[tokio::test]
async fn test_missing_refresh_token_expires_without_refresh_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Authentication required"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = anonymous_client(&server);
    let mut events = client.session_events();

    let err = client.profile().await.unwrap_err();

    // The original 401 is what the caller sees
    assert_eq!(err.user_message(), "Authentication required");
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired {
            reason: ExpiryReason::MissingRefreshToken
        }
    );
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success(json!({ "user": user_json("u1") }))),
        )
        .expect(3)
        .mount(&server)
        .await;
    mount_refresh(&server, "old-refresh", ("new-access", "new-refresh"), 1).await;

    let client = client_with_tokens(&server, "old-access", "old-refresh");

    let (a, b, c) = tokio::join!(client.profile(), client.profile(), client.profile());

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(c.is_ok());
    assert_eq!(client.tokens().access_token().as_deref(), Some("new-access"));
}

#[tokio::test]
async fn test_network_error_keeps_tokens() {
    // Reserve a port, then close it so nothing is listening
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = jobdm_http::JobdmClient::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .token_store(std::sync::Arc::new(jobdm_http::MemoryTokenStore::with_tokens(
            "a1", "r1",
        )))
        .build()
        .unwrap();

    let err = client.profile().await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(
        err.user_message(),
        "Network error. Please check your internet connection."
    );
    assert_eq!(client.tokens().access_token().as_deref(), Some("a1"));
    assert_eq!(client.tokens().refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_timeout_is_reported_as_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_millis(500))
                .set_body_json(success(json!({ "user": user_json("u1") }))),
        )
        .mount(&server)
        .await;

    let client = jobdm_http::JobdmClient::builder()
        .base_url(server.uri())
        .timeout(std::time::Duration::from_millis(50))
        .build()
        .unwrap();

    let err = client.profile().await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn test_access_token_without_refresh_token_is_cleared() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join(jobdm_http::FileTokenStore::FILE_NAME);
    std::fs::write(
        &session_file,
        json!({ "jobdm_access_token": "stale-access" }).to_string(),
    )
    .unwrap();

    let client = jobdm_http::JobdmClient::builder()
        .base_url(server.uri())
        .token_store(std::sync::Arc::new(jobdm_http::FileTokenStore::in_dir(
            dir.path(),
        )))
        .build()
        .unwrap();
    let mut events = client.session_events();

    let err = client.profile().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(client.tokens().access_token(), None);
    assert_eq!(client.tokens().refresh_token(), None);
    assert!(!session_file.exists());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired {
            reason: ExpiryReason::MissingRefreshToken
        }
    );
}
