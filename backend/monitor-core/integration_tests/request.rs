//! Executor-level tests: the 401 retry policy and response decoding.

use crate::helpers::{
    body_string, mount_login_handshake, password_credential, requests_for, test_config,
};

use monitor_core::error::RequestError;
use monitor_core::request::RequestExecutor;
use monitor_core::wire::PendingCommand;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// **VALUE**: Pins the re-authentication contract: one 401 triggers exactly
/// one login and one retried request, carrying the fresh session cookie.
///
/// **WHY THIS MATTERS**: Session expiry is routine (server restarts); if the
/// retry is missing every expiry surfaces as a user-visible error, and if it
/// is unbounded a bad password hammers the server in a loop.
#[tokio::test]
async fn given_one_401_when_performed_then_single_login_and_retry() {
    // GIVEN: A control endpoint that rejects the first request only
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;
    mount_login_handshake(&server).await;

    let executor = RequestExecutor::new(&test_config(&server.uri()), Some(password_credential()))
        .expect("executor");

    // WHEN: Performing a command
    let body = executor
        .perform_text(&PendingCommand::send_command("resume"))
        .await
        .expect("retry should succeed");

    // THEN: The retried response is returned
    assert_eq!(body, "OK");

    // THEN: Exactly two control POSTs, and the retry carried the session cookie
    let control = requests_for(&server, "/control.cgi").await;
    assert_eq!(control.len(), 2, "original + single retry");
    let cookie = control[1]
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(
        cookie.contains("session-auth=test-token-123"),
        "retry must carry the fresh token, got: {cookie}"
    );

    // THEN: Exactly one handshake (nonce + login)
    let login = requests_for(&server, "/login.cgi").await;
    assert_eq!(login.len(), 2, "one nonce fetch + one login");
}

/// **VALUE**: A second consecutive 401 surfaces as an auth error without a
/// third attempt.
#[tokio::test]
async fn given_persistent_401_when_performed_then_auth_error_after_one_retry() {
    // GIVEN: A control endpoint that always rejects
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_login_handshake(&server).await;

    let executor = RequestExecutor::new(&test_config(&server.uri()), Some(password_credential()))
        .expect("executor");

    // WHEN
    let result = executor
        .perform_text(&PendingCommand::send_command("resume"))
        .await;

    // THEN: Auth error, exactly two attempts, exactly one handshake
    assert!(matches!(result, Err(RequestError::Auth { .. })));
    assert_eq!(requests_for(&server, "/control.cgi").await.len(), 2);
    assert_eq!(requests_for(&server, "/login.cgi").await.len(), 2);
}

/// Without a configured credential a 401 is terminal: no handshake, no retry.
#[tokio::test]
async fn given_401_without_credential_when_performed_then_no_login_attempted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server.uri()), None).expect("executor");

    let result = executor
        .perform_text(&PendingCommand::send_command("pause"))
        .await;

    assert!(matches!(result, Err(RequestError::Auth { .. })));
    assert_eq!(requests_for(&server, "/control.cgi").await.len(), 1);
    assert!(requests_for(&server, "/login.cgi").await.is_empty());
}

/// Non-401 HTTP failures propagate immediately, without touching auth.
#[tokio::test]
async fn given_500_when_performed_then_http_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server.uri()), Some(password_credential()))
        .expect("executor");

    let result = executor
        .perform_text(&PendingCommand::send_command("pause"))
        .await;

    match result {
        Err(RequestError::Http { status, .. }) => assert_eq!(status.0, 500),
        other => panic!("expected Http error, got {other:?}"),
    }
    assert_eq!(requests_for(&server, "/control.cgi").await.len(), 1);
    assert!(requests_for(&server, "/login.cgi").await.is_empty());
}

/// **VALUE**: Verifies the wire shape of an ordinary request: form body with
/// `format=json` appended and the charset-qualified content type.
#[tokio::test]
async fn given_command_when_performed_then_form_encoded_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("format=json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server.uri()), None).expect("executor");
    executor
        .perform_text(&PendingCommand::send_command("pause").with("duration", "10m"))
        .await
        .expect("request");

    let control = requests_for(&server, "/control.cgi").await;
    assert_eq!(control.len(), 1);
    assert_eq!(
        body_string(&control[0]),
        "action=send-command&command=pause&duration=10m&format=json"
    );
    let content_type = control[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(content_type, "application/x-www-form-urlencoded; charset=utf-8");
}

/// Undecodable JSON surfaces as a protocol error, not a panic or a network
/// error.
#[tokio::test]
async fn given_malformed_json_when_typed_request_performed_then_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server.uri()), None).expect("executor");

    let result: Result<monitor_core::wire::ServerStatus, _> = executor
        .perform_json(&PendingCommand::current_state(None, 0))
        .await;

    assert!(matches!(result, Err(RequestError::Protocol { .. })));
}
