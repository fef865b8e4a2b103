//! Handshake tests against a mock login endpoint.

use crate::helpers::{
    NONCE_B64, SALT_B64, TEST_TOKEN, mount_login_handshake, password_credential, requests_for,
    test_config,
};

use monitor_core::error::RequestError;
use monitor_core::request::RequestExecutor;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor_for(server: &MockServer) -> RequestExecutor {
    RequestExecutor::new(&test_config(&server.uri()), Some(password_credential()))
        .expect("executor")
}

/// **VALUE**: End-to-end handshake: nonce fetch, hash transmission, session
/// cookie extraction. The login mock only matches the exact expected hash,
/// so a drifting derivation fails loudly here.
#[tokio::test]
async fn given_valid_credential_when_login_runs_then_token_minted() {
    // GIVEN: A server speaking the two-step handshake
    let server = MockServer::start().await;
    mount_login_handshake(&server).await;

    // WHEN: Minting a token
    let token = executor_for(&server).auth().mint_token().await.expect("handshake");

    // THEN: The issued session token is returned
    assert_eq!(token, TEST_TOKEN);

    // THEN: The login GET echoed the nonce in its own cookie
    let login_requests = requests_for(&server, "/login.cgi").await;
    assert_eq!(login_requests.len(), 2);
    let nonce_cookie = login_requests[1]
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(
        nonce_cookie.contains(&format!("session-nonce={NONCE_B64}")),
        "nonce cookie missing, got: {nonce_cookie}"
    );
}

/// A rejected login (non-200) is an auth failure, not a protocol one.
#[tokio::test]
async fn given_rejected_login_when_login_runs_then_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .and(query_param("get-nonce", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Salt": SALT_B64,
            "Nonce": NONCE_B64
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = executor_for(&server).auth().login().await;

    assert!(matches!(result, Err(RequestError::Auth { .. })));
}

/// A 200 login without the session cookie is a protocol violation.
#[tokio::test]
async fn given_login_response_without_cookie_when_login_runs_then_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .and(query_param("get-nonce", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Salt": SALT_B64,
            "Nonce": NONCE_B64
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = executor_for(&server).auth().login().await;

    assert!(matches!(result, Err(RequestError::Protocol { .. })));
}

/// A garbled nonce document is a protocol error before any hash is derived.
#[tokio::test]
async fn given_malformed_nonce_body_when_login_runs_then_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = executor_for(&server).auth().login().await;

    assert!(matches!(result, Err(RequestError::Protocol { .. })));
}
