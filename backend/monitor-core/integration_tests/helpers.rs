//! Test helpers for wiremock-backed integration tests.
//!
//! Mocks speak the control protocol: POST /control.cgi with a URL-encoded
//! body (matched on substrings), GET /login.cgi for the handshake. Timings
//! are shrunk so loops cycle within a test's patience.

use monitor_core::auth::Credential;
use monitor_core::config::ConnectionConfig;

use common::RedactedPassword;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Password matching the fixed hash vector in the unit tests.
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Salt/nonce the mock login endpoint hands out.
pub const SALT_B64: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
pub const NONCE_B64: &str = "ZmVkY2JhOTg3NjU0MzIxMGZlZGNiYTk4NzY1NDMyMTA=";

/// The login hash the client must transmit for the vector above.
pub const LOGIN_HASH_B64: &str = "gDbUzbv0DDTgewxmECvlyrpE9fbCH7LuEM9GUOVpkj4=";

/// Token the mock login endpoint issues.
pub const TEST_TOKEN: &str = "test-token-123";

pub fn test_config(base_url: &str) -> ConnectionConfig {
    let mut config = ConnectionConfig::for_server(base_url);
    config.timing.poll_duration_secs = 1;
    config.timing.poll_grace_secs = 1;
    config.timing.idle_wait_secs = 1;
    config.timing.shutdown_grace_secs = 2;
    config.timing.request_timeout_secs = 5;
    config
}

pub fn password_credential() -> Credential {
    Credential::Password(RedactedPassword::new(String::from(TEST_PASSWORD)))
}

pub fn status_json(last_event_id: i64, last_notification_update_id: i64) -> serde_json::Value {
    json!({
        "LastEventID": last_event_id,
        "LastNotificationUpdateID": last_notification_update_id,
        "ProgramState": "Running"
    })
}

/// Answer the initial (non-long-poll) status fetch.
pub async fn mount_initial_state(server: &MockServer, event_id: i64, notification_id: i64) {
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("longpoll=false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json(event_id, notification_id)))
        .mount(server)
        .await;
}

/// Answer long-poll status fetches, holding each for `hold` to emulate the
/// server parking the request.
pub async fn mount_longpoll_state(
    server: &MockServer,
    event_id: i64,
    notification_id: i64,
    hold: Duration,
) {
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("longpoll=true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_json(event_id, notification_id))
                .set_delay(hold),
        )
        .mount(server)
        .await;
}

pub async fn mount_notifications(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("action=get-notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount the two-step login handshake: nonce fetch, then the login GET
/// matching the exact transmitted hash, answered with the session cookie.
pub async fn mount_login_handshake(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .and(wiremock::matchers::query_param("get-nonce", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "Salt": SALT_B64,
                "Nonce": NONCE_B64
            })),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .and(wiremock::matchers::query_param("password", LOGIN_HASH_B64))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "session-auth=test-token-123; Path=/"),
        )
        .mount(server)
        .await;
}

/// All recorded requests hitting the given path, in arrival order.
pub async fn requests_for(server: &MockServer, wanted: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == wanted)
        .collect()
}

pub fn body_string(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}
