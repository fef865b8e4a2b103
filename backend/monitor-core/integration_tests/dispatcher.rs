//! Dispatch loop tests: FIFO order, per-command error isolation, and
//! shutdown with a non-empty queue.

use crate::helpers::{
    body_string, mount_initial_state, mount_longpoll_state, requests_for, test_config,
};

use monitor_core::connection::ServerConnection;

use std::time::Duration;

use tokio::time::sleep;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_command_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("command="))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(server)
        .await;
}

fn command_bodies(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .map(body_string)
        .filter(|body| body.contains("command="))
        .collect()
}

/// **VALUE**: Pins the FIFO dispatch contract end to end: commands reach the
/// transport in enqueue order with their parameters intact.
///
/// **WHY THIS MATTERS**: "Pause for 10 minutes, then changed my mind,
/// resume" must never execute as resume-then-pause; that leaves the server
/// paused indefinitely.
#[tokio::test]
async fn given_pause_then_resume_when_dispatched_then_transport_sees_same_order() {
    // GIVEN: A connected client with a quiet poll loop
    let server = MockServer::start().await;
    mount_initial_state(&server, 5, -1).await;
    mount_longpoll_state(&server, 5, -1, Duration::from_secs(2)).await;
    mount_command_ok(&server).await;

    let connection = ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect");

    // WHEN: Enqueueing pause(10m) then resume
    connection.pause(Some(Duration::from_secs(600)));
    connection.resume();
    sleep(Duration::from_millis(500)).await;

    // THEN: Two command POSTs in enqueue order
    let bodies = command_bodies(&requests_for(&server, "/control.cgi").await);
    assert_eq!(bodies.len(), 2);
    assert!(
        bodies[0].contains("command=pause&duration=10m"),
        "first body: {}",
        bodies[0]
    );
    assert!(bodies[1].contains("command=resume"), "second body: {}", bodies[1]);

    connection.close().await;
}

/// **VALUE**: A failing command must not take the rest of the batch down
/// with it - dispatch is fire-and-forget with per-command error isolation.
#[tokio::test]
async fn given_first_command_fails_when_dispatched_then_second_still_submitted() {
    let server = MockServer::start().await;
    mount_initial_state(&server, 5, -1).await;
    mount_longpoll_state(&server, 5, -1, Duration::from_secs(2)).await;

    // GIVEN: pause is rejected, resume is accepted
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("command=pause"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("command=resume"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let connection = ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect");

    // WHEN
    connection.pause(None);
    connection.resume();
    sleep(Duration::from_millis(500)).await;

    // THEN: Both commands reached the transport, in order
    let bodies = command_bodies(&requests_for(&server, "/control.cgi").await);
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].contains("command=pause"));
    assert!(bodies[1].contains("command=resume"));

    connection.close().await;
}

/// **VALUE**: Pins the documented shutdown semantics: commands still queued
/// when the grace period expires are abandoned, and the count is reported.
///
/// **WHY THIS MATTERS**: The alternative - draining the queue against a
/// hung server - would block tray exit indefinitely. The report makes the
/// trade-off observable instead of silent.
#[tokio::test]
async fn given_nonempty_queue_when_closed_then_abandoned_count_reported() {
    // GIVEN: Command submissions that hang longer than the shutdown grace
    let server = MockServer::start().await;
    mount_initial_state(&server, 5, -1).await;
    mount_longpoll_state(&server, 5, -1, Duration::from_secs(5)).await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("command="))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let connection = ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect");

    // WHEN: Three commands are queued and the first is mid-flight at close
    connection.pause(None);
    connection.stop_task();
    connection.abort_task();
    sleep(Duration::from_millis(400)).await;

    let report = connection.close().await;

    // THEN: The in-flight command is gone, the two queued ones are abandoned
    assert_eq!(report.abandoned_commands, 2);
    assert!(report.forced, "loops blocked past the grace must be aborted");
}
