//! Status poll loop tests: initial snapshot, notification gating, dedup.

use crate::helpers::{
    body_string, mount_initial_state, mount_longpoll_state, mount_notifications, requests_for,
    status_json, test_config,
};

use monitor_core::connection::ServerConnection;

use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::sleep;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifications_count(requests: &[wiremock::Request]) -> usize {
    requests
        .iter()
        .filter(|r| body_string(r).contains("action=get-notifications"))
        .count()
}

/// **VALUE**: Pins the construction contract: the first status fetch is
/// synchronous and non-long-poll, and it populates the cached snapshot
/// before `connect` returns.
///
/// **WHY THIS MATTERS**: The tray renders its first icon from `status()`
/// immediately after connecting; a long-poll first fetch would leave it
/// blank for up to five minutes.
#[tokio::test]
async fn given_fresh_connection_when_connected_then_snapshot_populated_without_longpoll() {
    // GIVEN: A server whose state is {LastEventID: 5, LastNotificationUpdateID: 1}
    let server = MockServer::start().await;
    mount_initial_state(&server, 5, 1).await;
    mount_notifications(&server, json!([])).await;
    mount_longpoll_state(&server, 5, 1, Duration::from_secs(2)).await;

    // WHEN: Connecting
    let connection = ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect");

    // THEN: The snapshot is already populated
    let status = connection.status();
    assert_eq!(status.last_event_id, 5);
    assert_eq!(status.last_notification_update_id, 1);

    // THEN: The first control request was an immediate fetch from cursor 0
    let control = requests_for(&server, "/control.cgi").await;
    assert!(
        body_string(&control[0]).contains("longpoll=false"),
        "first fetch must not long-poll"
    );
    assert!(body_string(&control[0]).contains("lasteventid=0"));

    connection.close().await;
}

/// **VALUE**: Verifies the notification fetch is gated on the server's
/// change counter: unchanged counter, no fetch; changed counter, exactly
/// one fetch. Also verifies the long-poll cursor advances.
#[tokio::test]
async fn given_counter_changes_once_when_polling_then_exactly_one_extra_fetch() {
    // GIVEN: Initial state (5, 1); every long-poll answers (6, 2)
    let server = MockServer::start().await;
    mount_initial_state(&server, 5, 1).await;
    mount_notifications(&server, json!([])).await;
    mount_longpoll_state(&server, 6, 2, Duration::from_millis(150)).await;

    // WHEN: Letting several poll cycles run
    let connection = ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect");
    sleep(Duration::from_millis(800)).await;
    connection.close().await;

    let control = requests_for(&server, "/control.cgi").await;

    // THEN: One fetch at construction (counter -1 -> 1), one when the
    // counter moved to 2, none for the repeats
    assert_eq!(notifications_count(&control), 2);

    // THEN: Later long-polls carry the advanced cursor
    let last_poll = control
        .iter()
        .rev()
        .find(|r| body_string(r).contains("longpoll=true"))
        .expect("at least one long-poll");
    assert!(body_string(last_poll).contains("lasteventid=6"));
}

/// **VALUE**: Notifications at or before the last-seen timestamp are never
/// delivered, across repeated fetches of the same list.
///
/// **BUG THIS CATCHES**: Re-emitting the whole notification list every time
/// the counter moves, ballooning the tray with duplicate balloons.
#[tokio::test]
async fn given_repeated_fetches_when_list_unchanged_then_no_duplicate_delivery() {
    let server = MockServer::start().await;

    // GIVEN: No notification fetch at construction (counter stays -1)
    mount_initial_state(&server, 5, -1).await;

    // GIVEN: A stale notification and a fresh one
    let fresh_timestamp = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
    mount_notifications(
        &server,
        json!([
            {"ID": 1, "Title": "old", "Message": "", "Timestamp": "2001-01-01T00:00:00Z"},
            {"ID": 2, "Title": "new", "Message": "", "Timestamp": fresh_timestamp}
        ]),
    )
    .await;

    // GIVEN: The counter moves twice (1 then 2), then holds
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("longpoll=true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_json(6, 1))
                .set_delay(Duration::from_millis(200)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/control.cgi"))
        .and(body_string_contains("longpoll=true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_json(7, 2))
                .set_delay(Duration::from_millis(200)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_longpoll_state(&server, 7, 2, Duration::from_secs(2)).await;

    // WHEN: Subscribing before the first long-poll lands
    let connection = ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect");
    let mut notifications = connection.subscribe_notifications();

    sleep(Duration::from_millis(1200)).await;

    // THEN: Exactly one delivery - the fresh entry - despite two fetches
    let delivered = notifications.try_recv().expect("fresh notification");
    assert_eq!(delivered.id, 2);
    assert!(matches!(
        notifications.try_recv(),
        Err(TryRecvError::Empty)
    ));

    let control = requests_for(&server, "/control.cgi").await;
    assert_eq!(notifications_count(&control), 2, "one fetch per counter move");

    connection.close().await;
}
