//! Facade tests: derived page URLs, event subscriptions, clean shutdown.

use crate::helpers::{
    TEST_TOKEN, mount_initial_state, mount_longpoll_state, mount_login_handshake,
    password_credential, test_config,
};

use monitor_core::connection::ServerConnection;

use std::time::Duration;

use tokio::time::timeout;
use wiremock::MockServer;

async fn quiet_connection(server: &MockServer) -> ServerConnection {
    mount_initial_state(server, 5, -1).await;
    mount_longpoll_state(server, 5, -1, Duration::from_millis(100)).await;
    ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect")
}

/// With a credential configured the status page URL carries a freshly
/// minted token, distinct from the polling session.
#[tokio::test]
async fn given_credential_when_status_url_built_then_fresh_token_appended() {
    let server = MockServer::start().await;
    mount_initial_state(&server, 5, -1).await;
    mount_longpoll_state(&server, 5, -1, Duration::from_secs(2)).await;
    mount_login_handshake(&server).await;

    let connection =
        ServerConnection::connect(test_config(&server.uri()), Some(password_credential()))
            .await
            .expect("connect");

    let url = connection.status_page_url().await;

    assert_eq!(
        url,
        format!("{}/index.html?auth-token={}", server.uri(), TEST_TOKEN)
    );

    connection.close().await;
}

/// Without a credential (or when minting fails) the plain URL is returned.
#[tokio::test]
async fn given_no_credential_when_status_url_built_then_plain_url() {
    let server = MockServer::start().await;
    let connection = quiet_connection(&server).await;

    assert_eq!(
        connection.status_page_url().await,
        format!("{}/index.html", server.uri())
    );
    assert_eq!(
        connection.edit_page_url(),
        format!("{}/edit-window.html", server.uri())
    );

    connection.close().await;
}

/// **VALUE**: Every status subscriber sees every poll result, in poll order.
#[tokio::test]
async fn given_subscriber_when_poll_completes_then_update_delivered() {
    let server = MockServer::start().await;
    mount_initial_state(&server, 5, -1).await;
    mount_longpoll_state(&server, 6, -1, Duration::from_millis(300)).await;

    let connection = ServerConnection::connect(test_config(&server.uri()), None)
        .await
        .expect("connect");

    // Two independent subscribers
    let mut first = connection.subscribe_status();
    let mut second = connection.subscribe_status();

    let update_a = timeout(Duration::from_secs(5), first.recv())
        .await
        .expect("poll within deadline")
        .expect("channel open");
    let update_b = timeout(Duration::from_secs(5), second.recv())
        .await
        .expect("poll within deadline")
        .expect("channel open");

    assert_eq!(update_a.last_event_id, 6);
    assert_eq!(update_b.last_event_id, 6);

    connection.close().await;
}

/// With short polls and an idle queue, shutdown is clean: nothing
/// abandoned, nothing aborted.
#[tokio::test]
async fn given_idle_connection_when_closed_then_clean_shutdown() {
    let server = MockServer::start().await;
    let connection = quiet_connection(&server).await;

    let report = connection.close().await;

    assert_eq!(report.abandoned_commands, 0);
    assert!(!report.forced, "loops should observe the flag within the grace");
}
