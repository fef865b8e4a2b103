//! Long-poll status loop.
//!
//! One poll is outstanding at a time: the loop fetches, publishes the new
//! snapshot, derives notification events, then immediately polls again
//! carrying the advanced cursor. Errors are logged and the loop retries
//! without backoff until shutdown is signaled.

use crate::error::request::RequestError;
use crate::request::RequestExecutor;
use crate::wire::{Notification, PendingCommand, ServerStatus};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{broadcast, watch};

pub(crate) struct StatusPoller {
    executor: Arc<RequestExecutor>,
    poll_duration: Duration,
    status_tx: watch::Sender<Arc<ServerStatus>>,
    status_events: broadcast::Sender<Arc<ServerStatus>>,
    notification_events: broadcast::Sender<Arc<Notification>>,
    shutdown: watch::Receiver<bool>,
    last_event_id: i64,
    last_notification_update_id: i64,
    // Only notifications strictly newer than this are surfaced
    notification_watermark: DateTime<Utc>,
}

impl StatusPoller {
    pub(crate) fn new(
        executor: Arc<RequestExecutor>,
        poll_duration: Duration,
        status_tx: watch::Sender<Arc<ServerStatus>>,
        status_events: broadcast::Sender<Arc<ServerStatus>>,
        notification_events: broadcast::Sender<Arc<Notification>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            executor,
            poll_duration,
            status_tx,
            status_events,
            notification_events,
            shutdown,
            last_event_id: 0,
            last_notification_update_id: -1,
            notification_watermark: Utc::now(),
        }
    }

    /// Fetch the first snapshot without long-polling and publish it.
    ///
    /// Runs once, before the background loop starts, so callers observe a
    /// populated status immediately after connecting.
    pub(crate) async fn initial_update(&mut self) -> Result<(), RequestError> {
        let command = PendingCommand::current_state(None, self.last_event_id);
        let status: ServerStatus = self.executor.perform_json(&command).await?;
        self.apply_status(status).await
    }

    pub(crate) async fn run(mut self) {
        info!("status poll loop started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            if let Err(e) = self.poll_once().await {
                warn!("status poll failed: {e}");
            }
        }

        info!("status poll loop stopped");
    }

    async fn poll_once(&mut self) -> Result<(), RequestError> {
        let command = PendingCommand::current_state(Some(self.poll_duration), self.last_event_id);
        let status: ServerStatus = self.executor.perform_json(&command).await?;
        self.apply_status(status).await
    }

    /// Publish the snapshot, advance the cursor, and derive notification
    /// events when the server's change counter moved.
    async fn apply_status(&mut self, status: ServerStatus) -> Result<(), RequestError> {
        let status = Arc::new(status);

        self.last_event_id = status.last_event_id;
        self.status_tx.send_replace(Arc::clone(&status));
        // Subscribers may come and go; an empty audience is not an error
        let _ = self.status_events.send(Arc::clone(&status));

        if self.last_notification_update_id != status.last_notification_update_id {
            debug!(
                "notification update id moved to {}",
                status.last_notification_update_id
            );
            self.last_notification_update_id = status.last_notification_update_id;
            self.update_notifications().await?;
        }

        Ok(())
    }

    /// Fetch the notification list and emit entries newer than the
    /// watermark, oldest first. The watermark advances to the newest
    /// timestamp in the list, delivered or not, so replays stay silent.
    async fn update_notifications(&mut self) -> Result<(), RequestError> {
        let mut notifications: Vec<Notification> = self
            .executor
            .perform_json(&PendingCommand::get_notifications())
            .await?;

        notifications.sort_by_key(|n| n.timestamp);

        let newest = notifications.last().map(|n| n.timestamp);

        for notification in notifications {
            if notification.timestamp > self.notification_watermark {
                let _ = self.notification_events.send(Arc::new(notification));
            }
        }

        if let Some(newest) = newest
            && newest > self.notification_watermark
        {
            self.notification_watermark = newest;
        }

        Ok(())
    }
}
