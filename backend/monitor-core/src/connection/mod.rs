//! Public facade over the protocol engine.
//!
//! [`ServerConnection::connect`] fetches the first status snapshot
//! synchronously, then spawns the two background loops: the long-poll
//! status poller and the command dispatcher. Callers read the latest
//! snapshot at any time, subscribe to status/notification events, enqueue
//! commands, and shut the engine down cooperatively.

use crate::auth::Credential;
use crate::config::ConnectionConfig;
use crate::dispatcher::{CommandDispatcher, CommandQueue};
use crate::error::CoreError;
use crate::poller::StatusPoller;
use crate::request::RequestExecutor;
use crate::wire::{Notification, PendingCommand, ServerStatus};
use crate::{EDIT_WINDOW, STATUS_WINDOW};

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Capacity of the status/notification event channels. A subscriber that
/// lags further than this loses the oldest events, not the newest.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome of a cooperative shutdown.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownReport {
    /// Commands still queued when the dispatcher stopped. Abandoned, by
    /// design: draining against an unreachable server could block forever.
    pub abandoned_commands: usize,

    /// True when a loop missed the grace period and was aborted.
    pub forced: bool,
}

/// Live connection to the control server.
pub struct ServerConnection {
    executor: Arc<RequestExecutor>,
    queue: Arc<CommandQueue>,
    status_rx: watch::Receiver<Arc<ServerStatus>>,
    status_events: broadcast::Sender<Arc<ServerStatus>>,
    notification_events: broadcast::Sender<Arc<Notification>>,
    shutdown_tx: watch::Sender<bool>,
    poller_task: Option<JoinHandle<()>>,
    dispatcher_task: Option<JoinHandle<()>>,
    base_url: String,
    shutdown_grace: Duration,
}

impl ServerConnection {
    /// Connect, fetch the initial snapshot, and start the background loops.
    ///
    /// The first status fetch (and the notification derivation it triggers)
    /// completes before this returns, so [`status`](Self::status) is
    /// populated from the start.
    pub async fn connect(
        config: ConnectionConfig,
        credential: Option<Credential>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let base_url = config.normalized_base_url();
        info!("connecting to {base_url}");

        let executor = Arc::new(RequestExecutor::new(&config, credential)?);

        let placeholder = ServerStatus {
            last_event_id: 0,
            last_notification_update_id: -1,
            program_state: None,
            suggested_status_icon: None,
        };
        let (status_tx, status_rx) = watch::channel(Arc::new(placeholder));
        let (status_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (notification_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut poller = StatusPoller::new(
            Arc::clone(&executor),
            config.timing.poll_duration(),
            status_tx,
            status_events.clone(),
            notification_events.clone(),
            shutdown_rx.clone(),
        );

        poller.initial_update().await?;

        let queue = Arc::new(CommandQueue::new());
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&executor),
            Arc::clone(&queue),
            config.timing.idle_wait(),
            shutdown_rx,
        );

        let poller_task = tokio::spawn(poller.run());
        let dispatcher_task = tokio::spawn(dispatcher.run());

        Ok(Self {
            executor,
            queue,
            status_rx,
            status_events,
            notification_events,
            shutdown_tx,
            poller_task: Some(poller_task),
            dispatcher_task: Some(dispatcher_task),
            base_url,
            shutdown_grace: config.timing.shutdown_grace(),
        })
    }

    /// Latest status snapshot.
    pub fn status(&self) -> Arc<ServerStatus> {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to status updates. Every subscriber sees every update.
    pub fn subscribe_status(&self) -> broadcast::Receiver<Arc<ServerStatus>> {
        self.status_events.subscribe()
    }

    /// Subscribe to newly surfaced notifications, oldest first.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.notification_events.subscribe()
    }

    /// Pause the server, optionally for a bounded duration.
    pub fn pause(&self, duration: Option<Duration>) {
        let mut command = PendingCommand::send_command("pause");
        if let Some(duration) = duration {
            command = command.with("duration", humantime::format_duration(duration).to_string());
        }
        self.queue.push(command);
    }

    pub fn resume(&self) {
        self.queue.push(PendingCommand::send_command("resume"));
    }

    /// Stop the running task after the current file.
    pub fn stop_task(&self) {
        self.queue.push(PendingCommand::send_command("stop"));
    }

    /// Abort the running task immediately.
    pub fn abort_task(&self) {
        self.queue.push(PendingCommand::send_command("abort"));
    }

    pub fn run_backup(&self, id: i64, force_full: bool) {
        let mut command = PendingCommand::send_command("run-backup").with("id", id.to_string());
        if force_full {
            command = command.with("full", "true");
        }
        self.queue.push(command);
    }

    pub fn dismiss_notification(&self, id: i64) {
        self.queue.push(PendingCommand::dismiss_notification(id));
    }

    /// URL of the server's status page, carrying a freshly minted auth
    /// token when a credential is configured. Falls back to the plain URL
    /// when minting fails; the page will prompt for login instead.
    pub async fn status_page_url(&self) -> String {
        if self.executor.auth().has_credential() {
            match self.executor.auth().mint_token().await {
                Ok(token) => {
                    return format!("{}{}?auth-token={}", self.base_url, STATUS_WINDOW, token);
                }
                Err(e) => debug!("could not mint status page token: {e}"),
            }
        }

        format!("{}{}", self.base_url, STATUS_WINDOW)
    }

    /// URL of the server's configuration-edit page.
    pub fn edit_page_url(&self) -> String {
        format!("{}{}", self.base_url, EDIT_WINDOW)
    }

    /// Cooperative shutdown: raise the flag, wake the dispatcher, and give
    /// each loop the grace period to exit. A loop still blocked after the
    /// grace (typically the poller inside a held long-poll) is aborted
    /// rather than allowed to block shutdown indefinitely.
    pub async fn close(mut self) -> ShutdownReport {
        info!("closing server connection to {}", self.base_url);

        self.shutdown_tx.send_replace(true);
        self.queue.wake();

        let mut forced = false;
        for task in [self.poller_task.take(), self.dispatcher_task.take()] {
            let Some(task) = task else { continue };

            let abort = task.abort_handle();
            if timeout(self.shutdown_grace, task).await.is_err() {
                abort.abort();
                forced = true;
            }
        }

        let abandoned_commands = self.queue.len();
        info!(
            "server connection closed (abandoned: {abandoned_commands}, forced: {forced})"
        );

        ShutdownReport {
            abandoned_commands,
            forced,
        }
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        // close() already detached both handles; this only fires when the
        // connection is dropped without a cooperative shutdown.
        if let Some(task) = self.poller_task.take() {
            task.abort();
        }
        if let Some(task) = self.dispatcher_task.take() {
            task.abort();
        }
    }
}
