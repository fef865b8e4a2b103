//! Serialized command dispatch.
//!
//! Public API calls enqueue a command and wake the dispatcher; the loop
//! drains the queue FIFO and submits each command fire-and-forget. When a
//! pass finds the queue empty it parks on the wake signal, bounded by the
//! idle wait so the loop stays live even without explicit wakes.

use crate::error::request::RequestError;
use crate::request::RequestExecutor;
use crate::wire::PendingCommand;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, trace, warn};
use tokio::sync::{Notify, watch};
use tokio::time::timeout;

/// Mutex-protected FIFO shared by producers and the single consumer.
pub(crate) struct CommandQueue {
    queue: Mutex<VecDeque<PendingCommand>>,
    wake: Notify,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
        }
    }

    pub(crate) fn push(&self, command: PendingCommand) {
        if let Ok(mut queue) = self.queue.lock() {
            trace!("enqueued '{}'", command.action());
            queue.push_back(command);
        }
        self.wake.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<PendingCommand> {
        self.queue.lock().ok().and_then(|mut queue| queue.pop_front())
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub(crate) fn wake(&self) {
        self.wake.notify_one();
    }

    async fn idle_wait(&self, bound: Duration) {
        let _ = timeout(bound, self.wake.notified()).await;
    }
}

pub(crate) struct CommandDispatcher {
    executor: Arc<RequestExecutor>,
    queue: Arc<CommandQueue>,
    idle_wait: Duration,
    shutdown: watch::Receiver<bool>,
}

impl CommandDispatcher {
    pub(crate) fn new(
        executor: Arc<RequestExecutor>,
        queue: Arc<CommandQueue>,
        idle_wait: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            executor,
            queue,
            idle_wait,
            shutdown,
        }
    }

    pub(crate) async fn run(self) {
        info!("command dispatch loop started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let drained_any = self.drain().await;

            if *self.shutdown.borrow() {
                break;
            }

            if !drained_any {
                self.queue.idle_wait(self.idle_wait).await;
            }
        }

        let abandoned = self.queue.len();
        if abandoned > 0 {
            warn!("command dispatch loop stopped with {abandoned} commands abandoned");
        } else {
            info!("command dispatch loop stopped");
        }
    }

    /// Drain the queue FIFO. A command that fails to submit is logged and
    /// dropped; the rest of the batch still goes out.
    async fn drain(&self) -> bool {
        let mut drained_any = false;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let Some(command) = self.queue.pop() else {
                break;
            };

            drained_any = true;
            if let Err(e) = self.submit(&command).await {
                warn!("command '{}' failed: {e}", command.action());
            }
        }

        drained_any
    }

    async fn submit(&self, command: &PendingCommand) -> Result<(), RequestError> {
        // Fire-and-forget: the response body is irrelevant to the caller
        self.executor.perform_text(command).await?;
        Ok(())
    }
}
