//! Typed wire records exchanged with the control server.
//!
//! The server speaks PascalCase JSON; field renames pin the exact wire
//! spelling so the rest of the crate stays idiomatic. Records are immutable
//! once received and replaced wholesale on each successful poll.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire value for the status-fetch action.
pub const ACTION_GET_STATE: &str = "get-current-state";

/// Wire value for the notification-list action.
pub const ACTION_GET_NOTIFICATIONS: &str = "get-notifications";

/// Wire value for the command-relay action.
pub const ACTION_SEND_COMMAND: &str = "send-command";

/// Wire value for the notification-dismiss action.
pub const ACTION_DISMISS_NOTIFICATION: &str = "dismiss-notification";

/// Snapshot of the server's state, replaced on every successful poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Monotonic cursor for long-poll continuation.
    #[serde(rename = "LastEventID")]
    pub last_event_id: i64,

    /// Change counter; a new value means the notification list changed.
    #[serde(rename = "LastNotificationUpdateID")]
    pub last_notification_update_id: i64,

    #[serde(rename = "ProgramState", default)]
    pub program_state: Option<String>,

    #[serde(rename = "SuggestedStatusIcon", default)]
    pub suggested_status_icon: Option<String>,
}

/// A server-side notification; append-only on the server, read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Type", default)]
    pub kind: Option<String>,

    #[serde(rename = "Title", default)]
    pub title: String,

    #[serde(rename = "Message", default)]
    pub message: String,

    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Transient salt/nonce pair, valid for a single login attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct SaltAndNonce {
    /// Base64-encoded salt the password was stored under.
    #[serde(rename = "Salt")]
    pub salt: String,

    /// Base64-encoded single-use challenge.
    #[serde(rename = "Nonce")]
    pub nonce: String,
}

/// One outgoing request: ordered `key=value` form parameters.
///
/// Ordering is preserved from construction through encoding, so the wire
/// body is deterministic. `format=json` is appended by the executor, not
/// stored here.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    params: Vec<(String, String)>,
}

impl PendingCommand {
    pub fn new(action: &str) -> Self {
        Self {
            params: vec![(String::from("action"), String::from(action))],
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((String::from(key), value.into()));
        self
    }

    pub fn action(&self) -> &str {
        // Index 0 is always the action, see new()
        &self.params[0].1
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Status fetch. `long_poll` carries the negotiated hold duration;
    /// `None` requests an immediate snapshot.
    pub fn current_state(long_poll: Option<Duration>, last_event_id: i64) -> Self {
        let cmd = Self::new(ACTION_GET_STATE)
            .with("longpoll", if long_poll.is_some() { "true" } else { "false" })
            .with("lasteventid", last_event_id.to_string());

        match long_poll {
            Some(duration) => cmd.with("duration", humantime::format_duration(duration).to_string()),
            None => cmd,
        }
    }

    pub fn get_notifications() -> Self {
        Self::new(ACTION_GET_NOTIFICATIONS)
    }

    pub fn send_command(command: &str) -> Self {
        Self::new(ACTION_SEND_COMMAND).with("command", command)
    }

    pub fn dismiss_notification(id: i64) -> Self {
        Self::new(ACTION_DISMISS_NOTIFICATION).with("id", id.to_string())
    }
}
