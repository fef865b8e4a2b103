//! Protocol engine for the backup server tray monitor.
//!
//! Maintains a live snapshot of a remote control server's state over HTTP
//! long-polling, relays user commands through a serialized dispatch queue,
//! and performs the salted challenge-response login handshake. The tray
//! surface (icon, menus) consumes this crate through
//! [`connection::ServerConnection`].

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod request;
pub mod wire;

mod dispatcher;
mod poller;

#[cfg(test)]
mod tests;

pub use connection::{ServerConnection, ShutdownReport};

/// Control endpoint, relative to the configured base URL.
pub const CONTROL_SCRIPT: &str = "control.cgi";

/// Login endpoint, relative to the configured base URL.
pub const LOGIN_SCRIPT: &str = "login.cgi";

/// Status page the tray opens in a browser.
pub const STATUS_WINDOW: &str = "index.html";

/// Configuration-edit page the tray opens in a browser.
pub const EDIT_WINDOW: &str = "edit-window.html";

/// Cookie carrying the session token on authenticated requests.
pub const AUTH_COOKIE: &str = "session-auth";

/// Cookie carrying the login nonce back to the server during the handshake.
pub const NONCE_COOKIE: &str = "session-nonce";

/// User-Agent sent on every request.
pub const MONITOR_USER_AGENT: &str =
    const_format::concatcp!("TrayMonitor/", env!("CARGO_PKG_VERSION"));
