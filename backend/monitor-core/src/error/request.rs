//! Error types for the request/auth layer.
//!
//! Key design decisions:
//! - HTTP status codes stored directly (not parsed from strings)
//! - transport failures keep their timeout/connection flags
//! - all errors include ErrorLocation for debugging
//! - `#[track_caller]` for automatic location capture

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

/// Errors surfaced by the request executor and the login handshake.
#[derive(Debug, ThisError)]
pub enum RequestError {
    /// Transport-level failure: connection refused, DNS, timeout.
    #[error("Network Error: {message} {location}")]
    Network {
        message: String,
        is_timeout: bool,
        is_connection: bool,
        location: ErrorLocation,
    },

    /// 401 after the single re-authentication retry, or a failed handshake.
    #[error("Authentication Error: {message} {location}")]
    Auth {
        message: String,
        location: ErrorLocation,
    },

    /// Malformed response body or a missing expected cookie.
    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    /// Any other non-success HTTP status; propagated without retry.
    #[error("HTTP Error: {status} - {message} {location}")]
    Http {
        status: HttpStatusCode,
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },
}

impl RequestError {
    #[track_caller]
    pub(crate) fn auth(message: impl Into<String>) -> Self {
        RequestError::Auth {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        RequestError::Protocol {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for RequestError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        RequestError::Network {
            message: error.to_string(),
            is_timeout: error.is_timeout(),
            is_connection: error.is_connect(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for RequestError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        RequestError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for RequestError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        RequestError::Protocol {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
