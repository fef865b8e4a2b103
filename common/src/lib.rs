//! Shared primitives for the tray monitor.
//!
//! This crate contains small, dependency-light types used across the
//! workspace. Nothing here performs I/O or holds business logic.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location capture, HTTP status
//!   categorization, redacted secret handling
//! - **monitor-core**: the protocol engine operating on these types
//! - the tray application wires everything together
//!
//! This layered architecture keeps concerns separated and makes testing easier.

pub mod error;
pub mod http_status;
pub mod redacted_secret;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_secret::RedactedPassword;
