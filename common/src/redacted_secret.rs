//! Secure password handling with redacted Debug output.

use crate::{ErrorLocation, RedactError};

use std::fmt;
use std::panic::Location;

use serde::ser::Error;
use zeroize::Zeroize;

/// A server password (or pre-salted password hash) that never exposes its
/// value in logs or debug output.
///
/// The credential lives only for the process lifetime; it is zeroized on
/// drop and refuses serialization, so it cannot end up in a config file.
#[derive(Clone)]
pub struct RedactedPassword {
    inner: String,
}

impl RedactedPassword {
    /// Create a new redacted password.
    pub fn new(secret: String) -> Self {
        Self { inner: secret }
    }

    /// Get the actual secret for hash derivation.
    ///
    /// # Security Note
    /// Only call this when feeding the login hash computation.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Get the secret length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the secret is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedPassword([REDACTED])")
    }
}

impl fmt::Display for RedactedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED PASSWORD]")
    }
}

impl Drop for RedactedPassword {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Prevent accidental serialization
impl serde::Serialize for RedactedPassword {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(RedactError::Serialization {
            message: String::from(
                "RedactedPassword cannot be serialized - use as_str() explicitly",
            ),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
