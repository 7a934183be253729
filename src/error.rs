//! Error types for gametux-link.

use std::time::Duration;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Service directory (mDNS) error.
    #[error("Service directory error: {0}")]
    Directory(String),

    /// An operation did not complete in time.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        /// What was being waited on.
        operation: &'static str,
        /// The timeout that elapsed.
        elapsed: Duration,
    },

    /// The peer closed the connection before sending a line.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// A line exceeded the configured maximum length.
    #[error("Line exceeds {max} bytes")]
    LineTooLong {
        /// The configured limit.
        max: usize,
    },

    /// A message cannot be framed as a single line.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl Error {
    /// Create a service directory error.
    pub fn directory<S: Into<String>>(msg: S) -> Self {
        Self::Directory(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(operation: &'static str, elapsed: Duration) -> Self {
        Self::Timeout { operation, elapsed }
    }
}

impl From<mdns_sd::Error> for Error {
    fn from(e: mdns_sd::Error) -> Self {
        Self::Directory(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_operation() {
        let err = Error::timeout("signaling response", Duration::from_secs(2));
        assert_eq!(err.to_string(), "signaling response timed out after 2s");
    }
}
