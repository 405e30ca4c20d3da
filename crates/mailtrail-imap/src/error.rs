//! Error types for the IMAP engine.
//!
//! Every failure belongs to one of four classes, reported by
//! [`Error::kind`]. A server `NO` is not an error at all: operations report
//! it as `false` (or `None`) because it is an expected negative outcome.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations, including a closed stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Malformed bytes in a server response.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Server returned BAD, tagged or untagged.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// A tagged completion arrived for a tag other than the pending one.
    #[error("Tag mismatch: expected {expected}, got {received}")]
    TagMismatch {
        /// Tag of the outstanding command.
        expected: String,
        /// Tag found on the wire.
        received: String,
    },

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A read did not complete within the configured timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A previous protocol error left the connection in an unknown state.
    #[error("Connection is unusable after a protocol error; reconnect")]
    Unusable,

    /// Mandatory TLS unavailable, unsupported mechanism, or similar.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed mailbox-name encoding or literal length.
    #[error("Decoding error: {0}")]
    Decoding(String),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed bytes, BAD status or tag correlation failure.
    Protocol,
    /// I/O failure, timeout or closed stream.
    Connection,
    /// Mandatory TLS unavailable or unsupported authentication mechanism.
    Configuration,
    /// Malformed mailbox-name encoding or literal length.
    Decoding,
}

impl Error {
    /// Returns the class this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. }
            | Self::Bad(_)
            | Self::TagMismatch { .. }
            | Self::Protocol(_)
            | Self::Unusable => ErrorKind::Protocol,
            Self::Io(_) | Self::Tls(_) | Self::Bye(_) | Self::Timeout(_) => ErrorKind::Connection,
            Self::Configuration(_) | Self::InvalidDnsName(_) => ErrorKind::Configuration,
            Self::Decoding(_) => ErrorKind::Decoding,
        }
    }

    /// Returns true if the connection must not be used for further commands.
    #[must_use]
    pub const fn poisons_connection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Protocol | ErrorKind::Connection)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::Bad("x".into()).kind(), ErrorKind::Protocol);
        assert_eq!(
            Error::TagMismatch {
                expected: "A1".into(),
                received: "A9".into()
            }
            .kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            Error::Io(std::io::Error::other("reset")).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            Error::Configuration("tls".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::Decoding("&".into()).kind(), ErrorKind::Decoding);
    }

    #[test]
    fn test_decoding_does_not_poison() {
        assert!(!Error::Decoding("bad".into()).poisons_connection());
        assert!(!Error::Configuration("bad".into()).poisons_connection());
        assert!(Error::Bad("bad".into()).poisons_connection());
    }

    #[test]
    fn test_display() {
        let err = Error::TagMismatch {
            expected: "A3".into(),
            received: "A2".into(),
        };
        assert_eq!(err.to_string(), "Tag mismatch: expected A3, got A2");
    }
}
