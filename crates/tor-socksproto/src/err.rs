//! Error types for SOCKS request parsing.

use tor_error::{ErrorKind, HasKind};

/// An error that occurred while parsing or validating a SOCKS handshake.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The client's message did not look like a SOCKS request at all; it
    /// looks like the start of an HTTP request. `reply` holds the
    /// "not an HTTP proxy" diagnostic that should be sent back verbatim
    /// before the connection is closed.
    #[error("not a SOCKS request; looks like HTTP")]
    WrongProtocol {
        /// The diagnostic reply to send back to the peer.
        reply: Vec<u8>,
    },

    /// The client's message was malformed SOCKS.
    #[error("malformed SOCKS message: {0}")]
    Malformed(&'static str),

    /// The request was well-formed, but policy forbids it: the client
    /// supplied a literal IP address (rather than a hostname) under
    /// `safe_socks`, or the greeting offered no method we both support.
    /// `reply`, if non-empty, must be sent back before closing.
    #[error("rejected by SOCKS safety policy: {reason}")]
    UnsafeSocks {
        /// The rejection reply to send back to the peer, if any.
        reply: Vec<u8>,
        /// A short, human-readable reason for the rejection.
        reason: &'static str,
    },

    /// An underlying `tor-bytes` decode failure.
    #[error("malformed SOCKS field")]
    Bytes(#[from] tor_bytes::Error),
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::WrongProtocol { .. } | Error::Malformed(_) | Error::Bytes(_) => {
                ErrorKind::LocalProtocolViolation
            }
            Error::UnsafeSocks { .. } => ErrorKind::ForbiddenStreamTarget,
        }
    }
}
