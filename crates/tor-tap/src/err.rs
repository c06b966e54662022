//! Error types for the TAP handshake.

use tor_error::{ErrorKind, HasKind};

/// An error produced by a TAP handshake.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The onion skin or reply was the wrong length, or couldn't be
    /// decrypted with any available key.
    #[error("malformed TAP handshake message")]
    BadHandshake,

    /// The reply's digest tag didn't match the locally computed one.
    #[error("TAP handshake digest mismatch")]
    BadDigest,

    /// An underlying RSA or symmetric-cipher operation failed.
    #[error("cryptographic failure in TAP handshake")]
    CryptoError,

    /// The RNG failed to produce randomness.
    #[error("could not generate randomness for TAP handshake")]
    RandomError,
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::BadHandshake | Error::BadDigest => ErrorKind::TorProtocolViolation,
            Error::CryptoError => ErrorKind::Internal,
            Error::RandomError => ErrorKind::Internal,
        }
    }
}
