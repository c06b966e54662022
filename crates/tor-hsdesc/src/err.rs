//! Error types for onion service descriptor parsing and encryption.

use tor_error::{ErrorKind, HasKind};

/// An error encountered while parsing the text layout of a descriptor or
/// one of its embedded objects.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A required token was missing, out of order, or duplicated.
    #[error("missing or misplaced token {0:?}")]
    MissingToken(&'static str),
    /// A token's arguments did not match the expected grammar.
    #[error("malformed arguments to token {0:?}")]
    BadArguments(&'static str),
    /// A PEM-armored object could not be decoded.
    #[error("malformed object: {0}")]
    BadObject(String),
    /// A link specifier list used an unrecognized link specifier type.
    #[error("unrecognized or malformed link specifier")]
    BadLinkSpec,
    /// A length-prefixed field overran or underran the data available.
    #[error("length-prefixed field did not fit its container")]
    Truncated,
    /// The document exceeded `HS_DESC_MAX_LEN`.
    #[error("document exceeds the maximum length for an onion service descriptor")]
    TooLarge,
    /// Something in the document was not valid UTF-8.
    #[error("document was not valid UTF-8")]
    BadUtf8,
}

/// An error encountered while verifying a signature or a MAC.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CryptoError {
    /// The certificate embedded in the descriptor did not verify.
    #[error("certificate failed to validate: {0}")]
    BadCert(#[from] tor_cert::CertError),
    /// The outer or inner Ed25519 signature did not verify.
    #[error("signature did not verify")]
    BadSignature,
    /// The MAC over the encrypted blob did not match.
    #[error("MAC did not verify; wrong key or corrupted descriptor")]
    BadMac,
    /// The ciphertext length was inconsistent with the padding invariant.
    #[error("encrypted blob had an invalid length")]
    BadCiphertextLen,
}

/// An error that can occur while decoding a complete onion service
/// descriptor.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The envelope (outer, signed document) was malformed or failed to
    /// validate. The whole descriptor is unusable.
    #[error("envelope error: {0}")]
    Envelope(#[source] EnvelopeError),
    /// The encrypted layer failed to decrypt or the inner document was
    /// unparsable. The whole descriptor is unusable.
    #[error("encrypted layer error: {0}")]
    Encrypted(#[source] EncryptedLayerError),
}

/// A failure in the outer, plaintext-signed envelope.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EnvelopeError {
    /// The envelope could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A cryptographic check on the envelope failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The descriptor declared a version we don't support.
    #[error("unsupported descriptor version")]
    UnsupportedVersion,
    /// The descriptor's lifetime field was out of the sane range.
    #[error("descriptor lifetime out of range")]
    BadLifetime,
}

/// A failure while decrypting or parsing the encrypted inner layer.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EncryptedLayerError {
    /// The encrypted blob failed to decrypt (bad MAC or bad length).
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The decrypted plaintext could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Envelope(EnvelopeError::Crypto(_)) => ErrorKind::TorProtocolViolation,
            Error::Envelope(_) => ErrorKind::TorProtocolViolation,
            Error::Encrypted(EncryptedLayerError::Crypto(_)) => {
                ErrorKind::OnionServiceProtocolViolation
            }
            Error::Encrypted(_) => ErrorKind::OnionServiceProtocolViolation,
        }
    }
}
