//! Error types for the KIST scheduler.

use tor_error::{ErrorKind, HasKind};

/// An error produced while configuring or driving a [`crate::KistScheduler`].
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A configured tunable was out of its allowed range.
    #[error("invalid KIST configuration: {0}")]
    InvalidConfig(String),
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}
