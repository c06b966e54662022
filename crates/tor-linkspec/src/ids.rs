//! Relay identities: a relay is addressed by one or more identity keys of
//! different types, and link specifiers (see [`crate::ls`]) need to convert
//! between the owned and borrowed forms of those identities freely.

use derive_more::{Display, From};
use tor_llcrypto::pk::{ed25519::Ed25519Identity, rsa::RsaIdentity};

/// Which kind of identity a [`RelayId`] or [`RelayIdRef`] carries.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Display, strum::EnumIter)]
#[non_exhaustive]
pub enum RelayIdType {
    /// The relay's Ed25519 identity key, taken directly.
    #[display(fmt = "Ed25519")]
    Ed25519,
    /// The SHA-1 digest of the DER encoding of the relay's RSA-1024 identity
    /// key. Short enough that it shouldn't be trusted alone.
    #[display(fmt = "RSA (legacy)")]
    Rsa,
}

impl RelayIdType {
    /// Iterate over every identity type this workspace knows about.
    pub fn all_types() -> RelayIdTypeIter {
        use strum::IntoEnumIterator;
        Self::iter()
    }
}

/// An owned relay identity of one kind or another.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, From)]
#[non_exhaustive]
pub enum RelayId {
    /// An Ed25519 identity.
    #[display(fmt = "{}", _0)]
    Ed25519(Ed25519Identity),
    /// A legacy RSA identity.
    #[display(fmt = "{}", _0)]
    Rsa(RsaIdentity),
}

impl RelayId {
    /// Borrow the contents of this identity as a [`RelayIdRef`].
    pub fn as_ref(&self) -> RelayIdRef<'_> {
        match self {
            RelayId::Ed25519(key) => RelayIdRef::Ed25519(key),
            RelayId::Rsa(key) => RelayIdRef::Rsa(key),
        }
    }
}

/// A borrowed relay identity of one kind or another.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, From, derive_more::TryInto)]
#[non_exhaustive]
pub enum RelayIdRef<'a> {
    /// An Ed25519 identity.
    #[display(fmt = "{}", _0)]
    Ed25519(&'a Ed25519Identity),
    /// A legacy RSA identity.
    #[display(fmt = "{}", _0)]
    Rsa(&'a RsaIdentity),
}

impl RelayIdRef<'_> {
    /// Clone the referenced key out into an owned [`RelayId`].
    pub fn to_owned_id(&self) -> RelayId {
        match *self {
            RelayIdRef::Ed25519(key) => RelayId::Ed25519(*key),
            RelayIdRef::Rsa(key) => RelayId::Rsa(*key),
        }
    }
}

impl PartialEq<Ed25519Identity> for RelayIdRef<'_> {
    fn eq(&self, other: &Ed25519Identity) -> bool {
        matches!(self, RelayIdRef::Ed25519(this) if *this == other)
    }
}
impl PartialEq<Ed25519Identity> for RelayId {
    fn eq(&self, other: &Ed25519Identity) -> bool {
        matches!(self, RelayId::Ed25519(this) if this == other)
    }
}
impl PartialEq<RsaIdentity> for RelayIdRef<'_> {
    fn eq(&self, other: &RsaIdentity) -> bool {
        matches!(self, RelayIdRef::Rsa(this) if *this == other)
    }
}
impl PartialEq<RsaIdentity> for RelayId {
    fn eq(&self, other: &RsaIdentity) -> bool {
        matches!(self, RelayId::Rsa(this) if this == other)
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn ref_round_trips_to_owned() {
        let id = RelayId::Ed25519(Ed25519Identity::from([1u8; 32]));
        assert_eq!(id.as_ref().to_owned_id(), id);
    }

    #[test]
    fn all_types_covers_both_variants() {
        let types: Vec<_> = RelayIdType::all_types().collect();
        assert_eq!(types, vec![RelayIdType::Ed25519, RelayIdType::Rsa]);
    }
}
