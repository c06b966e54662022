//! Turn a list of link specifiers into a single reachability record for a relay.
//!
//! This is used by the introduction-point parser: an `IntroductionPoint`
//! carries a bag of [`LinkSpec`] values, and before we can dial the relay we
//! need exactly one identity of each kind plus at least one usable address.

use std::net::SocketAddr;

use crate::{EncodedLinkSpec, LinkSpec, RelayIdType};
use itertools::Itertools as _;
use tor_llcrypto::pk::ed25519::Ed25519Identity;
use tor_llcrypto::pk::rsa::RsaIdentity;

/// A rule for how strictly to parse a list of [`LinkSpec`]s.
//
// For now, there is only one level of strictness, but it is all but certain
// that we will add more in the future.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum Strictness {
    /// Enforce the standard rules:
    ///
    ///   * There must be exactly one Ed25519 identity.
    ///   * There must be exactly one RSA identity.
    ///   * There must be at least one IPv4 address.
    Standard,
}

/// A relay's identities and known addresses, recovered from a list of link
/// specifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    /// The relay's Ed25519 identity.
    ed_identity: Ed25519Identity,
    /// The relay's RSA identity.
    rsa_identity: RsaIdentity,
    /// Addresses at which the relay can be reached.
    addrs: Vec<SocketAddr>,
}

impl RelayEndpoint {
    /// Construct a [`RelayEndpoint`] from a list of [`LinkSpec`], validating
    /// it according to a given level of [`Strictness`].
    pub fn from_linkspecs(
        strictness: Strictness,
        linkspecs: &[LinkSpec],
    ) -> Result<Self, LinkSpecDecodeError> {
        // We ignore the strictness for now, since there is only one variant.
        let _ = strictness;

        let ed_identity = linkspecs
            .iter()
            .filter_map(|ls| match ls {
                LinkSpec::Ed25519Id(ed) => Some(*ed),
                _ => None,
            })
            .exactly_one()
            .map_err(|mut e| match e.next() {
                Some(_) => LinkSpecDecodeError::DuplicatedId(RelayIdType::Ed25519),
                None => LinkSpecDecodeError::MissingId(RelayIdType::Ed25519),
            })?;

        let rsa_identity = linkspecs
            .iter()
            .filter_map(|ls| match ls {
                LinkSpec::RsaId(rsa) => Some(*rsa),
                _ => None,
            })
            .exactly_one()
            .map_err(|mut e| match e.next() {
                Some(_) => LinkSpecDecodeError::DuplicatedId(RelayIdType::Rsa),
                None => LinkSpecDecodeError::MissingId(RelayIdType::Rsa),
            })?;

        let addrs: Vec<SocketAddr> = linkspecs
            .iter()
            .filter_map(|ls| match ls {
                LinkSpec::OrPort(addr, port) => Some(SocketAddr::new(*addr, *port)),
                _ => None,
            })
            .collect();
        if !addrs.iter().any(SocketAddr::is_ipv4) {
            return Err(LinkSpecDecodeError::MissingAddr);
        }

        Ok(RelayEndpoint {
            ed_identity,
            rsa_identity,
            addrs,
        })
    }

    /// As `from_linkspecs`, but take a list of encoded linkspecs and fail if
    /// any are known to be ill-formed.
    pub fn from_encoded_linkspecs(
        strictness: Strictness,
        linkspecs: &[EncodedLinkSpec],
    ) -> Result<Self, LinkSpecDecodeError> {
        let decoded = linkspecs
            .iter()
            .map(|ls| ls.parse())
            .collect::<Result<Vec<_>, _>>()
            .map_err(LinkSpecDecodeError::MisformedLinkSpec)?;
        Self::from_linkspecs(strictness, &decoded)
    }

    /// Return the relay's Ed25519 identity.
    pub fn ed_identity(&self) -> &Ed25519Identity {
        &self.ed_identity
    }

    /// Return the relay's RSA identity.
    pub fn rsa_identity(&self) -> &RsaIdentity {
        &self.rsa_identity
    }

    /// Return the addresses at which the relay can be reached.
    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }
}

/// An error that occurred while recovering a [`RelayEndpoint`] from a set of
/// link specifiers.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LinkSpecDecodeError {
    /// A required identity key was missing.
    #[error("Missing a required {0} identity key")]
    MissingId(RelayIdType),
    /// A required identity key was included more than once.
    #[error("Duplicated a {0} identity key")]
    DuplicatedId(RelayIdType),
    /// A required address type was missing.
    #[error("Missing a required address type")]
    MissingAddr,
    /// Couldn't parse a provided linkspec of recognized type.
    #[error("Mis-formatted link specifier")]
    MisformedLinkSpec(#[source] tor_bytes::Error),
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn decode_ok() {
        let ls = vec![
            LinkSpec::OrPort("::1".parse().unwrap(), 99),
            LinkSpec::OrPort("127.0.0.1".parse().unwrap(), 11),
            LinkSpec::Ed25519Id([42; 32].into()),
            LinkSpec::RsaId([45; 20].into()),
        ];
        let ep = RelayEndpoint::from_linkspecs(Strictness::Standard, &ls).unwrap();
        assert_eq!(ep.ed_identity(), &Ed25519Identity::from([42; 32]));
        assert_eq!(ep.rsa_identity(), &RsaIdentity::from([45; 20]));
        assert_eq!(ep.addrs().len(), 2);
    }

    #[test]
    fn decode_errs() {
        use LinkSpecDecodeError as E;
        use RelayIdType as ID;

        let ipv4 = LinkSpec::OrPort("127.0.0.1".parse().unwrap(), 11);
        let ipv6 = LinkSpec::OrPort("::1".parse().unwrap(), 99);
        let ed = LinkSpec::Ed25519Id([42; 32].into());
        let rsa = LinkSpec::RsaId([45; 20].into());
        let err_from = |lst: &[&LinkSpec]| {
            RelayEndpoint::from_linkspecs(
                Strictness::Standard,
                &lst.iter().map(|ls| (*ls).clone()).collect::<Vec<_>>()[..],
            )
            .err()
        };

        assert!(err_from(&[&ipv4, &ipv6, &ed, &rsa]).is_none());
        assert!(err_from(&[&ipv4, &ed, &rsa]).is_none());
        assert!(matches!(
            err_from(&[&ipv4, &ed, &ed, &rsa]),
            Some(E::DuplicatedId(ID::Ed25519))
        ));
        assert!(matches!(
            err_from(&[&ipv4, &ed, &rsa, &rsa]),
            Some(E::DuplicatedId(ID::Rsa))
        ));
        assert!(matches!(
            err_from(&[&ipv4, &rsa]),
            Some(E::MissingId(ID::Ed25519))
        ));
        assert!(matches!(err_from(&[&ipv4, &ed]), Some(E::MissingId(ID::Rsa))));
        assert!(matches!(err_from(&[&ipv6, &ed, &rsa]), Some(E::MissingAddr)));
    }
}
