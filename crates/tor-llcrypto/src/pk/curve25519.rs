//! Curve25519 Diffie-Hellman key material, wrapped around
//! [`x25519_dalek`] so the rest of this workspace never needs to name that
//! crate directly.
//!
//! *TODO*: Eventually we should probably recommend using this code via some
//! key-agreement trait, but for now we are just reusing the APIs from
//! `x25519_dalek`.

use educe::Educe;
use subtle::ConstantTimeEq;

use crate::util::rng::RngCompat;

/// A keypair containing a [`StaticSecret`] and its corresponding public key.
#[allow(clippy::exhaustive_structs)]
#[derive(Clone, Educe)]
#[educe(Debug)]
pub struct StaticKeypair {
    /// The secret part of the key.
    #[educe(Debug(ignore))]
    pub secret: StaticSecret,
    /// The public part of this key.
    pub public: PublicKey,
}

/// A secret key usable for exactly one Diffie-Hellman exchange, and that
/// can never be inspected afterward.
///
/// See [`x25519_dalek::EphemeralSecret`] for more information.
pub struct EphemeralSecret(x25519_dalek::EphemeralSecret);

/// A secret key that can be reused across handshakes, and whose value can
/// be inspected.
///
/// See [`x25519_dalek::StaticSecret`] for more information.
//
// We may eventually want to expose ReusableSecret instead of StaticSecret
// for places that reuse a secret within one handshake but don't need it to
// persist; the trouble is that ReusableSecret is awkward to construct for
// tests.
#[derive(Clone)]
pub struct StaticSecret(x25519_dalek::StaticSecret);

impl ConstantTimeEq for StaticSecret {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.as_bytes().ct_eq(other.0.as_bytes())
    }
}

/// A curve25519 public key.
///
/// See [`x25519_dalek::PublicKey`] for more information.
#[derive(Clone, Copy, Debug, Eq)]
pub struct PublicKey(x25519_dalek::PublicKey);

impl ConstantTimeEq for PublicKey {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.as_bytes().ct_eq(other.0.as_bytes())
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

/// The shared secret two parties negotiate over curve25519.
///
/// See [`x25519_dalek::SharedSecret`] for more information.
pub struct SharedSecret(x25519_dalek::SharedSecret);

impl<'a> From<&'a EphemeralSecret> for PublicKey {
    fn from(secret: &'a EphemeralSecret) -> Self {
        Self((&secret.0).into())
    }
}

impl<'a> From<&'a StaticSecret> for PublicKey {
    fn from(secret: &'a StaticSecret) -> Self {
        Self((&secret.0).into())
    }
}

impl From<[u8; 32]> for StaticSecret {
    fn from(value: [u8; 32]) -> Self {
        Self(value.into())
    }
}
impl From<[u8; 32]> for PublicKey {
    fn from(value: [u8; 32]) -> Self {
        Self(value.into())
    }
}

impl EphemeralSecret {
    /// Generate a fresh ephemeral secret from `csprng`.
    pub fn random_from_rng<R: rand_core::RngCore + rand_core::CryptoRng>(csprng: R) -> Self {
        Self(x25519_dalek::EphemeralSecret::random_from_rng(
            RngCompat::new(csprng),
        ))
    }
    /// Run a Diffie-Hellman exchange against `their_public`, consuming this key.
    pub fn diffie_hellman(self, their_public: &PublicKey) -> SharedSecret {
        SharedSecret(self.0.diffie_hellman(&their_public.0))
    }
}

impl StaticSecret {
    /// Generate a fresh static secret from `csprng`.
    pub fn random_from_rng<R: rand_core::RngCore + rand_core::CryptoRng>(csprng: R) -> Self {
        Self(x25519_dalek::StaticSecret::random_from_rng(RngCompat::new(
            csprng,
        )))
    }
    /// Run a Diffie-Hellman exchange against `their_public`.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        SharedSecret(self.0.diffie_hellman(&their_public.0))
    }
    /// Return the raw bytes of this key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
    /// Borrow the raw bytes of this key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl SharedSecret {
    /// Return the negotiated secret as raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
    /// Whether both parties' keys actually contributed to this secret.
    ///
    /// See [`x25519_dalek::SharedSecret::was_contributory`] for more information.
    pub fn was_contributory(&self) -> bool {
        self.0.was_contributory()
    }
}

impl PublicKey {
    /// Borrow this key's raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
    /// Copy this key's raw bytes out.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}
