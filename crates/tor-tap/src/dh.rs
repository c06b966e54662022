//! Diffie-Hellman over the well-known 1024-bit "circuit" group.
//!
//! This is RFC 2409's Second Oakley Group: a safe prime with generator 2,
//! chosen for the TAP handshake because every relay already has it
//! hardcoded. It has nowhere near the security margin a new design would
//! want; it's implemented here only for wire compatibility.

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// Length in bytes of a DH1024 public value or private exponent.
pub const DH1024_LEN: usize = 128;

/// The RFC 2409 Second Oakley Group prime, big-endian.
#[rustfmt::skip]
const OAKLEY_GROUP2_PRIME: [u8; DH1024_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xC9, 0x0F, 0xDA, 0xA2, 0x21, 0x68, 0xC2, 0x34,
    0xC4, 0xC6, 0x62, 0x8B, 0x80, 0xDC, 0x1C, 0xD1, 0x29, 0x02, 0x4E, 0x08, 0x8A, 0x67, 0xCC, 0x74,
    0x02, 0x0B, 0xBE, 0xA6, 0x3B, 0x13, 0x9B, 0x22, 0x51, 0x4A, 0x08, 0x79, 0x8E, 0x34, 0x04, 0xDD,
    0xEF, 0x95, 0x19, 0xB3, 0xCD, 0x3A, 0x43, 0x1B, 0x30, 0x2B, 0x0A, 0x6D, 0xF2, 0x5F, 0x14, 0x37,
    0x4F, 0xE1, 0x35, 0x6D, 0x6D, 0x51, 0xC2, 0x45, 0xE4, 0x85, 0xB5, 0x76, 0x62, 0x5E, 0x7E, 0xC6,
    0xF4, 0x4C, 0x42, 0xE9, 0xA6, 0x37, 0xED, 0x6B, 0x0B, 0xFF, 0x5C, 0xB6, 0xF4, 0x06, 0xB7, 0xED,
    0xEE, 0x38, 0x6B, 0xFB, 0x5A, 0x89, 0x9F, 0xA5, 0xAE, 0x9F, 0x24, 0x11, 0x7C, 0x4B, 0x1F, 0xE6,
    0x49, 0x28, 0x66, 0x51, 0xEC, 0xE4, 0x5B, 0x3D, 0xC2, 0x00, 0x7C, 0xB8, 0xA1, 0x63, 0xBF, 0x05,
];

/// The generator for the circuit DH group.
const GENERATOR: u64 = 2;

/// A Diffie-Hellman keypair for one handshake.
///
/// The private exponent is held only long enough to compute a shared
/// secret; callers should drop a `Keypair` as soon as the handshake
/// finishes.
pub struct Keypair {
    /// Private exponent `x`. `num_bigint::BigUint` doesn't implement
    /// `Zeroize`, so this can't be wiped on drop; the handshake functions
    /// that consume a `Keypair` are responsible for zeroising the derived
    /// key material they actually hand to callers.
    private: BigUint,
    /// Public value `g^x mod p`.
    public: [u8; DH1024_LEN],
}

impl Keypair {
    /// Generate a fresh keypair using `rng`.
    pub fn generate<R: RngCore + CryptoRng>(mut rng: R) -> Self {
        let p = prime();
        // A private exponent the same size as the prime gives a
        // comfortable margin against small-subgroup attacks, at the cost
        // of being larger than strictly necessary; this matches the
        // original implementation's choice to use a full-width exponent.
        let mut bytes = [0u8; DH1024_LEN];
        rng.fill_bytes(&mut bytes);
        let private = BigUint::from_bytes_be(&bytes) % &p;
        let public = BigUint::from(GENERATOR).modpow(&private, &p);
        Keypair {
            private,
            public: to_fixed_bytes(&public),
        }
    }

    /// This keypair's public value, as the 128-byte big-endian encoding the
    /// wire format uses.
    pub fn public(&self) -> &[u8; DH1024_LEN] {
        &self.public
    }

    /// Compute the shared secret `g^{xy} mod p`, given the peer's public
    /// value.
    pub fn shared_secret(&self, peer_public: &[u8]) -> Zeroizing<[u8; DH1024_LEN]> {
        let p = prime();
        let peer = BigUint::from_bytes_be(peer_public);
        let shared = peer.modpow(&self.private, &p);
        Zeroizing::new(to_fixed_bytes(&shared))
    }
}

/// Return the DH1024 group prime.
fn prime() -> BigUint {
    BigUint::from_bytes_be(&OAKLEY_GROUP2_PRIME)
}

/// Encode `n` as a fixed-size, big-endian, zero-padded byte array.
fn to_fixed_bytes(n: &BigUint) -> [u8; DH1024_LEN] {
    let be = n.to_bytes_be();
    let mut out = [0u8; DH1024_LEN];
    let start = DH1024_LEN - be.len();
    out[start..].copy_from_slice(&be);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn shared_secrets_match() {
        let a = Keypair::generate(OsRng);
        let b = Keypair::generate(OsRng);
        let sa = a.shared_secret(b.public());
        let sb = b.shared_secret(a.public());
        assert_eq!(&sa[..], &sb[..]);
    }

    #[test]
    fn public_values_differ() {
        let a = Keypair::generate(OsRng);
        let b = Keypair::generate(OsRng);
        assert_ne!(a.public(), b.public());
    }
}
