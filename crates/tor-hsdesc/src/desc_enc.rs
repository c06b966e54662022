//! Key derivation, encryption, and MAC checking for the superencrypted
//! layer of an onion service descriptor.

use cipher::{KeyIvInit, StreamCipher};
use digest::{ExtendableOutput, Update, XofReader};
use subtle::ConstantTimeEq;
use tor_llcrypto::cipher::aes::Aes256Ctr;
use tor_llcrypto::d::{Sha3_256, Shake256};
use tor_llcrypto::pk::ed25519::Ed25519Identity;
use zeroize::Zeroizing;

use crate::err::CryptoError;

/// Length of the random salt prepended to an encrypted blob.
pub(crate) const SALT_LEN: usize = 16;
/// Length of the MAC appended to an encrypted blob.
pub(crate) const MAC_LEN: usize = 32;
/// Plaintext must be padded so that the encrypted field's length is always
/// a multiple of this many bytes.
pub const HS_DESC_PLAINTEXT_PADDING_MULTIPLE: usize = 10_000;

/// The symmetric keys derived for one layer of descriptor encryption.
struct LayerKeys {
    /// AES-256-CTR key.
    k_enc: Zeroizing<[u8; 32]>,
    /// SHA3-256-keyed MAC key.
    k_mac: Zeroizing<[u8; 32]>,
}

/// Derive `(k_enc, k_mac)` from `salt`, the descriptor's blinded signing
/// key, and its subcredential, using a SHAKE256 expansion.
///
/// This plays the role of an HKDF: the blinded key and subcredential are
/// the secret input keying material, and `salt` both randomizes the
/// encryption and is mixed in as context for the expansion.
fn derive_keys(blinded_signing_key: &Ed25519Identity, subcredential: &[u8; 32], salt: &[u8]) -> LayerKeys {
    let mut xof = Shake256::default();
    xof.update(blinded_signing_key.as_bytes());
    xof.update(subcredential);
    xof.update(salt);
    xof.update(b"tor-hsdesc-encryption-keys");
    let mut reader = xof.finalize_xof();
    let mut k_enc = Zeroizing::new([0u8; 32]);
    let mut k_mac = Zeroizing::new([0u8; 32]);
    reader.read(&mut k_enc[..]);
    reader.read(&mut k_mac[..]);
    LayerKeys { k_enc, k_mac }
}

/// Compute the keyed MAC over `salt ‖ ciphertext`.
fn compute_mac(k_mac: &[u8; 32], salt: &[u8], ciphertext: &[u8]) -> [u8; 32] {
    use digest::Digest;
    let mut h = Sha3_256::new();
    h.update(k_mac);
    h.update(salt);
    h.update(ciphertext);
    h.finalize().into()
}

/// Pad `plaintext` with zero bytes to the next multiple of
/// [`HS_DESC_PLAINTEXT_PADDING_MULTIPLE`].
pub(crate) fn pad_plaintext(mut plaintext: Vec<u8>) -> Vec<u8> {
    let target = pad_plaintext_len(plaintext.len());
    plaintext.resize(target, 0);
    plaintext
}

/// Return the padded length that [`pad_plaintext`] would produce for an
/// unpadded length of `p`.
pub fn pad_plaintext_len(p: usize) -> usize {
    p.div_ceil(HS_DESC_PLAINTEXT_PADDING_MULTIPLE) * HS_DESC_PLAINTEXT_PADDING_MULTIPLE
}

/// Encrypt `padded_plaintext` under keys derived from `blinded_signing_key`
/// and `subcredential`, using a freshly generated salt, and return
/// `salt ‖ ciphertext ‖ mac`.
pub(crate) fn encrypt(
    blinded_signing_key: &Ed25519Identity,
    subcredential: &[u8; 32],
    padded_plaintext: &[u8],
    salt: [u8; SALT_LEN],
) -> Vec<u8> {
    let keys = derive_keys(blinded_signing_key, subcredential, &salt);
    let mut ciphertext = padded_plaintext.to_vec();
    let mut cipher = Aes256Ctr::new((&*keys.k_enc).into(), &[0u8; 16].into());
    cipher.apply_keystream(&mut ciphertext);
    let mac = compute_mac(&keys.k_mac, &salt, &ciphertext);

    let mut out = Vec::with_capacity(SALT_LEN + ciphertext.len() + MAC_LEN);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&mac);
    out
}

/// Reverse [`encrypt`]: split `blob` into `salt ‖ ciphertext ‖ mac`, verify
/// the MAC, and decrypt in place.
pub(crate) fn decrypt(
    blinded_signing_key: &Ed25519Identity,
    subcredential: &[u8; 32],
    blob: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < SALT_LEN + MAC_LEN {
        return Err(CryptoError::BadCiphertextLen);
    }
    let payload_len = blob.len() - SALT_LEN - MAC_LEN;
    if payload_len % HS_DESC_PLAINTEXT_PADDING_MULTIPLE != 0 {
        return Err(CryptoError::BadCiphertextLen);
    }
    let salt: [u8; SALT_LEN] = blob[..SALT_LEN].try_into().expect("checked length above");
    let ciphertext = &blob[SALT_LEN..SALT_LEN + payload_len];
    let tag = &blob[SALT_LEN + payload_len..];

    let keys = derive_keys(blinded_signing_key, subcredential, &salt);
    let expected = compute_mac(&keys.k_mac, &salt, ciphertext);
    if expected.ct_eq(tag).unwrap_u8() != 1 {
        return Err(CryptoError::BadMac);
    }

    let mut plaintext = ciphertext.to_vec();
    let mut cipher = Aes256Ctr::new((&*keys.k_enc).into(), &[0u8; 16].into());
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn pad_len_invariants() {
        assert_eq!(pad_plaintext_len(0), 0);
        assert_eq!(pad_plaintext_len(1), 10_000);
        assert_eq!(pad_plaintext_len(10_000), 10_000);
        assert_eq!(pad_plaintext_len(10_001), 20_000);
    }

    #[test]
    fn round_trips() {
        let blinded = Ed25519Identity::from([7u8; 32]);
        let subcred = [9u8; 32];
        let plaintext = pad_plaintext(b"hello world".to_vec());
        let blob = encrypt(&blinded, &subcred, &plaintext, [1u8; SALT_LEN]);
        let decoded = decrypt(&blinded, &subcred, &blob).unwrap();
        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn wrong_key_fails_mac() {
        let blinded = Ed25519Identity::from([7u8; 32]);
        let other = Ed25519Identity::from([8u8; 32]);
        let subcred = [9u8; 32];
        let plaintext = pad_plaintext(b"hello world".to_vec());
        let blob = encrypt(&blinded, &subcred, &plaintext, [1u8; SALT_LEN]);
        assert!(matches!(
            decrypt(&other, &subcred, &blob),
            Err(CryptoError::BadMac)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_mac() {
        let blinded = Ed25519Identity::from([7u8; 32]);
        let subcred = [9u8; 32];
        let plaintext = pad_plaintext(b"hello world".to_vec());
        let mut blob = encrypt(&blinded, &subcred, &plaintext, [1u8; SALT_LEN]);
        let i = SALT_LEN + 2;
        blob[i] ^= 1;
        assert!(matches!(
            decrypt(&blinded, &subcred, &blob),
            Err(CryptoError::BadMac)
        ));
    }

    #[test]
    fn bad_padding_length_rejected() {
        let blinded = Ed25519Identity::from([7u8; 32]);
        let subcred = [9u8; 32];
        let blob = vec![0u8; SALT_LEN + MAC_LEN + 7];
        assert!(matches!(
            decrypt(&blinded, &subcred, &blob),
            Err(CryptoError::BadCiphertextLen)
        ));
    }
}
