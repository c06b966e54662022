//! The TAP onion-skin handshake itself: create, server-side completion, and
//! client-side completion.

use cipher::generic_array::GenericArray;
use cipher::{KeyIvInit, StreamCipher};
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use tor_llcrypto::cipher::aes::Aes128Ctr;
use tor_llcrypto::pk::rsa::{PrivateKey, PublicKey};
use zeroize::Zeroizing;

use crate::dh::{Keypair, DH1024_LEN};
use crate::err::Error;
use crate::kdf::{self, DIGEST_LEN};

/// Build the AES-128-CTR cipher TAP uses to cover the part of `g^x` that
/// doesn't fit in the RSA-OAEP block. Keyed with `k_sym`, zero IV (TAP
/// never reuses a `K_sym` to encrypt more than one message).
fn tap_cipher(k_sym: &[u8; KSYM_LEN]) -> Aes128Ctr {
    let key = GenericArray::from_slice(k_sym);
    let iv = GenericArray::default();
    Aes128Ctr::new(key, &iv)
}

/// Size of the RSA-OAEP block within an onion skin.
const RSA_BLOCK_LEN: usize = 128;
/// Size of the fresh symmetric key carried inside the RSA-OAEP block.
const KSYM_LEN: usize = 16;
/// How much of `g^x` fits in the RSA-OAEP block alongside `K_sym`.
///
/// A 1024-bit RSA-OAEP block using SHA-1 (20-byte digest) can carry
/// `128 - 2*20 - 2 = 86` bytes of plaintext; 16 of those are `K_sym`,
/// leaving 70 for the first part of `g^x`.
const GX_PART1_LEN: usize = 70;
/// The remainder of `g^x`, sent AES-encrypted after the RSA block.
const GX_PART2_LEN: usize = DH1024_LEN - GX_PART1_LEN;

/// Total length of an onion skin (the client's initial handshake message).
pub const ONIONSKIN_CHALLENGE_LEN: usize = RSA_BLOCK_LEN + GX_PART2_LEN;
/// Total length of a handshake reply (the relay's response).
pub const ONIONSKIN_REPLY_LEN: usize = DH1024_LEN + DIGEST_LEN;

/// State retained by a client between emitting an onion skin and receiving
/// the relay's reply.
pub struct ClientHandshake {
    /// This handshake's DH keypair.
    keypair: Keypair,
}

/// Build an onion skin directed at `dest_router_key`, and the state needed
/// to complete the handshake once a reply arrives.
pub fn client_create<R: RngCore + CryptoRng>(
    mut rng: R,
    dest_router_key: &PublicKey,
) -> Result<(ClientHandshake, [u8; ONIONSKIN_CHALLENGE_LEN]), Error> {
    let keypair = Keypair::generate(&mut rng);
    let gx = *keypair.public();

    let mut k_sym = Zeroizing::new([0u8; KSYM_LEN]);
    rng.fill_bytes(&mut *k_sym);

    let mut rsa_plaintext = Zeroizing::new([0u8; KSYM_LEN + GX_PART1_LEN]);
    rsa_plaintext[..KSYM_LEN].copy_from_slice(&*k_sym);
    rsa_plaintext[KSYM_LEN..].copy_from_slice(&gx[..GX_PART1_LEN]);

    let rsa_block = dest_router_key
        .encrypt_oaep(&mut rng, &*rsa_plaintext)
        .map_err(|_| Error::CryptoError)?;
    if rsa_block.len() != RSA_BLOCK_LEN {
        return Err(Error::CryptoError);
    }

    let mut gx_part2 = gx[GX_PART1_LEN..].to_vec();
    tap_cipher(&k_sym).apply_keystream(&mut gx_part2);

    let mut skin = [0u8; ONIONSKIN_CHALLENGE_LEN];
    skin[..RSA_BLOCK_LEN].copy_from_slice(&rsa_block);
    skin[RSA_BLOCK_LEN..].copy_from_slice(&gx_part2);

    Ok((ClientHandshake { keypair }, skin))
}

/// Complete a handshake on the relay side: decrypt `onion_skin` (trying
/// `private_key` and, if that fails, `prev_private_key`), and produce a
/// reply plus `key_out_len` bytes of derived key material.
pub fn server_handshake(
    onion_skin: &[u8; ONIONSKIN_CHALLENGE_LEN],
    private_key: &PrivateKey,
    prev_private_key: Option<&PrivateKey>,
    key_out_len: usize,
) -> Result<([u8; ONIONSKIN_REPLY_LEN], Zeroizing<Vec<u8>>), Error> {
    let rsa_block = &onion_skin[..RSA_BLOCK_LEN];
    let aes_block = &onion_skin[RSA_BLOCK_LEN..];

    let rsa_plaintext = decrypt_with_either_key(rsa_block, private_key, prev_private_key)?;
    if rsa_plaintext.len() != KSYM_LEN + GX_PART1_LEN {
        return Err(Error::BadHandshake);
    }

    let k_sym = Zeroizing::new(<[u8; KSYM_LEN]>::try_from(&rsa_plaintext[..KSYM_LEN]).unwrap());
    let mut gx = [0u8; DH1024_LEN];
    gx[..GX_PART1_LEN].copy_from_slice(&rsa_plaintext[KSYM_LEN..]);

    let mut gx_part2 = aes_block.to_vec();
    tap_cipher(&k_sym).apply_keystream(&mut gx_part2);
    gx[GX_PART1_LEN..].copy_from_slice(&gx_part2);

    let server_keypair = Keypair::generate(rand::rng());
    let shared = server_keypair.shared_secret(&gx);
    let key_material = kdf::derive(&*shared, key_out_len);

    let mut reply = [0u8; ONIONSKIN_REPLY_LEN];
    reply[..DH1024_LEN].copy_from_slice(server_keypair.public());
    reply[DH1024_LEN..].copy_from_slice(&key_material[..DIGEST_LEN]);

    let key_out = Zeroizing::new(key_material[DIGEST_LEN..].to_vec());
    Ok((reply, key_out))
}

/// Try `private_key`, then `prev_private_key` if given, and return the
/// first successful RSA-OAEP decryption.
fn decrypt_with_either_key(
    rsa_block: &[u8],
    private_key: &PrivateKey,
    prev_private_key: Option<&PrivateKey>,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    if let Ok(pt) = private_key.decrypt_oaep(rsa_block) {
        return Ok(Zeroizing::new(pt));
    }
    if let Some(prev) = prev_private_key {
        if let Ok(pt) = prev.decrypt_oaep(rsa_block) {
            return Ok(Zeroizing::new(pt));
        }
    }
    Err(Error::BadHandshake)
}

/// Complete the handshake on the client side: verify `reply`'s digest tag
/// against the locally held state, and produce `key_out_len` bytes of
/// derived key material.
pub fn client_handshake(
    state: ClientHandshake,
    reply: &[u8; ONIONSKIN_REPLY_LEN],
    key_out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let gy = &reply[..DH1024_LEN];
    let their_tag = &reply[DH1024_LEN..];

    let shared = state.keypair.shared_secret(gy);
    let key_material = kdf::derive(&*shared, key_out_len);

    let our_tag = &key_material[..DIGEST_LEN];
    if our_tag.ct_eq(their_tag).unwrap_u8() != 1 {
        return Err(Error::BadDigest);
    }

    Ok(Zeroizing::new(key_material[DIGEST_LEN..].to_vec()))
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::OsRng;
    use tor_llcrypto::pk::rsa::PrivateKey as TapPrivateKey;

    fn test_keypair() -> TapPrivateKey {
        TapPrivateKey::generate_tap_key(OsRng).expect("RSA keygen failed")
    }

    #[test]
    fn full_handshake_round_trips() {
        let server_key = test_keypair();
        let pubkey = server_key.to_public_key();

        let (client_state, skin) = client_create(OsRng, &pubkey).unwrap();
        let (reply, server_key_out) =
            server_handshake(&skin, &server_key, None, 72).unwrap();
        let client_key_out = client_handshake(client_state, &reply, 72).unwrap();

        assert_eq!(&server_key_out[..], &client_key_out[..]);
    }

    #[test]
    fn falls_back_to_previous_key() {
        let old_key = test_keypair();
        let new_key = test_keypair();
        let pubkey = old_key.to_public_key();

        let (client_state, skin) = client_create(OsRng, &pubkey).unwrap();
        let (reply, _) = server_handshake(&skin, &new_key, Some(&old_key), 40).unwrap();
        client_handshake(client_state, &reply, 40).unwrap();
    }

    #[test]
    fn tampered_reply_tag_is_rejected() {
        let server_key = test_keypair();
        let pubkey = server_key.to_public_key();

        let (client_state, skin) = client_create(OsRng, &pubkey).unwrap();
        let (mut reply, _) = server_handshake(&skin, &server_key, None, 40).unwrap();
        reply[DH1024_LEN] ^= 0x01;

        let err = client_handshake(client_state, &reply, 40).unwrap_err();
        assert!(matches!(err, Error::BadDigest));
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let real_key = test_keypair();
        let wrong_key = test_keypair();
        let pubkey = real_key.to_public_key();

        let (_client_state, skin) = client_create(OsRng, &pubkey).unwrap();
        let err = server_handshake(&skin, &wrong_key, None, 40).unwrap_err();
        assert!(matches!(err, Error::BadHandshake));
    }
}
