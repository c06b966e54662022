//! The TAP key-derivation function: repeated SHA-1 over the shared secret.

use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

/// Length in bytes of one SHA-1 digest.
pub const DIGEST_LEN: usize = 20;

/// Derive `20 + key_out_len` bytes of key material from the shared secret
/// `k`: `SHA-1(k ‖ 0) ‖ SHA-1(k ‖ 1) ‖ SHA-1(k ‖ 2) ‖ …`.
///
/// The first 20 bytes are the handshake's digest tag; the rest seeds
/// per-direction symmetric keys and digest state for the caller.
pub fn derive(k: &[u8], key_out_len: usize) -> Zeroizing<Vec<u8>> {
    let total = DIGEST_LEN + key_out_len;
    let mut out = Zeroizing::new(Vec::with_capacity(total));
    let mut i: u8 = 0;
    while out.len() < total {
        let mut hasher = Sha1::new();
        hasher.update(k);
        hasher.update([i]);
        let digest = hasher.finalize();
        let take = (total - out.len()).min(DIGEST_LEN);
        out.extend_from_slice(&digest[..take]);
        i = i
            .checked_add(1)
            .expect("key_out_len absurdly large for a TAP handshake");
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let k = b"some shared secret material, 128 bytes worth in practice";
        let a = derive(k, 100);
        let b = derive(k, 100);
        assert_eq!(&a[..], &b[..]);
        assert_eq!(a.len(), DIGEST_LEN + 100);
    }

    #[test]
    fn derive_tag_is_prefix_of_longer_request() {
        let k = b"another secret";
        let short = derive(k, 0);
        let long = derive(k, 200);
        assert_eq!(&short[..], &long[..DIGEST_LEN]);
    }
}
