//! Public-key primitives used throughout this workspace: RSA for the legacy
//! TAP handshake and relay identities, Ed25519 for certificates and modern
//! signing, and Curve25519 for Diffie-Hellman key agreement.

pub mod curve25519;
pub mod ed25519;
pub mod rsa;

/// Something that can be checked as a signature over a document, without
/// committing to which signature scheme produced it.
///
/// Implementing this (instead of just calling `is_valid()` directly) lets
/// callers collect signatures of mixed schemes and check them together via
/// [`validate_all_sigs`], which batches the Ed25519 ones.
pub trait ValidatableSignature {
    /// Check whether this signature actually covers its document.
    fn is_valid(&self) -> bool;

    /// Downcast to an Ed25519 signature, if that's what this is.
    fn as_ed25519(&self) -> Option<&ed25519::ValidatableEd25519Signature> {
        None
    }
}

/// Check every signature in `v`, returning `true` only if all of them are
/// valid.
///
/// Equivalent to `v.iter().all(ValidatableSignature::is_valid)`, except
/// that the Ed25519 signatures among `v` are checked together as one batch
/// (see [`ed25519::validate_batch`] for the caveats that come with that).
pub fn validate_all_sigs(v: &[Box<dyn ValidatableSignature>]) -> bool {
    let mut ed_sigs = Vec::new();
    let mut non_ed_sigs = Vec::new();
    for sig in v.iter() {
        match sig.as_ed25519() {
            Some(ed_sig) => ed_sigs.push(ed_sig),
            None => non_ed_sigs.push(sig),
        }
    }

    let ed_batch_is_valid = crate::pk::ed25519::validate_batch(&ed_sigs[..]);
    ed_batch_is_valid && non_ed_sigs.iter().all(|b| b.is_valid())
}

#[cfg(test)]
mod test {
    // @@ begin test lint list maintained by maint/add_warning @@
    #![allow(clippy::bool_assert_comparison)]
    #![allow(clippy::clone_on_copy)]
    #![allow(clippy::dbg_macro)]
    #![allow(clippy::mixed_attributes_style)]
    #![allow(clippy::print_stderr)]
    #![allow(clippy::print_stdout)]
    #![allow(clippy::single_char_pattern)]
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::unchecked_duration_subtraction)]
    #![allow(clippy::useless_vec)]
    #![allow(clippy::needless_pass_by_value)]
    //! <!-- @@ end test lint list maintained by maint/add_warning @@ -->
    #[test]
    fn validatable_ed_sig() {
        use super::ValidatableSignature;
        use super::ed25519::{PublicKey, Signature, ValidatableEd25519Signature};
        use hex_literal::hex;
        let pk = PublicKey::from_bytes(&hex!(
            "fc51cd8e6218a1a38da47ed00230f058
             0816ed13ba3303ac5deb911548908025"
        ))
        .unwrap();
        let sig: Signature = hex!(
            "6291d657deec24024827e69c3abe01a3
             0ce548a284743a445e3680d7db5ac3ac
             18ff9b538d16f290ae67f760984dc659
             4a7c15e9716ed28dc027beceea1ec40a"
        )
        .into();

        let valid = ValidatableEd25519Signature::new(pk, sig, &hex!("af82"));
        let invalid = ValidatableEd25519Signature::new(pk, sig, &hex!("af83"));

        assert!(valid.is_valid());
        assert!(!invalid.is_valid());
    }
}
