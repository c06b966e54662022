#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![doc = include_str!("../README.md")]
// @@ begin lint list maintained by maint/add_warning @@
#![allow(renamed_and_removed_lints)] // @@REMOVE_WHEN(ci_arti_stable)
#![allow(unknown_lints)] // @@REMOVE_WHEN(ci_arti_nightly)
#![warn(missing_docs)]
#![warn(noop_method_call)]
#![warn(unreachable_pub)]
#![warn(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::cargo_common_metadata)]
#![deny(clippy::cast_lossless)]
#![deny(clippy::checked_conversions)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::implicit_clone)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::option_option)]
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![warn(clippy::rc_buffer)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::trait_duplication_in_bounds)]
#![deny(clippy::unchecked_duration_subtraction)]
#![deny(clippy::unnecessary_wraps)]
#![warn(clippy::unseparated_literal_suffix)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::let_unit_value)] // This can reasonably be done for explicitness
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::significant_drop_in_scrutinee)] // arti/-/merge_requests/588/#note_2812945
#![allow(clippy::result_large_err)] // temporary workaround for arti#587
#![allow(clippy::needless_raw_string_hashes)] // complained-about code is fine, often best
//! <!-- @@ end lint list maintained by maint/add_warning @@ -->

mod desc_enc;
mod err;
mod inner;
mod intro;
mod outer;
mod parse;

use std::time::{Duration, SystemTime};

use rand_core::{CryptoRng, RngCore};
use tor_llcrypto::pk::ed25519::{self, Ed25519Identity, ExpandedKeypair};

pub use desc_enc::{pad_plaintext_len, HS_DESC_PLAINTEXT_PADDING_MULTIPLE};
pub use err::{CryptoError, EncryptedLayerError, EnvelopeError, Error, ParseError};
pub use intro::{EncKey, IntroPoint};

use inner::Inner;
use outer::Outer;

/// A conservative upper bound on the size of a well-formed descriptor, used
/// to reject absurdly large documents before doing any expensive parsing.
pub const HS_DESC_MAX_LEN: usize = 50 * 1024;

/// A fully parsed and validated version-3 onion service descriptor.
///
/// Constructing one of these means the outer envelope's signature checked
/// out, the `superencrypted` blob's MAC matched, and the decrypted inner
/// layer parsed (individual malformed introduction points are simply
/// dropped, per [`HsDescriptor::intro_points`]'s documentation).
#[derive(Clone, Debug)]
pub struct HsDescriptor {
    /// The envelope's declared lifetime, in minutes.
    lifetime_minutes: u64,
    /// The blinded identity key this descriptor was published under.
    blinded_signing_key: Ed25519Identity,
    /// The short-term key that signed the envelope.
    signing_key: Ed25519Identity,
    /// This descriptor's revision counter.
    revision_counter: u64,
    /// `CREATE2` handshake formats the service accepts.
    create2_formats: Vec<u16>,
    /// Client authorization types the service advertises.
    auth_types: Vec<String>,
    /// The service's introduction points.
    intro_points: Vec<IntroPoint>,
}

impl HsDescriptor {
    /// Parse and fully validate a descriptor's text representation.
    ///
    /// `blinded_signing_key` is the onion service's blinded identity key for
    /// the relevant time period, and `subcredential` is the matching
    /// subcredential, both of which the caller must derive separately from
    /// the service's long-term identity and the current time period.
    pub fn parse(
        text: &str,
        blinded_signing_key: &Ed25519Identity,
        subcredential: &[u8; 32],
        now: SystemTime,
    ) -> Result<Self, Error> {
        if text.len() > HS_DESC_MAX_LEN {
            return Err(Error::Envelope(EnvelopeError::Parse(ParseError::TooLarge)));
        }
        let outer = Outer::parse(text, blinded_signing_key, now).map_err(Error::Envelope)?;

        let plaintext = desc_enc::decrypt(
            outer.blinded_signing_key(),
            subcredential,
            outer.encrypted_blob(),
        )
        .map_err(|e| Error::Encrypted(EncryptedLayerError::Crypto(e)))?;
        let inner = Inner::parse(&plaintext, outer.blinded_signing_key(), now)
            .map_err(|e| Error::Encrypted(EncryptedLayerError::Parse(e)))?;

        Ok(HsDescriptor {
            lifetime_minutes: outer.lifetime_minutes(),
            blinded_signing_key: *outer.blinded_signing_key(),
            signing_key: *outer.signing_key(),
            revision_counter: outer.revision_counter(),
            create2_formats: inner.create2_formats().to_vec(),
            auth_types: inner.auth_types().to_vec(),
            intro_points: inner.intro_points().to_vec(),
        })
    }

    /// Build and sign a new descriptor.
    ///
    /// `signing_keypair` is a fresh short-term descriptor signing key; the
    /// caller is responsible for generating one, certifying it with
    /// `blinded_keypair` (which this function does internally), and
    /// discarding it once the descriptor's lifetime ends.
    #[allow(clippy::too_many_arguments)]
    pub fn build<R: RngCore + CryptoRng>(
        rng: &mut R,
        blinded_keypair: &ExpandedKeypair,
        signing_keypair: &ed25519::Keypair,
        subcredential: &[u8; 32],
        lifetime_minutes: u64,
        revision_counter: u64,
        create2_formats: Vec<u16>,
        auth_types: Vec<String>,
        intro_points: Vec<IntroPoint>,
        key_cert_lifetime: Duration,
    ) -> String {
        let now = SystemTime::now();
        let cert_expiry = now + key_cert_lifetime;

        let inner = Inner::new(create2_formats, auth_types, intro_points);
        let padded = inner.encode(blinded_keypair, cert_expiry);

        let mut salt = [0u8; 16];
        rng.fill_bytes(&mut salt);
        let blinded_id = Ed25519Identity::from(*blinded_keypair.public().as_bytes());
        let encrypted = desc_enc::encrypt(&blinded_id, subcredential, &padded, salt);

        Outer::encode(
            blinded_keypair,
            signing_keypair,
            cert_expiry,
            lifetime_minutes,
            revision_counter,
            &encrypted,
        )
    }

    /// This descriptor's declared lifetime, in minutes.
    pub fn lifetime_minutes(&self) -> u64 {
        self.lifetime_minutes
    }

    /// The blinded identity key this descriptor was published under.
    pub fn blinded_signing_key(&self) -> &Ed25519Identity {
        &self.blinded_signing_key
    }

    /// The short-term key that signed this descriptor's envelope.
    pub fn signing_key(&self) -> &Ed25519Identity {
        &self.signing_key
    }

    /// This descriptor's revision counter; higher values supersede lower
    /// ones for the same blinded key.
    pub fn revision_counter(&self) -> u64 {
        self.revision_counter
    }

    /// The `CREATE2` handshake formats this service accepts.
    pub fn create2_formats(&self) -> &[u16] {
        &self.create2_formats
    }

    /// Client authorization types this service advertises.
    pub fn auth_types(&self) -> &[String] {
        &self.auth_types
    }

    /// The service's introduction points.
    ///
    /// A descriptor whose `superencrypted` layer listed a malformed
    /// introduction point will simply be missing that entry here; it does
    /// not make the whole descriptor unusable.
    pub fn intro_points(&self) -> &[IntroPoint] {
        &self.intro_points
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tor_llcrypto::pk::ed25519::Keypair;

    #[test]
    fn build_then_parse() {
        let mut rng = rand::thread_rng();
        let blinded = ExpandedKeypair::from(&Keypair::generate(&mut rng));
        let blinded_id = Ed25519Identity::from(*blinded.public().as_bytes());
        let signing = Keypair::generate(&mut rng);
        let subcredential = [5u8; 32];

        let text = HsDescriptor::build(
            &mut rng,
            &blinded,
            &signing,
            &subcredential,
            180,
            7,
            vec![2],
            vec![],
            vec![],
            Duration::from_secs(3600 * 24),
        );

        let desc =
            HsDescriptor::parse(&text, &blinded_id, &subcredential, SystemTime::now()).unwrap();
        assert_eq!(desc.revision_counter(), 7);
        assert_eq!(desc.create2_formats(), &[2]);
        assert!(desc.intro_points().is_empty());
    }

    #[test]
    fn oversized_document_rejected() {
        let blinded_id = Ed25519Identity::from([1u8; 32]);
        let subcredential = [0u8; 32];
        let text = "x".repeat(HS_DESC_MAX_LEN + 1);
        assert!(matches!(
            HsDescriptor::parse(&text, &blinded_id, &subcredential, SystemTime::now()),
            Err(Error::Envelope(EnvelopeError::Parse(ParseError::TooLarge)))
        ));
    }
}
