//! The outer, plaintext-signed envelope of an onion service descriptor.

use std::time::SystemTime;

use tor_cert::{CertType, CertifiedKey, Ed25519Cert};
use tor_checkable::{SelfSigned, Timebound};
use tor_llcrypto::pk::ed25519::{
    self, Ed25519Identity, ExpandedKeypair, Signer, ValidatableEd25519Signature,
};
use tor_llcrypto::pk::ValidatableSignature;

use crate::err::{CryptoError, EnvelopeError, ParseError};
use crate::parse::{encode_object, parse_items, Item};

/// Domain-separation prefix prepended to the signed portion of the outer
/// envelope before computing or checking its signature.
const ENVELOPE_SIG_PREFIX: &[u8] = b"Tor onion service descriptor sig v3";

/// The only descriptor format version this crate understands.
const DESCRIPTOR_VERSION: &str = "3";

/// Valid range, in minutes, for a descriptor's `descriptor-lifetime`.
const LIFETIME_RANGE_MINUTES: std::ops::RangeInclusive<u64> = 10..=720;

/// The parsed, fully-validated outer envelope of a descriptor, plus the raw
/// encrypted blob it carries.
pub struct Outer {
    /// How long, from publication, this descriptor should be treated as
    /// current.
    lifetime_minutes: u64,
    /// The short-term key that signed this envelope, itself certified by the
    /// onion service's blinded identity key.
    signing_key: Ed25519Identity,
    /// The blinded identity key that certified `signing_key`.
    blinded_signing_key: Ed25519Identity,
    /// Strictly increasing counter used to order descriptor versions.
    revision_counter: u64,
    /// The raw `salt ‖ ciphertext ‖ mac` blob from the `superencrypted`
    /// field.
    encrypted_blob: Vec<u8>,
}

impl Outer {
    /// How long, from publication, this descriptor should be treated as
    /// current.
    pub fn lifetime_minutes(&self) -> u64 {
        self.lifetime_minutes
    }

    /// The descriptor's blinded identity key.
    pub fn blinded_signing_key(&self) -> &Ed25519Identity {
        &self.blinded_signing_key
    }

    /// The descriptor's revision counter.
    pub fn revision_counter(&self) -> u64 {
        self.revision_counter
    }

    /// The raw encrypted blob carried by the `superencrypted` field.
    pub fn encrypted_blob(&self) -> &[u8] {
        &self.encrypted_blob
    }

    /// Parse and fully validate the outer envelope of a descriptor, given
    /// the onion service's blinded identity key.
    pub fn parse(
        text: &str,
        blinded_signing_key: &Ed25519Identity,
        now: SystemTime,
    ) -> Result<Self, EnvelopeError> {
        let items = parse_items(text).map_err(EnvelopeError::Parse)?;
        let mut it = items.iter();

        let version_item = next_keyword(&mut it, "hs-descriptor")?;
        if version_item.arg(0, "hs-descriptor")? != DESCRIPTOR_VERSION {
            return Err(EnvelopeError::UnsupportedVersion);
        }

        let lifetime_item = next_keyword(&mut it, "descriptor-lifetime")?;
        let lifetime_minutes: u64 = lifetime_item
            .arg(0, "descriptor-lifetime")?
            .parse()
            .map_err(|_| ParseError::BadArguments("descriptor-lifetime"))?;
        if !LIFETIME_RANGE_MINUTES.contains(&lifetime_minutes) {
            return Err(EnvelopeError::BadLifetime);
        }

        let cert_item = next_keyword(&mut it, "descriptor-signing-key-cert")?;
        let cert_obj = cert_item.require_object("descriptor-signing-key-cert")?;
        if cert_obj.tag != "ED25519 CERT" {
            return Err(ParseError::BadObject(
                "descriptor-signing-key-cert is not an ED25519 CERT".into(),
            )
            .into());
        }
        let signing_key = check_signing_key_cert(&cert_obj.data, blinded_signing_key, now)
            .map_err(EnvelopeError::Crypto)?;

        let revision_item = next_keyword(&mut it, "revision-counter")?;
        let revision_counter: u64 = revision_item
            .arg(0, "revision-counter")?
            .parse()
            .map_err(|_| ParseError::BadArguments("revision-counter"))?;

        let super_item = next_keyword(&mut it, "superencrypted")?;
        let super_obj = super_item.require_object("superencrypted")?;
        if super_obj.tag != "MESSAGE" {
            return Err(ParseError::BadObject("superencrypted is not a MESSAGE".into()).into());
        }
        let encrypted_blob = super_obj.data.clone();

        let sig_item = next_keyword(&mut it, "signature")?;
        let sig_b64 = sig_item.arg(0, "signature")?;
        let sig_bytes = base64_decode(sig_b64)?;
        let sig_bytes: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| ParseError::BadArguments("signature"))?;

        let signed_text = signed_prefix(text, "signature")?;
        let mut message = ENVELOPE_SIG_PREFIX.to_vec();
        message.extend_from_slice(signed_text.as_bytes());
        let validatable = ValidatableEd25519Signature::new(
            ed25519::PublicKey::try_from(&signing_key).map_err(|_| CryptoError::BadSignature)?,
            ed25519::Signature::from_bytes(&sig_bytes),
            &message,
        );
        if !validatable.is_valid() {
            return Err(EnvelopeError::Crypto(CryptoError::BadSignature));
        }

        Ok(Outer {
            lifetime_minutes,
            signing_key,
            blinded_signing_key: *blinded_signing_key,
            revision_counter,
            encrypted_blob,
        })
    }

    /// The short-term signing key certified by the blinded identity key.
    pub fn signing_key(&self) -> &Ed25519Identity {
        &self.signing_key
    }

    /// Build and sign the outer envelope of a descriptor.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn encode(
        blinded_keypair: &ExpandedKeypair,
        signing_keypair: &ed25519::Keypair,
        signing_key_cert_expiry: SystemTime,
        lifetime_minutes: u64,
        revision_counter: u64,
        encrypted_blob: &[u8],
    ) -> String {
        let cert = Ed25519Cert::constructor()
            .cert_type(CertType::HS_BLINDED_ID_V_SIGNING)
            .cert_key(CertifiedKey::Ed25519(signing_keypair.verifying_key().into()))
            .expiration(signing_key_cert_expiry)
            .encode_and_sign(blinded_keypair)
            .expect("well-formed descriptor-signing-key-cert");

        let mut out = String::new();
        out.push_str(&format!("hs-descriptor {}\n", DESCRIPTOR_VERSION));
        out.push_str(&format!("descriptor-lifetime {}\n", lifetime_minutes));
        out.push_str("descriptor-signing-key-cert\n");
        out.push_str(&encode_object("ED25519 CERT", &cert));
        out.push_str(&format!("revision-counter {}\n", revision_counter));
        out.push_str("superencrypted\n");
        out.push_str(&encode_object("MESSAGE", encrypted_blob));
        out.push_str("signature ");

        let mut message = ENVELOPE_SIG_PREFIX.to_vec();
        message.extend_from_slice(out.as_bytes());
        let sig = signing_keypair.sign(&message);
        out.push_str(&base64_encode(&sig.to_bytes()));
        out.push('\n');
        out
    }
}

/// Check that `der` is an `HS_BLINDED_ID_V_SIGNING` cert signed by
/// `blinded_signing_key`, unexpired as of `now`, and return its subject key.
fn check_signing_key_cert(
    der: &[u8],
    blinded_signing_key: &Ed25519Identity,
    now: SystemTime,
) -> Result<Ed25519Identity, CryptoError> {
    let cert = Ed25519Cert::decode(der).map_err(|_| CryptoError::BadSignature)?;
    if cert.peek_cert_type() != CertType::HS_BLINDED_ID_V_SIGNING {
        return Err(CryptoError::BadSignature);
    }
    let unchecked = cert
        .should_be_signed_with(blinded_signing_key)
        .map_err(|_| CryptoError::BadSignature)?;
    let checked = unchecked
        .check_signature()
        .map_err(|_| CryptoError::BadSignature)?;
    let cert = checked
        .check_valid_at(&now)
        .map_err(|_| CryptoError::BadSignature)?;
    cert.subject_key()
        .as_ed25519()
        .copied()
        .ok_or(CryptoError::BadSignature)
}

/// Return the next item from `it`, or a [`ParseError::MissingToken`] if the
/// iterator is exhausted or the next item has the wrong keyword.
fn next_keyword<'a>(
    it: &mut std::slice::Iter<'a, Item>,
    kw: &'static str,
) -> Result<&'a Item, ParseError> {
    let item = it.next().ok_or(ParseError::MissingToken(kw))?;
    if item.keyword != kw {
        return Err(ParseError::MissingToken(kw));
    }
    Ok(item)
}

/// Return the prefix of `text` up to and including the keyword `kw` and the
/// space after it, which is the portion of the envelope that gets signed.
fn signed_prefix<'a>(text: &'a str, kw: &str) -> Result<&'a str, ParseError> {
    let needle = format!("\n{} ", kw);
    let pos = text
        .find(&needle)
        .ok_or(ParseError::MissingToken("signature"))?;
    Ok(&text[..pos + needle.len()])
}

fn base64_decode(s: &str) -> Result<Vec<u8>, ParseError> {
    use base64ct::{Base64, Encoding};
    Base64::decode_vec(s.trim()).map_err(|_| ParseError::BadArguments("base64"))
}

fn base64_encode(b: &[u8]) -> String {
    use base64ct::{Base64, Encoding};
    Base64::encode_string(b)
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::time::Duration;
    use tor_llcrypto::pk::ed25519::Keypair;

    fn keypair() -> Keypair {
        let mut rng = rand::thread_rng();
        Keypair::generate(&mut rng)
    }

    #[test]
    fn envelope_round_trips() {
        let blinded = ExpandedKeypair::from(&keypair());
        let blinded_id = Ed25519Identity::from(*blinded.public().as_bytes());
        let signing = keypair();
        let now = SystemTime::now();
        let expiry = now + Duration::from_secs(3600 * 24);

        let text = Outer::encode(&blinded, &signing, expiry, 180, 42, b"hello");
        let outer = Outer::parse(&text, &blinded_id, now).unwrap();
        assert_eq!(outer.lifetime_minutes(), 180);
        assert_eq!(outer.revision_counter(), 42);
        assert_eq!(outer.encrypted_blob(), b"hello");
        assert_eq!(
            outer.signing_key().as_bytes(),
            signing.verifying_key().as_bytes()
        );
    }

    #[test]
    fn bad_lifetime_rejected() {
        let blinded = ExpandedKeypair::from(&keypair());
        let blinded_id = Ed25519Identity::from(*blinded.public().as_bytes());
        let signing = keypair();
        let now = SystemTime::now();
        let expiry = now + Duration::from_secs(3600 * 24);

        let text = Outer::encode(&blinded, &signing, expiry, 5, 1, b"x");
        assert!(matches!(
            Outer::parse(&text, &blinded_id, now),
            Err(EnvelopeError::BadLifetime)
        ));
    }

    #[test]
    fn tampered_signature_rejected() {
        let blinded = ExpandedKeypair::from(&keypair());
        let blinded_id = Ed25519Identity::from(*blinded.public().as_bytes());
        let signing = keypair();
        let now = SystemTime::now();
        let expiry = now + Duration::from_secs(3600 * 24);

        let mut text = Outer::encode(&blinded, &signing, expiry, 180, 1, b"x");
        let last = text.trim_end().len() - 1;
        let mut bytes = text.into_bytes();
        bytes[last] ^= 1;
        text = String::from_utf8(bytes).unwrap();
        assert!(Outer::parse(&text, &blinded_id, now).is_err());
    }
}
