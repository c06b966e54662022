//! Introduction points: the entries of the inner plaintext layer that tell a
//! client how to reach an onion service through a particular introduction
//! relay.

use std::time::SystemTime;

use tor_bytes::{Reader, Writeable, Writer};
use tor_cert::{CertType, CertifiedKey, Ed25519Cert};
use tor_checkable::{SelfSigned, Timebound};
use tor_linkspec::EncodedLinkSpec;
use tor_llcrypto::pk::curve25519;
use tor_llcrypto::pk::ed25519::{self, Ed25519Identity, ExpandedKeypair, ValidatableEd25519Signature};
use tor_llcrypto::pk::rsa;
use tor_llcrypto::pk::ValidatableSignature;

use crate::err::{CryptoError, ParseError};
use crate::parse::{encode_object, Item};

/// Domain-separation prefix for the raw signature over a legacy encryption
/// key, used in place of an `Ed25519Cert` when the key being certified isn't
/// ed25519-shaped.
const LEGACY_ENC_KEY_SIG_PREFIX: &[u8] = b"Tor onion service introduction point cross-certification";

/// The encryption key that a client uses to begin a handshake with the
/// service through a given introduction point.
#[derive(Clone, Debug)]
pub enum EncKey {
    /// A curve25519 public key, used for the ntor handshake.
    Ntor(curve25519::PublicKey),
    /// An RSA public key, used for the legacy TAP handshake.
    Legacy(Box<rsa::PublicKey>),
}

/// One introduction point, as listed in the encrypted layer of a descriptor.
#[derive(Clone, Debug)]
pub struct IntroPoint {
    /// The addresses and identities at which this introduction point can be
    /// reached.
    link_specifiers: Vec<EncodedLinkSpec>,
    /// The key this introduction point will use to sign its own
    /// `INTRODUCE_ACK` cells, certified by the descriptor's blinded key.
    auth_key: Ed25519Identity,
    /// The key a client uses to encrypt the first part of its handshake to
    /// the service.
    enc_key: EncKey,
}

impl IntroPoint {
    /// The addresses and identities of this introduction point.
    pub fn link_specifiers(&self) -> &[EncodedLinkSpec] {
        &self.link_specifiers
    }

    /// The introduction point's authentication key.
    pub fn auth_key(&self) -> &Ed25519Identity {
        &self.auth_key
    }

    /// The key used to encrypt the first part of a client's handshake.
    pub fn enc_key(&self) -> &EncKey {
        &self.enc_key
    }

    /// Parse a block of items starting at `items[0]` being an
    /// `introduction-point` line, consuming as many items as make up one
    /// complete introduction point.
    ///
    /// Returns the parsed point and the number of items consumed.
    pub(crate) fn parse(
        items: &[Item],
        blinded_signing_key: &Ed25519Identity,
        now: SystemTime,
    ) -> Result<(Self, usize), ParseError> {
        let mut idx = 0;
        let head = items.get(idx).ok_or(ParseError::MissingToken("introduction-point"))?;
        if head.keyword != "introduction-point" {
            return Err(ParseError::MissingToken("introduction-point"));
        }
        let link_specifiers = decode_linkspecs(head.arg(0, "introduction-point")?)?;
        idx += 1;

        let auth_item = items.get(idx).ok_or(ParseError::MissingToken("auth-key"))?;
        if auth_item.keyword != "auth-key" {
            return Err(ParseError::MissingToken("auth-key"));
        }
        let auth_obj = auth_item.require_object("auth-key")?;
        if auth_obj.tag != "ED25519 CERT" {
            return Err(ParseError::BadObject("auth-key is not an ED25519 CERT".into()));
        }
        let auth_key = check_ed25519_cert(
            &auth_obj.data,
            CertType::AUTH_HS_IP_KEY,
            blinded_signing_key,
            now,
        )
        .map_err(|_| ParseError::BadObject("auth-key certificate did not validate".into()))?;
        idx += 1;

        let enc_item = items.get(idx).ok_or(ParseError::MissingToken("enc-key"))?;
        if enc_item.keyword != "enc-key" {
            return Err(ParseError::MissingToken("enc-key"));
        }
        idx += 1;

        let (enc_key, cert_item) = match enc_item.arg(0, "enc-key")? {
            "ntor" => {
                let raw = base64_decode(enc_item.arg(1, "enc-key")?)?;
                let bytes: [u8; 32] = raw
                    .try_into()
                    .map_err(|_| ParseError::BadArguments("enc-key ntor"))?;
                (EncKey::Ntor(curve25519::PublicKey::from(bytes)), items.get(idx))
            }
            "legacy" => {
                let key_item = items.get(idx).ok_or(ParseError::MissingToken("enc-key legacy"))?;
                let obj = key_item.require_object("enc-key")?;
                if obj.tag != "RSA PUBLIC KEY" {
                    return Err(ParseError::BadObject("enc-key legacy is not an RSA PUBLIC KEY".into()));
                }
                let key = rsa::PublicKey::from_der(&obj.data)
                    .ok_or_else(|| ParseError::BadObject("malformed RSA public key".into()))?;
                idx += 1;
                (EncKey::Legacy(Box::new(key)), items.get(idx))
            }
            _ => return Err(ParseError::BadArguments("enc-key")),
        };

        let cert_item = cert_item.ok_or(ParseError::MissingToken("enc-key-certification"))?;
        if cert_item.keyword != "enc-key-certification" {
            return Err(ParseError::MissingToken("enc-key-certification"));
        }
        let cert_obj = cert_item.require_object("enc-key-certification")?;
        match &enc_key {
            EncKey::Ntor(pk) => {
                if cert_obj.tag != "ED25519 CERT" {
                    return Err(ParseError::BadObject(
                        "enc-key-certification is not an ED25519 CERT".into(),
                    ));
                }
                let subject = check_ed25519_cert(
                    &cert_obj.data,
                    CertType::CROSS_HS_IP_KEYS,
                    blinded_signing_key,
                    now,
                )
                .map_err(|_| {
                    ParseError::BadObject("enc-key-certification did not validate".into())
                })?;
                if subject.as_bytes() != pk.as_bytes() {
                    return Err(ParseError::BadObject(
                        "enc-key-certification does not match enc-key".into(),
                    ));
                }
            }
            EncKey::Legacy(pk) => {
                if cert_obj.tag != "CROSSCERT" {
                    return Err(ParseError::BadObject(
                        "enc-key-certification is not a CROSSCERT".into(),
                    ));
                }
                verify_legacy_crosscert(blinded_signing_key, pk, &cert_obj.data)
                    .map_err(|_| ParseError::BadObject("legacy cross-certification did not validate".into()))?;
            }
        }
        idx += 1;

        Ok((
            IntroPoint {
                link_specifiers,
                auth_key,
                enc_key,
            },
            idx,
        ))
    }

    /// Render this introduction point as a sequence of descriptor lines.
    pub(crate) fn encode(
        &self,
        blinded_keypair: &ExpandedKeypair,
        auth_key_cert_expiry: SystemTime,
    ) -> String {
        let mut out = String::new();
        out.push_str("introduction-point ");
        out.push_str(&encode_linkspecs(&self.link_specifiers));
        out.push('\n');

        let auth_cert = Ed25519Cert::constructor()
            .cert_type(CertType::AUTH_HS_IP_KEY)
            .cert_key(CertifiedKey::Ed25519(self.auth_key))
            .expiration(auth_key_cert_expiry)
            .encode_and_sign(blinded_keypair)
            .expect("well-formed auth-key certificate");
        out.push_str("auth-key\n");
        out.push_str(&encode_object("ED25519 CERT", &auth_cert));

        match &self.enc_key {
            EncKey::Ntor(pk) => {
                out.push_str(&format!("enc-key ntor {}\n", base64_encode(pk.as_bytes())));
                let cert = Ed25519Cert::constructor()
                    .cert_type(CertType::CROSS_HS_IP_KEYS)
                    .cert_key(CertifiedKey::Ed25519(Ed25519Identity::from(*pk.as_bytes())))
                    .expiration(auth_key_cert_expiry)
                    .encode_and_sign(blinded_keypair)
                    .expect("well-formed enc-key-certification");
                out.push_str("enc-key-certification\n");
                out.push_str(&encode_object("ED25519 CERT", &cert));
            }
            EncKey::Legacy(pk) => {
                out.push_str("enc-key legacy\n");
                out.push_str(&encode_object("RSA PUBLIC KEY", &pk.to_der()));
                let sig = sign_legacy_crosscert(blinded_keypair, pk);
                out.push_str("enc-key-certification\n");
                out.push_str(&encode_object("CROSSCERT", &sig));
            }
        }
        out
    }
}

/// Check that `der` is an `Ed25519Cert` of type `expected_type`, signed by
/// `signer`, unexpired as of `now`, and return its subject key.
fn check_ed25519_cert(
    der: &[u8],
    expected_type: CertType,
    signer: &Ed25519Identity,
    now: SystemTime,
) -> Result<Ed25519Identity, CryptoError> {
    let cert = Ed25519Cert::decode(der).map_err(|_| CryptoError::BadSignature)?;
    if cert.peek_cert_type() != expected_type {
        return Err(CryptoError::BadSignature);
    }
    let unchecked = cert
        .should_be_signed_with(signer)
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

/// Verify the raw cross-signature over a legacy RSA encryption key.
fn verify_legacy_crosscert(
    blinded_signing_key: &Ed25519Identity,
    enc_key: &rsa::PublicKey,
    sig: &[u8],
) -> Result<(), CryptoError> {
    let mut signed = LEGACY_ENC_KEY_SIG_PREFIX.to_vec();
    signed.extend_from_slice(&enc_key.to_der());
    let sig_bytes: [u8; 64] = sig.try_into().map_err(|_| CryptoError::BadSignature)?;
    let validatable = ValidatableEd25519Signature::new(
        ed25519::PublicKey::try_from(blinded_signing_key).map_err(|_| CryptoError::BadSignature)?,
        ed25519::Signature::from_bytes(&sig_bytes),
        &signed,
    );
    if validatable.is_valid() {
        Ok(())
    } else {
        Err(CryptoError::BadSignature)
    }
}

/// Produce the raw cross-signature over a legacy RSA encryption key.
fn sign_legacy_crosscert(blinded_keypair: &ExpandedKeypair, enc_key: &rsa::PublicKey) -> Vec<u8> {
    let mut signed = LEGACY_ENC_KEY_SIG_PREFIX.to_vec();
    signed.extend_from_slice(&enc_key.to_der());
    blinded_keypair.sign(&signed).to_bytes().to_vec()
}

/// Decode a base64-encoded link specifier list, per the byte layout of
/// `n, (type, len, body)*`.
fn decode_linkspecs(b64: &str) -> Result<Vec<EncodedLinkSpec>, ParseError> {
    let bytes = base64_decode(b64)?;
    let mut r = Reader::from_slice(&bytes);
    let n = r.take_u8().map_err(|_| ParseError::Truncated)?;
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        out.push(r.extract().map_err(|_| ParseError::BadLinkSpec)?);
    }
    r.should_be_exhausted().map_err(|_| ParseError::Truncated)?;
    Ok(out)
}

/// Encode a list of link specifiers into the base64 form used on an
/// `introduction-point` line.
fn encode_linkspecs(specs: &[EncodedLinkSpec]) -> String {
    let mut w = Vec::new();
    w.write_u8(specs.len() as u8);
    for s in specs {
        s.write_onto(&mut w).expect("link specifier too long to encode");
    }
    base64_encode(&w)
}

fn base64_decode(s: &str) -> Result<Vec<u8>, ParseError> {
    use base64ct::{Base64, Encoding};
    Base64::decode_vec(s).map_err(|_| ParseError::BadArguments("base64"))
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
    use tor_linkspec::LinkSpec;
    use tor_llcrypto::pk::ed25519::Keypair;

    fn blinded_pair() -> ExpandedKeypair {
        let mut rng = rand::thread_rng();
        let keypair = Keypair::generate(&mut rng);
        ExpandedKeypair::from(&keypair)
    }

    #[test]
    fn ntor_intro_point_round_trips() {
        let blinded = blinded_pair();
        let blinded_id = Ed25519Identity::from(*blinded.public().as_bytes());
        let now = SystemTime::now();
        let expiry = now + Duration::from_secs(3600 * 24);

        let auth_id = Ed25519Identity::from([3u8; 32]);
        let enc_key = curve25519::PublicKey::from([4u8; 32]);
        let point = IntroPoint {
            link_specifiers: vec![LinkSpec::RsaId(rsa::RsaIdentity::from([1u8; 20]))
                .encode()
                .unwrap()],
            auth_key: auth_id,
            enc_key: EncKey::Ntor(enc_key),
        };

        let text = point.encode(&blinded, expiry);
        let items = crate::parse::parse_items(&text).unwrap();
        let (parsed, consumed) = IntroPoint::parse(&items, &blinded_id, now).unwrap();
        assert_eq!(consumed, items.len());
        assert_eq!(parsed.auth_key(), &auth_id);
        assert!(matches!(parsed.enc_key(), EncKey::Ntor(pk) if pk.as_bytes() == enc_key.as_bytes()));
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let blinded = blinded_pair();
        let other = blinded_pair();
        let other_id = Ed25519Identity::from(*other.public().as_bytes());
        let now = SystemTime::now();
        let expiry = now + Duration::from_secs(3600 * 24);

        let point = IntroPoint {
            link_specifiers: vec![],
            auth_key: Ed25519Identity::from([3u8; 32]),
            enc_key: EncKey::Ntor(curve25519::PublicKey::from([4u8; 32])),
        };
        let text = point.encode(&blinded, expiry);
        let items = crate::parse::parse_items(&text).unwrap();
        assert!(IntroPoint::parse(&items, &other_id, now).is_err());
    }
}
