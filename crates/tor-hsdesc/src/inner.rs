//! The plaintext layer that gets padded and encrypted into a descriptor's
//! `superencrypted` field: handshake formats supported by the service, and
//! its list of introduction points.

use std::time::SystemTime;

use tor_llcrypto::pk::ed25519::{Ed25519Identity, ExpandedKeypair};

use crate::desc_enc::pad_plaintext;
use crate::err::ParseError;
use crate::intro::IntroPoint;
use crate::parse::parse_items;

/// The handshake format identifier for the modern ntor protocol.
const CREATE2_FORMAT_NTOR: u16 = 2;

/// The decrypted, padding-stripped contents of a descriptor's encrypted
/// layer.
#[derive(Clone, Debug)]
pub struct Inner {
    /// The `CREATE2` cell formats this service is willing to accept.
    create2_formats: Vec<u16>,
    /// Client authorization types the service advertises, if any.
    auth_types: Vec<String>,
    /// The introduction points through which this service can be reached.
    intro_points: Vec<IntroPoint>,
}

impl Inner {
    /// Build a new inner layer from its components.
    pub(crate) fn new(
        create2_formats: Vec<u16>,
        auth_types: Vec<String>,
        intro_points: Vec<IntroPoint>,
    ) -> Self {
        Inner {
            create2_formats,
            auth_types,
            intro_points,
        }
    }

    /// The `CREATE2` handshake formats this service accepts.
    pub fn create2_formats(&self) -> &[u16] {
        &self.create2_formats
    }

    /// Whether this service accepts the ntor handshake.
    pub fn supports_ntor(&self) -> bool {
        self.create2_formats.contains(&CREATE2_FORMAT_NTOR)
    }

    /// Client authorization types this service advertises.
    pub fn auth_types(&self) -> &[String] {
        &self.auth_types
    }

    /// The service's introduction points.
    pub fn intro_points(&self) -> &[IntroPoint] {
        &self.intro_points
    }

    /// Parse the decrypted, still-padded inner plaintext of a descriptor.
    ///
    /// Individual malformed introduction-point blocks are dropped; parsing
    /// only fails outright if the header is malformed or no intro points
    /// remain.
    pub(crate) fn parse(
        plaintext: &[u8],
        blinded_signing_key: &Ed25519Identity,
        now: SystemTime,
    ) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(plaintext).map_err(|_| ParseError::BadUtf8)?;
        // The padding is zero bytes appended after the logical content;
        // std::str::from_utf8 will fail on embedded NULs past the real text
        // unless we stop at the first one first.
        let text = text.split('\0').next().unwrap_or(text);
        let items = parse_items(text)?;

        let mut it = items.iter();
        let formats_item = it
            .next()
            .filter(|i| i.keyword == "create2-formats")
            .ok_or(ParseError::MissingToken("create2-formats"))?;
        let create2_formats = formats_item
            .args
            .iter()
            .map(|a| a.parse().map_err(|_| ParseError::BadArguments("create2-formats")))
            .collect::<Result<Vec<u16>, _>>()?;

        let mut auth_types = Vec::new();
        let mut rest: Vec<_> = it.collect();
        if let Some(first) = rest.first() {
            if first.keyword == "auth-required" {
                auth_types = first.args.clone();
                rest.remove(0);
            }
        }

        let mut intro_points = Vec::new();
        let mut i = 0;
        while i < rest.len() {
            if rest[i].keyword != "introduction-point" {
                i += 1;
                continue;
            }
            // Find the end of this intro point's block: up to (but not
            // including) the next "introduction-point" line.
            let end = rest[i + 1..]
                .iter()
                .position(|item| item.keyword == "introduction-point")
                .map(|p| i + 1 + p)
                .unwrap_or(rest.len());
            let block: Vec<_> = rest[i..end].iter().map(|&i| i.clone()).collect();
            match IntroPoint::parse(&block, blinded_signing_key, now) {
                Ok((point, _consumed)) => intro_points.push(point),
                Err(e) => tracing::debug!("dropping malformed introduction point: {}", e),
            }
            i = end;
        }

        Ok(Inner {
            create2_formats,
            auth_types,
            intro_points,
        })
    }

    /// Render and pad this inner layer, ready for encryption.
    pub(crate) fn encode(
        &self,
        blinded_keypair: &ExpandedKeypair,
        intro_point_cert_expiry: SystemTime,
    ) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("create2-formats");
        for f in &self.create2_formats {
            out.push_str(&format!(" {}", f));
        }
        out.push('\n');

        if !self.auth_types.is_empty() {
            out.push_str("auth-required");
            for t in &self.auth_types {
                out.push_str(&format!(" {}", t));
            }
            out.push('\n');
        }

        for point in &self.intro_points {
            out.push_str(&point.encode(blinded_keypair, intro_point_cert_expiry));
        }

        pad_plaintext(out.into_bytes())
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::time::Duration;
    use tor_llcrypto::pk::ed25519::Keypair;

    fn blinded_pair() -> ExpandedKeypair {
        let mut rng = rand::thread_rng();
        ExpandedKeypair::from(&Keypair::generate(&mut rng))
    }

    #[test]
    fn round_trips_with_no_intro_points() {
        let blinded = blinded_pair();
        let blinded_id = Ed25519Identity::from(*blinded.public().as_bytes());
        let now = SystemTime::now();
        let expiry = now + Duration::from_secs(3600 * 24);

        let inner = Inner {
            create2_formats: vec![2],
            auth_types: vec!["1".to_string()],
            intro_points: vec![],
        };
        let padded = inner.encode(&blinded, expiry);
        assert_eq!(padded.len() % 10_000, 0);

        let decoded = Inner::parse(&padded, &blinded_id, now).unwrap();
        assert_eq!(decoded.create2_formats(), &[2]);
        assert!(decoded.supports_ntor());
        assert_eq!(decoded.auth_types(), &["1".to_string()]);
        assert!(decoded.intro_points().is_empty());
    }

    #[test]
    fn missing_header_rejected() {
        let blinded_id = Ed25519Identity::from([1u8; 32]);
        let now = SystemTime::now();
        assert!(Inner::parse(b"nonsense\n", &blinded_id, now).is_err());
    }
}
