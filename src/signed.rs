//! `multipart/signed` access (RFC 1847).
//!
//! The protected content is exposed as the exact bytes that appeared on the
//! wire, never through the decode pipeline. Verifying a signature is left
//! to the caller; only the digest named by `micalg` is computed here.

use std::fmt;
use std::ops::Range;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::debug;

use crate::error::{MimeError, Result};
use crate::model::message::Message;
use crate::model::part::PartId;

/// Digest algorithms that may appear in a `micalg` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Parse a `micalg` value such as `pgp-sha256` or `sha-256`.
    pub fn from_micalg(micalg: &str) -> Result<Self> {
        let name = micalg.trim().to_ascii_lowercase();
        let name = name.strip_prefix("pgp-").unwrap_or(&name);
        match name.replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(MimeError::UnsupportedDigest(micalg.to_string())),
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

/// Lowercase hex rendering of a digest.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// View of one `multipart/signed` part of a message.
#[derive(Debug, Clone, Copy)]
pub struct SignedMessage<'m> {
    msg: &'m Message,
    part: PartId,
}

impl<'m> SignedMessage<'m> {
    /// `None` unless `part` is a `multipart/signed` part of `msg`.
    pub fn new(msg: &'m Message, part: PartId) -> Option<Self> {
        msg.content_type(part)?
            .is("multipart/signed")
            .then_some(Self { msg, part })
    }

    /// The first `multipart/signed` part, depth-first.
    pub fn find(msg: &'m Message) -> Option<Self> {
        msg.walk().into_iter().find_map(|id| Self::new(msg, id))
    }

    pub fn part(&self) -> PartId {
        self.part
    }

    fn param(&self, name: &str) -> Option<String> {
        self.msg.part_header_parameter(self.part, "Content-Type", name)
    }

    /// `protocol` parameter, e.g. `application/pgp-signature`.
    pub fn protocol(&self) -> Option<String> {
        self.param("protocol")
    }

    pub fn micalg(&self) -> Option<String> {
        self.param("micalg")
    }

    /// The protected part (first child).
    pub fn signed_part(&self) -> Result<PartId> {
        self.child(0)
            .ok_or_else(|| MimeError::part_not_found("signed", 0))
    }

    /// The detached signature (second child).
    pub fn signature_part(&self) -> Result<PartId> {
        self.child(1).ok_or(MimeError::SignatureMissing)
    }

    fn child(&self, index: usize) -> Option<PartId> {
        self.msg.part(self.part)?.children().get(index).copied()
    }

    /// Source range of the protected part, header block included.
    pub fn signed_range(&self) -> Result<Range<usize>> {
        self.msg
            .signed_range(self.part)
            .ok_or_else(|| MimeError::part_not_found("signed", 0))
    }

    pub fn signed_bytes(&self) -> Result<&'m [u8]> {
        let range = self.signed_range()?;
        Ok(self.msg.source().slice(range))
    }

    /// Decoded signature payload.
    pub fn signature_content(&self) -> Result<Vec<u8>> {
        self.msg.content(self.signature_part()?)
    }

    pub fn algorithm(&self) -> Result<DigestAlgorithm> {
        let micalg = self
            .micalg()
            .ok_or_else(|| MimeError::UnsupportedDigest(String::new()))?;
        DigestAlgorithm::from_micalg(&micalg)
    }

    /// Digest of the signed bytes with the `micalg` algorithm.
    pub fn digest(&self) -> Result<Vec<u8>> {
        let algorithm = self.algorithm()?;
        let bytes = self.signed_bytes()?;
        debug!(%algorithm, len = bytes.len(), "Digesting signed range");
        Ok(algorithm.digest(bytes))
    }

    pub fn digest_hex(&self) -> Result<String> {
        Ok(to_hex(&self.digest()?))
    }
}

impl Message {
    /// The first `multipart/signed` part of this message, if any.
    pub fn signed(&self) -> Option<SignedMessage<'_>> {
        SignedMessage::find(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNED: &[u8] = b"Content-Type: multipart/signed; boundary=sig;\r\n\
\tprotocol=\"application/pgp-signature\"; micalg=pgp-sha256\r\n\r\n\
--sig\r\nContent-Type: text/plain\r\n\r\nsigned text\r\n\
--sig\r\nContent-Type: application/pgp-signature\r\n\r\nSIG\r\n\
--sig--\r\n";

    #[test]
    fn test_micalg_names() {
        assert_eq!(DigestAlgorithm::from_micalg("pgp-sha256").unwrap(), DigestAlgorithm::Sha256);
        assert_eq!(DigestAlgorithm::from_micalg("SHA-512").unwrap(), DigestAlgorithm::Sha512);
        assert_eq!(DigestAlgorithm::from_micalg("md5").unwrap(), DigestAlgorithm::Md5);
        assert!(matches!(
            DigestAlgorithm::from_micalg("pgp-whirlpool"),
            Err(MimeError::UnsupportedDigest(_))
        ));
    }

    #[test]
    fn test_signed_view() {
        let msg = Message::parse(SIGNED);
        let signed = msg.signed().unwrap();
        assert_eq!(signed.protocol().as_deref(), Some("application/pgp-signature"));
        assert_eq!(signed.micalg().as_deref(), Some("pgp-sha256"));
        assert_eq!(
            signed.signed_bytes().unwrap(),
            b"Content-Type: text/plain\r\n\r\nsigned text"
        );
        assert_eq!(signed.signature_content().unwrap(), b"SIG");
        assert_eq!(msg.attachment_count(), 0);
    }

    #[test]
    fn test_digest_matches_known_value() {
        let msg = Message::parse(SIGNED);
        let signed = msg.signed().unwrap();
        let expected = to_hex(&Sha256::digest(b"Content-Type: text/plain\r\n\r\nsigned text"));
        assert_eq!(signed.digest_hex().unwrap(), expected);
    }

    #[test]
    fn test_missing_signature_part() {
        let msg = Message::parse(
            b"Content-Type: multipart/signed; boundary=s; micalg=sha1\r\n\r\n--s\r\n\r\nonly\r\n--s--\r\n"
                .to_vec(),
        );
        let signed = msg.signed().unwrap();
        assert!(signed.signed_bytes().is_ok());
        let err = signed.signature_content().unwrap_err();
        assert!(matches!(err, MimeError::SignatureMissing));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_not_signed() {
        let msg = Message::parse(b"Subject: x\r\n\r\nbody".to_vec());
        assert!(msg.signed().is_none());
        assert!(msg.signed_range(PartId::ROOT).is_none());
    }
}
