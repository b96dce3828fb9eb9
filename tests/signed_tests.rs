//! `multipart/signed` range extraction and digests.

use std::path::Path;

use mimeshell::{DigestAlgorithm, Message, MimeError, PartId};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_signed_range_digest_matches_signature() {
    let msg = Message::open(fixture("signed.eml")).unwrap();
    let signed = msg.signed().unwrap();
    assert_eq!(signed.algorithm().unwrap(), DigestAlgorithm::Sha256);

    let expected = std::fs::read_to_string(fixture("signed.digest")).unwrap();
    let payload = signed.signature_content().unwrap();
    assert_eq!(String::from_utf8(payload).unwrap(), expected);
    assert_eq!(signed.digest_hex().unwrap(), expected);
}

#[test]
fn test_signed_range_is_exact_source_span() {
    let raw = std::fs::read(fixture("signed.eml")).unwrap();
    let msg = Message::parse(raw.clone());
    let range = msg.signed_range(PartId::ROOT).unwrap();

    let opening = b"--sig-boundary\r\n";
    let start = raw
        .windows(opening.len())
        .position(|w| w == opening)
        .unwrap()
        + opening.len();
    assert_eq!(range.start, start);
    assert!(raw[..range.end].ends_with(b"It spans two lines."));
    assert!(raw[range.end..].starts_with(b"\r\n--sig-boundary\r\n"));
}

#[test]
fn test_signature_is_not_an_attachment() {
    let msg = Message::open(fixture("signed.eml")).unwrap();
    assert_eq!(msg.attachment_count(), 0);
    assert_eq!(msg.text_part_count(), 1);
    let signed = msg.signed().unwrap();
    assert!(msg.is_signature_part(signed.signature_part().unwrap()));
    assert_eq!(
        signed.protocol().as_deref(),
        Some("application/pgp-signature")
    );
}

#[test]
fn test_signed_bytes_survive_unrelated_edit() {
    let mut msg = Message::open(fixture("signed.eml")).unwrap();
    let before = msg.signed().unwrap().signed_bytes().unwrap().to_vec();
    msg.set_header(PartId::ROOT, "X-Checked", "1").unwrap();

    let reparsed = Message::parse(msg.to_bytes().unwrap());
    let signed = reparsed.signed().unwrap();
    assert_eq!(signed.signed_bytes().unwrap(), before.as_slice());
    let expected = std::fs::read_to_string(fixture("signed.digest")).unwrap();
    assert_eq!(signed.digest_hex().unwrap(), expected);
}

#[test]
fn test_unsupported_micalg() {
    let msg = Message::parse(
        b"Content-Type: multipart/signed; boundary=s; micalg=pgp-ripemd160\r\n\r\n\
--s\r\n\r\ncontent\r\n--s\r\n\r\nsig\r\n--s--\r\n"
            .to_vec(),
    );
    let signed = msg.signed().unwrap();
    assert!(matches!(
        signed.digest(),
        Err(MimeError::UnsupportedDigest(name)) if name == "pgp-ripemd160"
    ));
    assert_eq!(signed.signed_bytes().unwrap(), b"\r\ncontent");
}
