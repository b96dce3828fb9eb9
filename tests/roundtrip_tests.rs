//! Serialize → parse round trips.

use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mimeshell::{Message, PartId, TransferEncoding, WriteOptions};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

const FIXTURES: &[&str] = &[
    "simple.eml",
    "nested.eml",
    "two_text.eml",
    "wrong_charset.eml",
    "signed.eml",
    "truncated.eml",
    "uuencode.eml",
];

/// Decoded content of every leaf, depth-first.
fn leaf_contents(msg: &Message) -> Vec<(String, Vec<u8>)> {
    msg.walk()
        .into_iter()
        .filter(|id| msg.part(*id).unwrap().children().is_empty())
        .map(|id| {
            (
                msg.content_type(id).unwrap().essence(),
                msg.content(id).unwrap(),
            )
        })
        .collect()
}

fn roundtrip(msg: &Message) -> Message {
    Message::parse(msg.to_bytes().unwrap())
}

#[test]
fn test_unmodified_messages_are_byte_identical() {
    for name in FIXTURES {
        let original = std::fs::read(fixture(name)).unwrap();
        let msg = Message::parse(original.clone());
        assert_eq!(msg.to_bytes().unwrap(), original, "{name} changed on write");
    }
}

#[test]
fn test_leaf_content_survives_edits() {
    for name in FIXTURES {
        let mut msg = Message::open(fixture(name)).unwrap();
        let before = leaf_contents(&msg);

        // Dirty every part so the whole tree is rebuilt.
        for id in msg.walk() {
            msg.add_header(id, "X-Roundtrip", "yes").unwrap();
        }
        let reparsed = roundtrip(&msg);
        assert_eq!(leaf_contents(&reparsed), before, "{name} lost content");
        assert_eq!(
            reparsed.header(PartId::ROOT, "X-Roundtrip").unwrap().value(),
            "yes"
        );
    }
}

#[test]
fn test_tree_shape_after_roundtrip() {
    let mut msg = Message::open(fixture("nested.eml")).unwrap();
    msg.set_header(PartId::ROOT, "Subject", "Edited").unwrap();
    let reparsed = roundtrip(&msg);

    let shape = |m: &Message| -> Vec<String> {
        m.walk()
            .into_iter()
            .map(|id| m.content_type(id).unwrap().essence())
            .collect()
    };
    assert_eq!(shape(&reparsed), shape(&msg));
    assert_eq!(reparsed.attachment_count(), 2);
    assert_eq!(reparsed.header_value("Subject").unwrap(), "Edited");
}

#[test]
fn test_replaced_content_is_reencoded() {
    let mut msg = Message::open(fixture("nested.eml")).unwrap();
    let att = msg.attachment_part(0).unwrap();
    let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    msg.set_content(att, payload.clone()).unwrap();

    let bytes = msg.to_bytes().unwrap();
    let reparsed = Message::parse(bytes.clone());
    let att = reparsed.attachment_part(0).unwrap();
    assert_eq!(reparsed.content(att).unwrap(), payload);

    // Base64 lines stay within 76 columns.
    let body = reparsed.part(att).unwrap().content_range().unwrap();
    for line in bytes[body].split(|&b| b == b'\n') {
        assert!(line.len() <= 77);
    }
}

#[test]
fn test_compose_from_scratch() {
    let mut msg = Message::new();
    msg.set_header(PartId::ROOT, "From", "José Pérez <jose@example.com>").unwrap();
    msg.set_header(PartId::ROOT, "Subject", "Grüße").unwrap();
    msg.set_text_part("Hello\nWorld\n").unwrap();
    msg.set_html_part("<p>Hello</p>").unwrap();
    msg.add_attachment(b"PK\x03\x04zip".to_vec(), "application/zip", "a.zip", TransferEncoding::Base64)
        .unwrap();

    let reparsed = roundtrip(&msg);
    assert!(reparsed.content_type(PartId::ROOT).unwrap().is("multipart/mixed"));
    assert_eq!(reparsed.person_name("From").as_deref(), Some("José Pérez"));
    assert_eq!(reparsed.email("From").as_deref(), Some("jose@example.com"));
    assert_eq!(reparsed.header_value("Subject").unwrap(), "Grüße");
    assert_eq!(reparsed.text_content(0).unwrap(), "Hello\r\nWorld\r\n");
    assert_eq!(reparsed.html_content(0).unwrap(), "<p>Hello</p>");
    assert_eq!(reparsed.attachment_count(), 1);
    let att = reparsed.attachment_part(0).unwrap();
    assert_eq!(reparsed.content(att).unwrap(), b"PK\x03\x04zip");
    assert_eq!(reparsed.filename(att).as_deref(), Some("a.zip"));
}

#[test]
fn test_remove_attachment_roundtrip() {
    let mut msg = Message::open(fixture("nested.eml")).unwrap();
    msg.remove_attachment(0).unwrap();
    let reparsed = roundtrip(&msg);
    assert_eq!(reparsed.attachment_count(), 1);
    assert_eq!(
        reparsed.filename(reparsed.attachment_part(0).unwrap()).as_deref(),
        Some("blüe.png")
    );
    assert_eq!(reparsed.text_content(0).unwrap(), "Plain body.");
}

#[test]
fn test_save_to_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    let out = dir.child("out.eml");
    let mut msg = Message::open(fixture("simple.eml")).unwrap();
    msg.set_header(PartId::ROOT, "Subject", "Saved").unwrap();
    msg.save(out.path(), &WriteOptions::default()).unwrap();

    out.assert(predicate::path::is_file());
    out.assert(predicate::str::contains("Subject: Saved\r\n"));
    out.assert(predicate::str::contains("Message-ID: <simple.1@example.com>\r\n"));
}

#[test]
fn test_custom_boundary_prefix() {
    let mut msg = Message::new();
    msg.set_text_part("body").unwrap();
    msg.add_attachment(b"x".to_vec(), "text/csv", "x.csv", TransferEncoding::SevenBit)
        .unwrap();
    let options = WriteOptions {
        boundary_prefix: "custom-".to_string(),
        ..WriteOptions::default()
    };
    let mut out = Vec::new();
    msg.write_to(&mut out, &options).unwrap();
    let reparsed = Message::parse(out);
    let boundary = reparsed.part(PartId::ROOT).unwrap().boundary().unwrap();
    assert!(boundary.starts_with("custom-"));
}
