//! Integration tests for the part tree parser, header decoding, and the
//! content decode pipeline.

use std::path::Path;

use mimeshell::model::{AttachmentInfo, HeaderValue};
use mimeshell::{Message, MimeError, PartId};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn open(name: &str) -> Message {
    Message::open(fixture(name)).unwrap()
}

fn content_types(msg: &Message) -> Vec<String> {
    msg.walk()
        .into_iter()
        .map(|id| msg.content_type(id).unwrap().essence())
        .collect()
}

// ─── Headers ────────────────────────────────────────────────────────

#[test]
fn test_encoded_display_names_b_and_q() {
    let msg = open("simple.eml");

    // From uses a B-encoded word, To a Q-encoded ISO-8859-1 word.
    assert_eq!(msg.person_name("From").as_deref(), Some("José Pérez"));
    assert_eq!(msg.email("From").as_deref(), Some("jose@example.com"));

    let to = msg.parsed_header(PartId::ROOT, "To").unwrap().as_addresses().unwrap();
    let mailboxes: Vec<_> = to.mailboxes().collect();
    assert_eq!(mailboxes.len(), 2);
    assert_eq!(mailboxes[0].name.as_deref(), Some("José Pérez"));
    assert_eq!(mailboxes[0].address, "jose.perez@example.org");
    assert_eq!(mailboxes[1].name, None);
    assert_eq!(mailboxes[1].address, "plain@example.net");
}

#[test]
fn test_group_addresses() {
    let msg = open("simple.eml");
    let cc = msg.parsed_header(PartId::ROOT, "Cc").unwrap().as_addresses().unwrap();
    let groups: Vec<_> = cc.groups().collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Team");
    assert_eq!(groups[0].members.len(), 2);
    assert_eq!(groups[0].members[0].name.as_deref(), Some("Ana García"));
    let flat: Vec<&str> = cc.mailboxes().map(|m| m.address.as_str()).collect();
    assert_eq!(flat, vec!["ana@example.com", "bob@example.com"]);
}

#[test]
fn test_unstructured_and_typed_headers() {
    let msg = open("simple.eml");
    assert_eq!(msg.header_value("Subject").unwrap(), "Café con leche");

    let date = msg.parsed_header(PartId::ROOT, "Date").unwrap().as_date().unwrap();
    assert_eq!(date.to_rfc3339(), "2024-05-14T09:30:00+02:00");

    let ids = msg
        .parsed_header(PartId::ROOT, "Message-ID")
        .unwrap()
        .as_identifiers()
        .unwrap();
    assert_eq!(ids, &["<simple.1@example.com>".to_string()]);
}

#[test]
fn test_missing_header_is_not_found() {
    let msg = open("simple.eml");
    let err = msg.header_value("X-Absent").unwrap_err();
    assert!(matches!(err, MimeError::HeaderNotFound(_)));
    assert!(err.is_not_found());
    assert!(msg.header(PartId::ROOT, "X-Absent").is_none());
}

#[test]
fn test_unparseable_date_keeps_raw() {
    let msg = Message::parse(b"Date: sometime last week\r\n\r\nbody".to_vec());
    let header = msg.header(PartId::ROOT, "Date").unwrap();
    assert_eq!(header.value(), "sometime last week");
    assert_eq!(header.parsed(msg.converter()), &HeaderValue::Date(None));
}

// ─── Tree shape ─────────────────────────────────────────────────────

#[test]
fn test_nested_tree_shape() {
    let msg = open("nested.eml");
    assert_eq!(
        content_types(&msg),
        vec![
            "multipart/mixed",
            "multipart/alternative",
            "text/plain",
            "text/html",
            "image/png",
            "image/png",
        ]
    );
    assert_eq!(msg.attachment_count(), 2);
    assert_eq!(msg.text_content(0).unwrap(), "Plain body.");
    assert_eq!(
        msg.html_content(0).unwrap(),
        "<html><body><p>HTML body.</p></body></html>"
    );
}

#[test]
fn test_attachment_content_and_names() {
    let msg = open("nested.eml");
    let red = std::fs::read(fixture("red.png")).unwrap();
    let blue = std::fs::read(fixture("blue.png")).unwrap();

    let first = msg.attachment_part(0).unwrap();
    assert_eq!(msg.filename(first).as_deref(), Some("red.png"));
    assert_eq!(msg.content(first).unwrap(), red);

    // RFC 2231 continuation with a charset on the first segment.
    let second = msg.attachment_part(1).unwrap();
    assert_eq!(msg.filename(second).as_deref(), Some("blüe.png"));
    assert_eq!(msg.content(second).unwrap(), blue);

    let infos = AttachmentInfo::collect(&msg);
    assert_eq!(infos[1].filename, "blüe.png");
    assert_eq!(infos[1].encoding, "base64");

    assert!(matches!(
        msg.attachment_part(2),
        Err(MimeError::PartNotFound { index: 2, .. })
    ));
}

#[test]
fn test_nth_text_part_selection() {
    let msg = open("two_text.eml");
    assert_eq!(msg.text_part_count(), 2);
    let first = msg.text_content(0).unwrap();
    let second = msg.text_content(1).unwrap();
    assert_eq!(first, "First text body.");
    assert_eq!(second, "Second text body.");
    assert_ne!(msg.text_part(0).unwrap(), msg.text_part(1).unwrap());
    assert!(msg.text_part(2).unwrap_err().is_not_found());

    // The forwarded message counts as one attachment.
    assert_eq!(msg.attachment_count(), 1);
    let forwarded = msg.attachment_part(0).unwrap();
    assert!(msg.content_type(forwarded).unwrap().is("message/rfc822"));
}

#[test]
fn test_truncated_multipart_is_tolerated() {
    let msg = open("truncated.eml");
    assert_eq!(msg.text_part_count(), 2);
    assert_eq!(msg.text_content(0).unwrap(), "complete part");
    assert_eq!(
        msg.text_content(1).unwrap(),
        "this part never ends\r\nand the closing delimiter is missing\r\n"
    );
}

#[test]
fn test_lf_only_input() {
    let msg = open("uuencode.eml");
    assert_eq!(content_types(&msg).len(), 3);
    assert_eq!(msg.text_content(0).unwrap(), "see attachment");
}

// ─── Decoding ───────────────────────────────────────────────────────

#[test]
fn test_quoted_printable_body() {
    let mut msg = open("simple.eml");
    assert_eq!(
        msg.text_content(0).unwrap(),
        "Hola José,\r\nthis line is soft wrapped.\r\n"
    );
    msg.set_normalize_newlines(true);
    assert_eq!(
        msg.text_content(0).unwrap(),
        "Hola José,\nthis line is soft wrapped.\n"
    );
}

#[test]
fn test_charset_override() {
    let mut msg = open("wrong_charset.eml");
    let declared = msg.text_content(0).unwrap();
    assert!(declared.contains('\u{fffd}'));

    msg.set_charset_override(Some("iso-8859-1"));
    assert_eq!(msg.text_content(0).unwrap(), "Grüße aus Köln\r\n");

    // Raw header and binary content are unaffected.
    assert_eq!(
        msg.header(PartId::ROOT, "Content-Type").unwrap().value(),
        "text/plain; charset=utf-8"
    );
    let raw = msg.content(msg.text_part(0).unwrap()).unwrap();
    assert_eq!(raw, "Grüße aus Köln\r\n".chars().map(|c| c as u8).collect::<Vec<u8>>());

    msg.set_charset_override(None);
    assert_eq!(msg.text_content(0).unwrap(), declared);
}

#[test]
fn test_uuencoded_attachment() {
    let msg = open("uuencode.eml");
    let att = msg.attachment_part(0).unwrap();
    assert_eq!(msg.filename(att).as_deref(), Some("payload.txt"));
    assert_eq!(msg.content(att).unwrap(), b"uuencoded payload\n".repeat(4));
}

#[test]
fn test_stream_rewind() {
    use std::io::Read;

    let msg = open("nested.eml");
    let att = msg.attachment_part(0).unwrap();
    let mut stream = msg.content_stream(att).unwrap();
    let mut first = Vec::new();
    stream.read_to_end(&mut first).unwrap();
    stream.rewind();
    let mut second = Vec::new();
    stream.read_to_end(&mut second).unwrap();
    assert_eq!(first, second);
    assert!(first.starts_with(b"\x89PNG"));
}

#[test]
fn test_independent_streams() {
    use std::io::Read;

    let msg = open("nested.eml");
    let mut a = msg.content_stream(msg.attachment_part(0).unwrap()).unwrap();
    let mut b = msg.content_stream(msg.attachment_part(1).unwrap()).unwrap();
    let mut buf_a = [0u8; 4];
    let mut buf_b = [0u8; 4];
    a.read_exact(&mut buf_a).unwrap();
    b.read_exact(&mut buf_b).unwrap();
    assert_eq!(buf_a, buf_b);
    assert_eq!(&buf_a, b"\x89PNG");
}

// ─── Sources ────────────────────────────────────────────────────────

#[test]
fn test_open_missing_file() {
    let err = Message::open(fixture("does-not-exist.eml")).unwrap_err();
    assert!(matches!(err, MimeError::FileNotFound(_) | MimeError::Io { .. }));
}

#[test]
fn test_from_reader_matches_open() {
    let bytes = std::fs::read(fixture("nested.eml")).unwrap();
    let from_reader = Message::from_reader(bytes.as_slice()).unwrap();
    let opened = open("nested.eml");
    assert_eq!(content_types(&from_reader), content_types(&opened));
}

#[test]
fn test_mbox_from_line_is_skipped() {
    let mut data = b"From sender@example.com Tue May 14 09:30:00 2024\n".to_vec();
    data.extend_from_slice(&std::fs::read(fixture("simple.eml")).unwrap());
    let msg = Message::parse(data);
    assert_eq!(msg.header_value("Subject").unwrap(), "Café con leche");
}
