//! Forward transfer encoders and header folding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::decode::TransferEncoding;

/// Line length limit for base64 and quoted-printable bodies.
const BODY_LINE_LENGTH: usize = 76;

/// Raw bytes per uuencoded line.
const UU_LINE_BYTES: usize = 45;

/// Raw bytes per RFC 2047 encoded word; keeps each word under 75 chars.
const ENCODED_WORD_BYTES: usize = 45;

/// Encode decoded `content` for transport with `encoding`.
///
/// `filename` is only used for the uuencode `begin` line.
pub fn encode_body(encoding: &TransferEncoding, content: &[u8], filename: &str) -> Vec<u8> {
    match encoding {
        TransferEncoding::Base64 => encode_base64(content),
        TransferEncoding::QuotedPrintable => encode_quoted_printable(content),
        TransferEncoding::SevenBit | TransferEncoding::EightBit => normalize_crlf(content),
        TransferEncoding::Uuencode => encode_uuencode(content, filename),
        TransferEncoding::Binary | TransferEncoding::Other(_) => content.to_vec(),
    }
}

/// Base64 in 76-column lines joined with CRLF, no trailing line break.
pub fn encode_base64(content: &[u8]) -> Vec<u8> {
    let encoded = STANDARD.encode(content);
    let mut out = Vec::with_capacity(encoded.len() + encoded.len() / BODY_LINE_LENGTH * 2);
    for (i, line) in encoded.as_bytes().chunks(BODY_LINE_LENGTH).enumerate() {
        if i > 0 {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(line);
    }
    out
}

/// Quoted-printable with soft breaks at 76 columns. Line breaks in the
/// input (LF or CRLF) become CRLF hard breaks.
pub fn encode_quoted_printable(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() * 11 / 10);
    let mut lines = content.split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        let last = lines.peek().is_none();
        let line = if last {
            line
        } else {
            line.strip_suffix(b"\r").unwrap_or(line)
        };
        encode_qp_line(line, &mut out);
        if !last {
            out.extend_from_slice(b"\r\n");
        }
    }
    out
}

fn encode_qp_line(line: &[u8], out: &mut Vec<u8>) {
    let mut column = 0;
    for (i, &b) in line.iter().enumerate() {
        let at_end = i + 1 == line.len();
        let literal = match b {
            b' ' | b'\t' => !at_end,
            b'=' => false,
            33..=126 => true,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };
        // Leave room for the soft break `=` unless this is the last token.
        let limit = if at_end {
            BODY_LINE_LENGTH
        } else {
            BODY_LINE_LENGTH - 1
        };
        if column + width > limit {
            out.extend_from_slice(b"=\r\n");
            column = 0;
        }
        if literal {
            out.push(b);
        } else {
            out.extend_from_slice(format!("={b:02X}").as_bytes());
        }
        column += width;
    }
}

/// Bare LF (and lone CR) become CRLF.
pub fn normalize_crlf(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + content.len() / 40);
    let mut i = 0;
    while i < content.len() {
        match content[i] {
            b'\r' => {
                out.extend_from_slice(b"\r\n");
                if content.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => out.extend_from_slice(b"\r\n"),
            b => out.push(b),
        }
        i += 1;
    }
    out
}

/// Uuencode with `begin 644 <filename>` / `end` framing.
pub fn encode_uuencode(content: &[u8], filename: &str) -> Vec<u8> {
    let mut out = format!("begin 644 {filename}\r\n").into_bytes();
    for chunk in content.chunks(UU_LINE_BYTES) {
        out.push(uu_char(chunk.len() as u8));
        for group in chunk.chunks(3) {
            let b = [
                group[0],
                group.get(1).copied().unwrap_or(0),
                group.get(2).copied().unwrap_or(0),
            ];
            out.push(uu_char(b[0] >> 2));
            out.push(uu_char((b[0] << 4 | b[1] >> 4) & 0x3f));
            out.push(uu_char((b[1] << 2 | b[2] >> 6) & 0x3f));
            out.push(uu_char(b[2] & 0x3f));
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"`\r\nend\r\n");
    out
}

fn uu_char(v: u8) -> u8 {
    if v == 0 {
        b'`'
    } else {
        b' ' + v
    }
}

// ── Headers ─────────────────────────────────────────────────────

/// RFC 2047 B-encode the non-ASCII words of a header value.
///
/// Consecutive non-ASCII words share one run of encoded words so the space
/// between them survives decoding. Quotes around an encoded word are
/// dropped.
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    let words: Vec<&str> = value.split(' ').collect();
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if words[i].is_ascii() {
            out.push(words[i].to_string());
            i += 1;
            continue;
        }
        let start = i;
        while i < words.len() && !words[i].is_ascii() {
            i += 1;
        }
        let run = words[start..i].join(" ");
        out.push(encode_words(unquote(&run)));
    }
    out.join(" ")
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// One or more `=?utf-8?B?...?=` words, split on char boundaries.
fn encode_words(text: &str) -> String {
    let mut words = Vec::new();
    let mut chunk_start = 0;
    let mut chunk_end = 0;
    for (idx, ch) in text.char_indices() {
        let next = idx + ch.len_utf8();
        if next - chunk_start > ENCODED_WORD_BYTES && chunk_end > chunk_start {
            words.push(encoded_word(&text[chunk_start..chunk_end]));
            chunk_start = chunk_end;
        }
        chunk_end = next;
    }
    if chunk_end > chunk_start {
        words.push(encoded_word(&text[chunk_start..chunk_end]));
    }
    words.join(" ")
}

fn encoded_word(text: &str) -> String {
    format!("=?utf-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

/// Render `Name: value` folded at whitespace so lines stay within
/// `line_length` where possible. Ends with CRLF. Quoted strings are never
/// folded.
pub fn fold_header(name: &str, value: &str, line_length: usize) -> Vec<u8> {
    let value = encode_header_value(value.trim());
    let mut out = String::with_capacity(name.len() + value.len() + 8);
    let mut line = format!("{name}:");
    let mut in_quote = false;
    let mut first = true;

    for word in value.split(' ') {
        let can_fold = !first && !in_quote && !word.is_empty();
        if can_fold && line.len() + 1 + word.len() > line_length {
            out.push_str(&line);
            out.push_str("\r\n");
            line.clear();
        }
        line.push(' ');
        line.push_str(word);
        in_quote ^= unescaped_quotes(word) % 2 == 1;
        first = false;
    }
    out.push_str(&line);
    out.push_str("\r\n");
    out.into_bytes()
}

fn unescaped_quotes(word: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in word.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => count += 1,
            _ => escaped = false,
        }
    }
    count
}
