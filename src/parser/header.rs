//! RFC 5322 header values: encoded words (RFC 2047), header classes, and
//! the per-class parsers for identifiers and unstructured text.
//!
//! Address lists, parameterized values and dates live in their own modules;
//! [`parse_header_value`] picks the right one by header name.

use base64::Engine;
use tracing::{trace, warn};

use crate::decode::charset::TextConverter;
use crate::decode::transfer::LENIENT_BASE64;
use crate::model::header::HeaderValue;
use crate::parser::lexer::{split_encoded_word, Lexer, TokenKind, IDENTIFIER_SPECIALS};
use crate::parser::{address, date, params};

/// Semantic class of a header, selecting its value parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    Address,
    Parameterized,
    Identifier,
    Date,
    Unstructured,
}

const HEADER_CLASSES: &[(&str, HeaderClass)] = &[
    ("from", HeaderClass::Address),
    ("to", HeaderClass::Address),
    ("cc", HeaderClass::Address),
    ("bcc", HeaderClass::Address),
    ("reply-to", HeaderClass::Address),
    ("sender", HeaderClass::Address),
    ("return-path", HeaderClass::Address),
    ("resent-from", HeaderClass::Address),
    ("resent-to", HeaderClass::Address),
    ("resent-cc", HeaderClass::Address),
    ("resent-bcc", HeaderClass::Address),
    ("resent-sender", HeaderClass::Address),
    ("disposition-notification-to", HeaderClass::Address),
    ("content-type", HeaderClass::Parameterized),
    ("content-disposition", HeaderClass::Parameterized),
    ("message-id", HeaderClass::Identifier),
    ("content-id", HeaderClass::Identifier),
    ("in-reply-to", HeaderClass::Identifier),
    ("references", HeaderClass::Identifier),
    ("resent-message-id", HeaderClass::Identifier),
    ("date", HeaderClass::Date),
    ("resent-date", HeaderClass::Date),
];

impl HeaderClass {
    /// Class for a header name (case-insensitive). Unknown names are unstructured.
    pub fn for_name(name: &str) -> Self {
        let name = name.trim();
        HEADER_CLASSES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, class)| *class)
            .unwrap_or(Self::Unstructured)
    }
}

/// Parse a header value according to the class of `name`.
///
/// Never fails: malformed values degrade to the coarsest representation
/// their class has.
pub fn parse_header_value(name: &str, value: &str, converter: &dyn TextConverter) -> HeaderValue {
    match HeaderClass::for_name(name) {
        HeaderClass::Address => HeaderValue::Addresses(address::parse_address_list(value, converter)),
        HeaderClass::Parameterized => {
            HeaderValue::Parameterized(params::parse_parameterized(value, converter))
        }
        HeaderClass::Identifier => HeaderValue::Identifiers(parse_identifiers(value)),
        HeaderClass::Date => HeaderValue::Date(date::parse_date(value)),
        HeaderClass::Unstructured => HeaderValue::Text(decode_encoded_words(value.trim(), converter)),
    }
}

// ── Encoded words ───────────────────────────────────────────────

/// Decode RFC 2047 encoded words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Adjacent words in the same charset are joined at the byte level before
/// conversion, so a multibyte character split across two words survives.
/// A word that cannot be decoded is kept as literal text.
pub fn decode_encoded_words(input: &str, converter: &dyn TextConverter) -> String {
    let mut result = String::with_capacity(input.len());
    let mut pending: Option<(String, Vec<u8>)> = None;
    let mut remaining = input;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        match decode_word(&remaining[start..], converter) {
            Some((charset, bytes, consumed)) => {
                // Whitespace between two encoded words is dropped (RFC 2047 §6.2).
                let adjacent = pending.is_some() && before.bytes().all(|b| b.is_ascii_whitespace());
                if !adjacent {
                    flush_pending(&mut pending, &mut result, converter);
                    result.push_str(before);
                }
                match &mut pending {
                    Some((cs, buf)) if cs.eq_ignore_ascii_case(&charset) => buf.extend(bytes),
                    _ => {
                        flush_pending(&mut pending, &mut result, converter);
                        pending = Some((charset, bytes));
                    }
                }
                remaining = &remaining[start + consumed..];
            }
            None => {
                flush_pending(&mut pending, &mut result, converter);
                result.push_str(&remaining[..start + 2]);
                remaining = &remaining[start + 2..];
            }
        }
    }

    flush_pending(&mut pending, &mut result, converter);
    result.push_str(remaining);
    result
}

fn flush_pending(
    pending: &mut Option<(String, Vec<u8>)>,
    out: &mut String,
    converter: &dyn TextConverter,
) {
    if let Some((charset, bytes)) = pending.take() {
        out.push_str(&converter.convert(&bytes, &charset));
    }
}

/// Decode the encoded word at the start of `s` to `(charset, bytes, consumed)`.
fn decode_word(s: &str, converter: &dyn TextConverter) -> Option<(String, Vec<u8>, usize)> {
    let word = split_encoded_word(s)?;
    // RFC 2231 §5 allows `charset*language`.
    let charset = word.charset.split('*').next().unwrap_or(word.charset);
    if !converter.is_supported(charset) {
        trace!(charset, "Encoded word with unknown charset kept literally");
        return None;
    }
    let bytes = match word.encoding {
        'B' => match LENIENT_BASE64.decode(word.text.trim_end_matches('=')) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(word = &s[..word.len], error = %e, "Malformed encoded word");
                return None;
            }
        },
        _ => decode_q_encoding(word.text),
    };
    Some((charset.to_string(), bytes, word.len))
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

// ── Identifiers ─────────────────────────────────────────────────

/// Extract `<...>` identifiers verbatim, brackets included.
///
/// Comments and whitespace between identifiers are skipped. A bare
/// `local@domain` without brackets is kept as found; an unterminated `<`
/// runs to the end of the value.
pub fn parse_identifiers(value: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut current: Option<String> = None;

    for token in Lexer::new(value, IDENTIFIER_SPECIALS) {
        match token.kind {
            TokenKind::Special(b'<') if current.is_none() => current = Some(String::from("<")),
            TokenKind::Special(b'>') => {
                if let Some(mut id) = current.take() {
                    id.push('>');
                    ids.push(id);
                }
            }
            TokenKind::Whitespace | TokenKind::Comment => {}
            _ => match current.as_mut() {
                Some(id) => id.push_str(token.text),
                None if token.kind == TokenKind::Atom && token.text.contains('@') => {
                    ids.push(token.text.to_string());
                }
                None => {}
            },
        }
    }
    if let Some(id) = current {
        if id.len() > 1 {
            ids.push(id);
        }
    }
    ids
}
