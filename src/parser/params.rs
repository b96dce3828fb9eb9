//! Parameterized header values (`Content-Type`, `Content-Disposition`)
//! with RFC 2231 extended parameters and continuations.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

use crate::decode::charset::TextConverter;
use crate::model::content_type::ParameterizedValue;
use crate::parser::header::decode_encoded_words;
use crate::parser::lexer::{tokenize, Token, TokenKind, PARAMETER_SPECIALS};

/// Parse `main-token; name=value; ...`.
///
/// Parameter names are lowercased. When a parameter appears in both plain
/// and RFC 2231 form, the RFC 2231 form wins.
pub fn parse_parameterized(value: &str, converter: &dyn TextConverter) -> ParameterizedValue {
    let tokens = tokenize(value, PARAMETER_SPECIALS);
    let mut segments = tokens.split(|t| t.is_special(b';'));

    let main = segments
        .next()
        .map(significant_text)
        .unwrap_or_default();

    let mut collector = ParamCollector::default();
    for seg in segments {
        let Some(eq) = seg.iter().position(|t| t.is_special(b'=')) else {
            continue;
        };
        let name = significant_text(&seg[..eq]).to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        collector.push(&name, param_value(&seg[eq + 1..]));
    }

    ParameterizedValue {
        value: main,
        params: collector.assemble(converter),
    }
}

/// Source text of the tokens without comments and whitespace.
fn significant_text(tokens: &[Token<'_>]) -> String {
    tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))
        .map(|t| t.text)
        .collect()
}

/// A parameter value as written: unquoted, unescaped, folds removed.
/// Unquoted values may contain tspecials (`boundary=----=_Part_1`).
fn param_value(tokens: &[Token<'_>]) -> RawParam {
    let significant: Vec<&Token<'_>> = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))
        .collect();
    match significant.as_slice() {
        [only] if only.kind == TokenKind::Quoted => RawParam {
            text: only.value().replace(['\r', '\n'], ""),
            quoted: true,
        },
        _ => RawParam {
            text: significant_text(tokens),
            quoted: false,
        },
    }
}

struct RawParam {
    text: String,
    quoted: bool,
}

/// One `name*N[*]` segment.
struct Segment {
    extended: bool,
    text: String,
}

#[derive(Default)]
struct ParamEntry {
    plain: Option<RawParam>,
    extended: Option<String>,
    segments: BTreeMap<u32, Segment>,
}

#[derive(Default)]
struct ParamCollector {
    order: Vec<String>,
    entries: BTreeMap<String, ParamEntry>,
}

impl ParamCollector {
    fn entry(&mut self, base: &str) -> &mut ParamEntry {
        if !self.entries.contains_key(base) {
            self.order.push(base.to_string());
        }
        self.entries.entry(base.to_string()).or_default()
    }

    fn push(&mut self, name: &str, raw: RawParam) {
        match split_rfc2231_name(name) {
            NameForm::Plain(base) => {
                let entry = self.entry(base);
                entry.plain.get_or_insert(raw);
            }
            NameForm::Extended(base) => {
                let entry = self.entry(base);
                entry.extended.get_or_insert(raw.text);
            }
            NameForm::Continuation {
                base,
                index,
                extended,
            } => {
                self.entry(base).segments.entry(index).or_insert(Segment {
                    extended,
                    text: raw.text,
                });
            }
        }
    }

    fn assemble(mut self, converter: &dyn TextConverter) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.order.len());
        for name in std::mem::take(&mut self.order) {
            let Some(entry) = self.entries.remove(&name) else {
                continue;
            };
            let value = if !entry.segments.is_empty() {
                assemble_segments(entry.segments, converter)
            } else if let Some(ext) = entry.extended {
                decode_extended(&ext, converter)
            } else if let Some(plain) = entry.plain {
                // Some mailers put encoded words in quoted filenames.
                if plain.quoted && plain.text.contains("=?") {
                    decode_encoded_words(&plain.text, converter)
                } else {
                    plain.text
                }
            } else {
                continue;
            };
            out.push((name, value));
        }
        out
    }
}

enum NameForm<'a> {
    Plain(&'a str),
    Extended(&'a str),
    Continuation {
        base: &'a str,
        index: u32,
        extended: bool,
    },
}

fn split_rfc2231_name(name: &str) -> NameForm<'_> {
    let Some((base, rest)) = name.split_once('*') else {
        return NameForm::Plain(name);
    };
    if rest.is_empty() {
        return NameForm::Extended(base);
    }
    let (digits, extended) = match rest.strip_suffix('*') {
        Some(d) => (d, true),
        None => (rest, false),
    };
    match digits.parse::<u32>() {
        Ok(index) if digits.bytes().all(|b| b.is_ascii_digit()) => NameForm::Continuation {
            base,
            index,
            extended,
        },
        _ => NameForm::Plain(name),
    }
}

/// Join continuation segments in ascending index order. Gaps are ignored.
/// The charset comes from the first segment when it is extended.
fn assemble_segments(segments: BTreeMap<u32, Segment>, converter: &dyn TextConverter) -> String {
    let mut charset: Option<String> = None;
    let mut bytes = Vec::new();
    for (i, seg) in segments.into_values().enumerate() {
        if !seg.extended {
            bytes.extend_from_slice(seg.text.as_bytes());
            continue;
        }
        let mut text = seg.text.as_str();
        if i == 0 {
            if let Some((cs, value)) = split_charset_prefix(text) {
                charset = Some(cs.to_string()).filter(|c| !c.is_empty());
                text = value;
            }
        }
        bytes.extend(percent_decode_str(text));
    }
    let charset = charset.unwrap_or_else(|| "utf-8".to_string());
    converter.convert(&bytes, &charset)
}

/// Decode a single `name*=charset'lang'value`.
fn decode_extended(text: &str, converter: &dyn TextConverter) -> String {
    let (charset, value) = match split_charset_prefix(text) {
        Some((cs, value)) if !cs.is_empty() => (cs, value),
        Some((_, value)) => ("utf-8", value),
        None => ("utf-8", text),
    };
    let bytes: Vec<u8> = percent_decode_str(value).collect();
    converter.convert(&bytes, charset)
}

/// Split `charset'language'value`.
fn split_charset_prefix(text: &str) -> Option<(&str, &str)> {
    let (charset, rest) = text.split_once('\'')?;
    let (_lang, value) = rest.split_once('\'')?;
    Some((charset, value))
}
