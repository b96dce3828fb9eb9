//! Single-pass lexer for structured header values.
//!
//! Produces atoms, quoted strings, comments (nested), RFC 2047 encoded
//! words, special characters and whitespace runs. Which ASCII characters
//! count as specials depends on the header class being parsed, so the set
//! is supplied by the caller.

use std::borrow::Cow;
use std::ops::Range;

/// Specials for address lists (RFC 5322 §3.2.3, minus `.` and `"`/`(`
/// which are handled separately).
pub const ADDRESS_SPECIALS: &[u8] = b"<>[]:;@,";

/// `tspecials` for Content-Type style values (RFC 2045 §5.1).
pub const PARAMETER_SPECIALS: &[u8] = b"<>@,;:/[]?=";

/// Specials for `<id>` lists.
pub const IDENTIFIER_SPECIALS: &[u8] = b"<>,";

/// Lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Atom,
    Quoted,
    Comment,
    EncodedWord,
    Special(u8),
    Whitespace,
}

/// One lexical token with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Source text including delimiters.
    pub text: &'a str,
    pub span: Range<usize>,
}

impl<'a> Token<'a> {
    /// Semantic value: quoted strings and comments lose their delimiters
    /// and backslash escapes, everything else is the source text.
    pub fn value(&self) -> Cow<'a, str> {
        match self.kind {
            TokenKind::Quoted => unescape(strip_delims(self.text, '"', '"')),
            TokenKind::Comment => unescape(strip_delims(self.text, '(', ')')),
            _ => Cow::Borrowed(self.text),
        }
    }

    pub fn is_special(&self, c: u8) -> bool {
        self.kind == TokenKind::Special(c)
    }
}

fn strip_delims(s: &str, open: char, close: char) -> &str {
    let s = s.strip_prefix(open).unwrap_or(s);
    s.strip_suffix(close).unwrap_or(s)
}

fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Iterator over the tokens of a header value.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    specials: &'static [u8],
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, specials: &'static [u8]) -> Self {
        Self {
            input,
            pos: 0,
            specials,
        }
    }

    // `=?` can only open an encoded word when `?` is not a special.
    fn encoded_words_allowed(&self) -> bool {
        !self.specials.contains(&b'?')
    }

    fn is_atom_byte(&self, b: u8) -> bool {
        !is_ws(b) && b != b'"' && b != b'(' && !self.specials.contains(&b)
    }

    fn scan_quoted(&self, start: usize) -> usize {
        let bytes = self.input.as_bytes();
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => return i + 1,
                _ => i += 1,
            }
        }
        bytes.len()
    }

    fn scan_comment(&self, start: usize) -> usize {
        let bytes = self.input.as_bytes();
        let mut depth = 0usize;
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        bytes.len()
    }

    fn scan_atom(&self, start: usize) -> usize {
        let bytes = self.input.as_bytes();
        let mut i = start;
        while i < bytes.len() && self.is_atom_byte(bytes[i]) {
            // A glued-on encoded word starts a new token.
            if i > start
                && bytes[i] == b'='
                && self.encoded_words_allowed()
                && encoded_word_len(&self.input[i..]).is_some()
            {
                break;
            }
            i += 1;
        }
        i
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let &b = bytes.get(start)?;

        let (kind, end) = if is_ws(b) {
            let mut i = start;
            while i < bytes.len() && is_ws(bytes[i]) {
                i += 1;
            }
            (TokenKind::Whitespace, i)
        } else if b == b'"' {
            (TokenKind::Quoted, self.scan_quoted(start))
        } else if b == b'(' {
            (TokenKind::Comment, self.scan_comment(start))
        } else if self.specials.contains(&b) {
            (TokenKind::Special(b), start + 1)
        } else if let Some(len) = self
            .encoded_words_allowed()
            .then(|| encoded_word_len(&self.input[start..]))
            .flatten()
        {
            (TokenKind::EncodedWord, start + len)
        } else {
            (TokenKind::Atom, self.scan_atom(start))
        };

        // Escapes can step past the end of an unterminated token.
        let end = end.min(bytes.len());
        self.pos = end;
        Some(Token {
            kind,
            text: &self.input[start..end],
            span: start..end,
        })
    }
}

/// Tokenize `input`, dropping nothing.
pub fn tokenize<'a>(input: &'a str, specials: &'static [u8]) -> Vec<Token<'a>> {
    Lexer::new(input, specials).collect()
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Parts of an encoded word: `=?charset?encoding?text?=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedWordParts<'a> {
    pub charset: &'a str,
    pub encoding: char,
    pub text: &'a str,
    pub len: usize,
}

/// Split an encoded word at the start of `s`, if there is a well-formed one.
pub fn split_encoded_word(s: &str) -> Option<EncodedWordParts<'_>> {
    let rest = s.strip_prefix("=?")?;
    let q1 = rest.find('?')?;
    let charset = &rest[..q1];
    let rest = &rest[q1 + 1..];
    let q2 = rest.find('?')?;
    let encoding = &rest[..q2];
    let rest = &rest[q2 + 1..];
    let end = rest.find("?=")?;
    let text = &rest[..end];

    let mut enc_chars = encoding.chars();
    let encoding = match (enc_chars.next(), enc_chars.next()) {
        (Some(c), None) if matches!(c, 'B' | 'b' | 'Q' | 'q') => c.to_ascii_uppercase(),
        _ => return None,
    };
    let no_space = |t: &str| !t.bytes().any(is_ws);
    if charset.is_empty() || !no_space(charset) || !no_space(text) {
        return None;
    }

    Some(EncodedWordParts {
        charset,
        encoding,
        text,
        len: 2 + q1 + 1 + 1 + 1 + end + 2,
    })
}

pub(crate) fn encoded_word_len(s: &str) -> Option<usize> {
    split_encoded_word(s).map(|w| w.len)
}
