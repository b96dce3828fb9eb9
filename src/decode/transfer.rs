//! Streaming Content-Transfer-Encoding decoders.
//!
//! Each decoder wraps another reader and decodes on demand. None of them
//! fail on malformed input: invalid base64 characters are skipped, broken
//! quoted-printable escapes are kept literally, and an uuencoded body with
//! no `begin` line decodes to nothing.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::{trace, warn};

use crate::parser::eml::trim_eol;

/// Size of each pull from the wrapped reader.
const CHUNK_SIZE: usize = 8 * 1024;

/// Base64 engine that accepts missing padding and non-zero trailing bits.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Transfer encoding named by a `Content-Transfer-Encoding` header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Raw binary.
    Binary,
    /// Base64 (RFC 2045 §6.8).
    Base64,
    /// Quoted-Printable (RFC 2045 §6.7).
    QuotedPrintable,
    /// `x-uuencode` and its aliases.
    Uuencode,
    /// Anything else; treated as identity.
    Other(String),
}

impl TransferEncoding {
    /// Parses a transfer encoding name. Unknown names map to [`Self::Other`].
    pub fn parse(s: &str) -> Self {
        let name = s.trim().trim_matches('"').to_ascii_lowercase();
        match name.as_str() {
            "" | "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "x-uuencode" | "uuencode" | "x-uue" | "uue" => Self::Uuencode,
            _ => Self::Other(name),
        }
    }

    /// `true` for encodings whose decoded form equals the encoded form.
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            Self::SevenBit | Self::EightBit | Self::Binary | Self::Other(_)
        )
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Binary => write!(f, "binary"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Uuencode => write!(f, "x-uuencode"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Wrap `inner` in the decoder for `encoding`.
pub fn decoder_for<'a, R: Read + 'a>(encoding: &TransferEncoding, inner: R) -> Box<dyn Read + 'a> {
    match encoding {
        TransferEncoding::Base64 => Box::new(Base64Decoder::new(inner)),
        TransferEncoding::QuotedPrintable => Box::new(QuotedPrintableDecoder::new(inner)),
        TransferEncoding::Uuencode => Box::new(UuDecoder::new(inner)),
        TransferEncoding::Other(name) => {
            trace!(encoding = %name, "Unknown transfer encoding, reading as identity");
            Box::new(inner)
        }
        _ => Box::new(inner),
    }
}

/// Output buffer shared by the line- and chunk-oriented decoders.
#[derive(Default)]
struct Pending {
    buf: Vec<u8>,
    pos: usize,
}

impl Pending {
    fn is_drained(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    fn copy_to(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

// ── Base64 ──────────────────────────────────────────────────────

/// Streaming base64 decoder. Whitespace and foreign bytes are ignored.
pub struct Base64Decoder<R> {
    inner: R,
    quads: Vec<u8>,
    out: Pending,
    eof: bool,
}

impl<R: Read> Base64Decoder<R> {
    /// Decode base64 read from `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            quads: Vec::new(),
            out: Pending::default(),
            eof: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        self.out.reset();
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = self.inner.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
            self.close_group();
            return Ok(());
        }
        for &b in &chunk[..n] {
            if is_base64_symbol(b) {
                self.quads.push(b);
            } else if b == b'=' && self.quads.len() % 4 != 0 {
                // Padding ends the quad, even when more base64 follows it.
                self.close_group();
            }
        }
        let usable = self.quads.len() / 4 * 4;
        self.decode_quads(usable);
        Ok(())
    }

    /// Decode everything buffered, including a short final quad.
    fn close_group(&mut self) {
        if self.quads.len() % 4 == 1 {
            // A single dangling sextet carries no full byte.
            self.quads.pop();
        }
        self.decode_quads(self.quads.len());
    }

    fn decode_quads(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if let Err(e) = LENIENT_BASE64.decode_vec(&self.quads[..len], &mut self.out.buf) {
            warn!(error = %e, "Malformed base64 content, skipping block");
        }
        self.quads.drain(..len);
    }
}

fn is_base64_symbol(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

impl<R: Read> Read for Base64Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.out.is_drained() {
            if self.eof {
                return Ok(0);
            }
            self.fill()?;
        }
        Ok(self.out.copy_to(buf))
    }
}

// ── Quoted-printable ────────────────────────────────────────────

/// Streaming quoted-printable decoder. Line endings are kept as found.
pub struct QuotedPrintableDecoder<R> {
    inner: BufReader<R>,
    line: Vec<u8>,
    out: Pending,
    eof: bool,
}

impl<R: Read> QuotedPrintableDecoder<R> {
    /// Decode quoted-printable read from `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            line: Vec::new(),
            out: Pending::default(),
            eof: false,
        }
    }
}

impl<R: Read> Read for QuotedPrintableDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.out.is_drained() {
            if self.eof {
                return Ok(0);
            }
            self.out.reset();
            self.line.clear();
            if self.inner.read_until(b'\n', &mut self.line)? == 0 {
                self.eof = true;
                continue;
            }
            decode_qp_line(&self.line, &mut self.out.buf);
        }
        Ok(self.out.copy_to(buf))
    }
}

/// Decode one quoted-printable line (including its terminator, if any).
pub(crate) fn decode_qp_line(line: &[u8], out: &mut Vec<u8>) {
    let (body, eol): (&[u8], &[u8]) = if let Some(b) = line.strip_suffix(b"\r\n") {
        (b, b"\r\n")
    } else if let Some(b) = line.strip_suffix(b"\n") {
        (b, b"\n")
    } else {
        (line, b"")
    };

    // Trailing whitespace is transport padding.
    let mut end = body.len();
    while end > 0 && matches!(body[end - 1], b' ' | b'\t') {
        end -= 1;
    }
    let mut body = &body[..end];

    let soft_break = body.last() == Some(&b'=');
    if soft_break {
        body = &body[..body.len() - 1];
    }

    let mut i = 0;
    while i < body.len() {
        if body[i] == b'=' {
            if let (Some(hi), Some(lo)) = (
                body.get(i + 1).and_then(|b| hex_value(*b)),
                body.get(i + 2).and_then(|b| hex_value(*b)),
            ) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(body[i]);
        i += 1;
    }

    if !soft_break {
        out.extend_from_slice(eol);
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

// ── Uuencode ────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum UuState {
    BeforeBegin,
    Body,
    Done,
}

/// Best-effort `x-uuencode` decoder.
pub struct UuDecoder<R> {
    inner: BufReader<R>,
    line: Vec<u8>,
    out: Pending,
    state: UuState,
}

impl<R: Read> UuDecoder<R> {
    /// Decode uuencoded data read from `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            line: Vec::new(),
            out: Pending::default(),
            state: UuState::BeforeBegin,
        }
    }

    fn step(&mut self) -> io::Result<()> {
        self.out.reset();
        self.line.clear();
        if self.inner.read_until(b'\n', &mut self.line)? == 0 {
            if self.state == UuState::BeforeBegin {
                warn!("uuencoded content has no 'begin' line");
            }
            self.state = UuState::Done;
            return Ok(());
        }
        let line = trim_eol(&self.line);
        match self.state {
            UuState::BeforeBegin => {
                if line.starts_with(b"begin ") || line == b"begin" {
                    self.state = UuState::Body;
                }
            }
            UuState::Body => {
                if line == b"end" {
                    self.state = UuState::Done;
                } else {
                    decode_uu_line(line, &mut self.out.buf);
                }
            }
            UuState::Done => {}
        }
        Ok(())
    }
}

impl<R: Read> Read for UuDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.out.is_drained() {
            if self.state == UuState::Done {
                return Ok(0);
            }
            self.step()?;
        }
        Ok(self.out.copy_to(buf))
    }
}

fn uu_value(b: u8) -> u8 {
    b.wrapping_sub(b' ') & 0x3f
}

fn decode_uu_line(line: &[u8], out: &mut Vec<u8>) {
    let Some((&len_char, data)) = line.split_first() else {
        return;
    };
    let mut remaining = usize::from(uu_value(len_char));
    for group in data.chunks(4) {
        if remaining == 0 {
            break;
        }
        let mut v = [0u8; 4];
        for (slot, b) in v.iter_mut().zip(group) {
            *slot = uu_value(*b);
        }
        let bytes = [
            v[0] << 2 | v[1] >> 4,
            v[1] << 4 | v[2] >> 2,
            v[2] << 6 | v[3],
        ];
        let take = remaining.min(3);
        out.extend_from_slice(&bytes[..take]);
        remaining -= take;
    }
}

// ── Newline normalization ───────────────────────────────────────

/// Converts CRLF and lone CR to LF.
///
/// A CR is replaced by LF where it stands and a directly following LF is
/// dropped, so the output of one read never exceeds its input and the
/// conversion can run in place.
pub struct NewlineNormalizer<R> {
    inner: R,
    skip_lf: bool,
}

impl<R: Read> NewlineNormalizer<R> {
    /// Normalize line endings read from `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            skip_lf: false,
        }
    }
}

impl<R: Read> Read for NewlineNormalizer<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut written = 0;
            for i in 0..n {
                let b = buf[i];
                if std::mem::take(&mut self.skip_lf) && b == b'\n' {
                    continue;
                }
                if b == b'\r' {
                    buf[written] = b'\n';
                    self.skip_lf = true;
                } else {
                    buf[written] = b;
                }
                written += 1;
            }
            // Only a lone LF after a chunk-final CR yields nothing.
            if written > 0 {
                return Ok(written);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(mut r: impl Read) -> Vec<u8> {
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::Uuencode);
        assert_eq!(
            TransferEncoding::parse("x-gzip"),
            TransferEncoding::Other("x-gzip".into())
        );
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let input = b"SGVsbG8s\r\nIFdvcmxk\r\nIQ==\r\n";
        assert_eq!(read_all(Base64Decoder::new(&input[..])), b"Hello, World!");
    }

    #[test]
    fn test_base64_missing_padding() {
        assert_eq!(read_all(Base64Decoder::new(&b"SGk"[..])), b"Hi");
    }

    #[test]
    fn test_base64_concatenated_padded_blocks() {
        assert_eq!(read_all(Base64Decoder::new(&b"SGk=SGk="[..])), b"HiHi");
        assert_eq!(read_all(Base64Decoder::new(&b"SA==\r\nSGk=\r\n"[..])), b"HHi");
    }

    #[test]
    fn test_base64_ignores_garbage() {
        assert_eq!(read_all(Base64Decoder::new(&b"SG*Vs\tbG8"[..])), b"Hello");
    }

    #[test]
    fn test_base64_across_chunks() {
        let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&payload);
        let wrapped: Vec<u8> = encoded
            .as_bytes()
            .chunks(76)
            .flat_map(|l| l.iter().copied().chain(*b"\r\n"))
            .collect();
        assert_eq!(read_all(Base64Decoder::new(&wrapped[..])), payload);
    }

    #[test]
    fn test_qp_soft_breaks_and_escapes() {
        let input = b"H=C3=A9llo=\r\n W=\r\norld\r\nnext   \r\n";
        assert_eq!(
            read_all(QuotedPrintableDecoder::new(&input[..])),
            "Héllo World\r\nnext\r\n".as_bytes()
        );
    }

    #[test]
    fn test_qp_invalid_escape_kept() {
        assert_eq!(
            read_all(QuotedPrintableDecoder::new(&b"a=ZZb=4"[..])),
            b"a=ZZb=4"
        );
    }

    #[test]
    fn test_uudecode() {
        let input = b"begin 644 cat.txt\n#0V%T\n`\nend\n";
        assert_eq!(read_all(UuDecoder::new(&input[..])), b"Cat");
    }

    #[test]
    fn test_uudecode_without_begin() {
        assert!(read_all(UuDecoder::new(&b"#0V%T\n"[..])).is_empty());
    }

    #[test]
    fn test_newline_normalizer() {
        let input = b"a\r\nb\rc\nd\r";
        assert_eq!(read_all(NewlineNormalizer::new(&input[..])), b"a\nb\nc\nd\n");
    }

    #[test]
    fn test_newline_normalizer_cr_at_chunk_end() {
        let chained = (&b"a\r"[..]).chain(&b"bc"[..]);
        assert_eq!(read_all(NewlineNormalizer::new(chained)), b"a\nbc");

        let chained = (&b"a\r"[..]).chain(&b"\nb"[..]);
        assert_eq!(read_all(NewlineNormalizer::new(chained)), b"a\nb");
    }

    #[test]
    fn test_newline_normalizer_one_byte_reads() {
        let mut normalizer = NewlineNormalizer::new(&b"x\r\r\ny\r"[..]);
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while normalizer.read(&mut byte).unwrap() == 1 {
            out.push(byte[0]);
        }
        assert_eq!(out, b"x\n\ny\n");
    }

    #[test]
    fn test_decoder_for_unknown_is_identity() {
        let enc = TransferEncoding::Other("x-weird".into());
        assert_eq!(read_all(decoder_for(&enc, &b"=41"[..])), b"=41");
    }
}
