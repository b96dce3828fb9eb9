//! Lazy content decode pipeline.
//!
//! A [`ContentStream`] pulls bytes from a part's stored range through up to
//! three stages: transfer decoding, charset conversion to UTF-8, and
//! newline normalization. Nothing is decoded until the stream is read, and
//! [`ContentStream::rewind`] rebuilds the pipeline from the start of the
//! range.

pub mod charset;
pub mod transfer;

use std::io::{self, Read};
use std::ops::Range;
use std::sync::Arc;

use crate::store::source::ByteSource;

pub use charset::{EncodingRsConverter, TextConverter, TextDecoder};
pub use transfer::TransferEncoding;

/// Where a part's encoded bytes live.
#[derive(Debug, Clone)]
pub enum RawBytes {
    /// A range of the original source.
    Source {
        source: ByteSource,
        range: Range<usize>,
    },
    /// Bytes not backed by the source.
    Owned(Arc<[u8]>),
}

impl RawBytes {
    /// The bytes themselves.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Source { source, range } => source.slice(range.clone()),
            Self::Owned(buf) => buf,
        }
    }

    /// A reader positioned at the first byte.
    pub fn reader(&self) -> RawReader {
        RawReader {
            raw: self.clone(),
            pos: 0,
        }
    }
}

/// Owned reader over [`RawBytes`]; each one tracks its own position.
pub struct RawReader {
    raw: RawBytes,
    pos: usize,
}

impl Read for RawReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.raw.as_slice();
        let rest = bytes.get(self.pos..).unwrap_or_default();
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Which stages a [`ContentStream`] applies.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Content-Transfer-Encoding to remove.
    pub transfer_encoding: TransferEncoding,
    /// Convert from this charset to UTF-8. `None` reads binary content.
    pub charset: Option<String>,
    /// Turn CRLF and lone CR into LF.
    pub normalize_newlines: bool,
}

/// Rewindable decoded view of one part's content.
pub struct ContentStream {
    raw: RawBytes,
    options: DecodeOptions,
    converter: Arc<dyn TextConverter>,
    reader: Box<dyn Read>,
}

impl ContentStream {
    /// Build a pipeline over `raw`.
    pub fn new(raw: RawBytes, options: DecodeOptions, converter: Arc<dyn TextConverter>) -> Self {
        let reader = build_pipeline(&raw, &options, converter.as_ref());
        Self {
            raw,
            options,
            converter,
            reader,
        }
    }

    /// Stages in effect for this stream.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Restart decoding from the beginning of the range.
    pub fn rewind(&mut self) {
        self.reader = build_pipeline(&self.raw, &self.options, self.converter.as_ref());
    }

    /// Read everything left in the stream.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.reader.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Read everything left as text. Bytes that are not UTF-8 are replaced.
    pub fn read_text(&mut self) -> io::Result<String> {
        let bytes = self.read_all()?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

impl Read for ContentStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream")
            .field("raw_len", &self.raw.as_slice().len())
            .field("options", &self.options)
            .finish()
    }
}

fn build_pipeline(
    raw: &RawBytes,
    options: &DecodeOptions,
    converter: &dyn TextConverter,
) -> Box<dyn Read> {
    let mut reader = transfer::decoder_for(&options.transfer_encoding, raw.reader());
    if let Some(charset) = &options.charset {
        reader = Box::new(CharsetReader::new(reader, converter.decoder(charset)));
    }
    if options.normalize_newlines {
        reader = Box::new(transfer::NewlineNormalizer::new(reader));
    }
    reader
}

/// Charset stage: bytes in, UTF-8 out.
struct CharsetReader<R> {
    inner: R,
    decoder: Box<dyn TextDecoder>,
    text: String,
    pos: usize,
    eof: bool,
}

impl<R: Read> CharsetReader<R> {
    fn new(inner: R, decoder: Box<dyn TextDecoder>) -> Self {
        Self {
            inner,
            decoder,
            text: String::new(),
            pos: 0,
            eof: false,
        }
    }
}

impl<R: Read> Read for CharsetReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.text.len() {
            if self.eof {
                return Ok(0);
            }
            self.text.clear();
            self.pos = 0;
            let mut chunk = [0u8; 8 * 1024];
            let n = self.inner.read(&mut chunk)?;
            self.eof = n == 0;
            self.decoder.decode(&chunk[..n], &mut self.text, self.eof);
        }
        let pending = &self.text.as_bytes()[self.pos..];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.pos += n;
        Ok(n)
    }
}
