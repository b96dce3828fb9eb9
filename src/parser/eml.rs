//! Header blocks of a single RFC 5322 entity.
//!
//! An entity is a run of header lines, a blank line, then the body. The
//! same reader serves the top-level message and every nested part.

use std::ops::Range;

use memchr::memchr;

use crate::model::header::{Header, Headers};
use crate::parser::header::HeaderClass;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Headers of one entity and where its body begins.
#[derive(Debug)]
pub(crate) struct HeaderBlock {
    pub headers: Headers,
    pub body_start: usize,
}

/// Offset of the first header line, past a UTF-8 BOM and, if asked, an
/// mbox `From ` separator line.
pub(crate) fn skip_leading_noise(data: &[u8], strip_from_line: bool) -> usize {
    let mut offset = 0;
    if data.starts_with(UTF8_BOM) {
        offset = UTF8_BOM.len();
    }
    if strip_from_line && data[offset..].starts_with(b"From ") {
        if let Some(pos) = memchr(b'\n', &data[offset..]) {
            offset += pos + 1;
        }
    }
    offset
}

struct PendingHeader {
    name: String,
    raw: Vec<u8>,
    range: Range<usize>,
    keep_folds: bool,
    /// End of the last line's content, before its terminator.
    content_end: usize,
}

/// Read the header block of the entity at `data[start..end]`.
///
/// Continuation lines are joined with a single space, except for
/// parameterized headers which keep the fold bytes. Lines without a colon
/// are skipped. When the first line is not a header at all, the entity has
/// no headers and the body starts right away. Without a blank line the
/// body is empty.
pub(crate) fn read_header_block(data: &[u8], start: usize, end: usize) -> HeaderBlock {
    let mut headers = Headers::new();
    let mut current: Option<PendingHeader> = None;
    let mut pos = start;
    let mut body_start = end;

    while pos < end {
        let line_end = memchr(b'\n', &data[pos..end]).map_or(end, |i| pos + i + 1);
        let content = trim_eol(&data[pos..line_end]);

        if content.is_empty() {
            body_start = line_end;
            break;
        }

        if matches!(content[0], b' ' | b'\t') {
            if let Some(h) = current.as_mut() {
                if h.keep_folds {
                    h.raw.extend_from_slice(&data[h.content_end..pos]);
                    h.raw.extend_from_slice(content);
                } else {
                    h.raw.push(b' ');
                    h.raw.extend_from_slice(trim_ascii(content));
                }
                h.range.end = line_end;
                h.content_end = pos + content.len();
            }
        } else if let Some(name) = header_name(content) {
            if let Some(done) = current.take() {
                headers.push(finish(done));
            }
            let keep_folds = HeaderClass::for_name(&name) == HeaderClass::Parameterized;
            let colon = memchr(b':', content).unwrap_or(content.len());
            current = Some(PendingHeader {
                name,
                raw: content[(colon + 1).min(content.len())..].to_vec(),
                range: pos..line_end,
                keep_folds,
                content_end: pos + content.len(),
            });
        } else if pos == start {
            body_start = start;
            break;
        }
        pos = line_end;
    }

    if let Some(done) = current.take() {
        headers.push(finish(done));
    }
    HeaderBlock {
        headers,
        body_start,
    }
}

fn finish(pending: PendingHeader) -> Header {
    Header::from_source(pending.name, pending.raw, pending.range)
}

/// Header name of a line, if it looks like `Name: value`.
fn header_name(line: &[u8]) -> Option<String> {
    let colon = memchr(b':', line)?;
    let name = trim_ascii(&line[..colon]);
    let valid = !name.is_empty() && name.iter().all(|&b| (33..=126).contains(&b));
    valid.then(|| String::from_utf8_lossy(name).into_owned())
}

pub(crate) fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
