//! Serialize a part tree back into RFC 5322 / MIME bytes.
//!
//! Clean parts read from a source are copied verbatim. Dirty parts are
//! rebuilt: unmodified headers keep their original bytes, edited ones are
//! folded again, and decoded content is transfer-encoded once more.

use std::borrow::Cow;

use memchr::memmem;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::export::encode::{encode_body, fold_header, normalize_crlf};
use crate::export::WriteOptions;
use crate::model::header::Header;
use crate::model::message::Message;
use crate::model::part::{Body, Part, PartId};

/// Random characters appended to the boundary prefix.
const BOUNDARY_RANDOM_LEN: usize = 24;

/// Renders parts of one message.
pub(crate) struct PartWriter<'m> {
    msg: &'m Message,
    options: &'m WriteOptions,
}

impl<'m> PartWriter<'m> {
    pub fn new(msg: &'m Message, options: &'m WriteOptions) -> Self {
        Self { msg, options }
    }

    /// Bytes of part `id` (headers and body).
    pub fn render(&self, id: PartId) -> Result<Cow<'m, [u8]>> {
        let part = self.msg.node(id)?;
        if !part.is_dirty() {
            if let Some(range) = part.source_range() {
                return Ok(Cow::Borrowed(self.msg.source().slice(range)));
            }
        }

        let mut out = Vec::new();
        if part.is_container() && part.content_type().is_multipart() {
            let children = part
                .children()
                .iter()
                .map(|c| self.render(*c))
                .collect::<Result<Vec<_>>>()?;
            let boundary = self.choose_boundary(part, &children);
            let content_type = (part.boundary() != Some(boundary.as_str())
                || part.content_type().boundary() != Some(boundary.as_str()))
            .then(|| {
                let mut ct = part.content_type().clone();
                ct.set_param("boundary", boundary.as_str());
                ct.to_string()
            });
            self.write_headers(part, content_type.as_deref(), &mut out);
            out.extend_from_slice(b"\r\n");
            for child in &children {
                out.extend_from_slice(b"--");
                out.extend_from_slice(boundary.as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(child);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"--");
            out.extend_from_slice(boundary.as_bytes());
            out.extend_from_slice(b"--\r\n");
        } else if let Some(&child) = part.children().first() {
            // Embedded message
            self.write_headers(part, None, &mut out);
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&self.render(child)?);
        } else {
            self.write_headers(part, None, &mut out);
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&self.leaf_body(id, part));
        }
        Ok(Cow::Owned(out))
    }

    fn leaf_body(&self, id: PartId, part: &Part) -> Cow<'m, [u8]> {
        match &part.body {
            Body::Source(range) => Cow::Borrowed(self.msg.source().slice(range.clone())),
            Body::Decoded(bytes) => {
                let filename = self.msg.filename(id).unwrap_or_else(|| "attachment".into());
                Cow::Owned(encode_body(&part.transfer_encoding(), bytes, &filename))
            }
        }
    }

    fn write_headers(&self, part: &Part, content_type: Option<&str>, out: &mut Vec<u8>) {
        let mut content_type = content_type;
        for header in part.headers().iter() {
            if header.is("Content-Type") {
                if let Some(ct) = content_type.take() {
                    out.extend_from_slice(&fold_header(header.name(), ct, self.options.line_length));
                    continue;
                }
            }
            self.write_header(header, out);
        }
        if let Some(ct) = content_type {
            out.extend_from_slice(&fold_header("Content-Type", ct, self.options.line_length));
        }
    }

    fn write_header(&self, header: &Header, out: &mut Vec<u8>) {
        match header.source_range() {
            Some(range) if !header.is_modified() => {
                let raw = normalize_crlf(self.msg.source().slice(range));
                out.extend_from_slice(&raw);
                if !raw.ends_with(b"\r\n") {
                    out.extend_from_slice(b"\r\n");
                }
            }
            _ => out.extend_from_slice(&fold_header(
                header.name(),
                &header.value(),
                self.options.line_length,
            )),
        }
    }

    /// Keep the part's boundary unless a child line starts with it.
    fn choose_boundary(&self, part: &Part, children: &[Cow<'_, [u8]>]) -> String {
        let existing = part.boundary().or_else(|| part.content_type().boundary());
        if let Some(b) = existing {
            if !collides(b, children) {
                return b.to_string();
            }
            debug!(boundary = b, "Boundary occurs in part content, generating a new one");
        }
        loop {
            let candidate = generate_boundary(&self.options.boundary_prefix);
            if !collides(&candidate, children) {
                return candidate;
            }
        }
    }
}

/// A fresh boundary: `prefix` plus random alphanumerics.
pub fn generate_boundary(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{prefix}{suffix}")
}

/// `true` when any line of `children` begins with `--boundary`.
pub fn collides(boundary: &str, children: &[Cow<'_, [u8]>]) -> bool {
    let marker = format!("--{boundary}");
    let line_marker = format!("\n{marker}");
    children.iter().any(|child| {
        child.starts_with(marker.as_bytes())
            || memmem::find(child, line_marker.as_bytes()).is_some()
    })
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        sanitized
    }
}
