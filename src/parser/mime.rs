//! Part tree builder.
//!
//! Walks the source once, recording byte ranges instead of copying content.
//! Multipart bodies are split on delimiter lines (`--boundary` and
//! `--boundary--` at the start of a line), `message/rfc822` bodies recurse
//! into one embedded entity. Structural damage never fails the parse: a
//! missing boundary or delimiter turns the part into a leaf, and a missing
//! closing delimiter lets the last child run to the end of its parent.

use std::ops::Range;

use memchr::{memchr, memmem};
use tracing::{debug, warn};

use crate::decode::charset::TextConverter;
use crate::model::content_type::ContentType;
use crate::model::header::Headers;
use crate::model::part::{Body, Part, PartId};
use crate::parser::eml::{read_header_block, skip_leading_noise};
use crate::parser::ParseOptions;

/// Build the part tree for `data`. The root is always [`PartId::ROOT`].
pub fn parse_tree(data: &[u8], options: &ParseOptions, converter: &dyn TextConverter) -> Vec<Part> {
    let start = skip_leading_noise(data, options.strip_mbox_from_line);
    let mut builder = TreeBuilder {
        data,
        options,
        converter,
        parts: Vec::new(),
    };
    let default_type = ContentType::default_text(&options.default_charset);
    builder.parse_entity(start..data.len(), None, 0, default_type);
    debug!(parts = builder.parts.len(), len = data.len(), "Parsed part tree");
    builder.parts
}

struct TreeBuilder<'a> {
    data: &'a [u8],
    options: &'a ParseOptions,
    converter: &'a dyn TextConverter,
    parts: Vec<Part>,
}

impl TreeBuilder<'_> {
    fn parse_entity(
        &mut self,
        range: Range<usize>,
        parent: Option<PartId>,
        depth: usize,
        default_type: ContentType,
    ) -> PartId {
        let block = read_header_block(self.data, range.start, range.end);
        let content_type = self.content_type_of(&block.headers, &default_type);
        let body = block.body_start..range.end;

        let id = PartId(self.parts.len());
        self.parts.push(Part {
            headers: block.headers,
            content_type: content_type.clone(),
            default_type,
            body: Body::Source(body.clone()),
            children: Vec::new(),
            parent,
            boundary: None,
            range: Some(range),
            dirty: false,
        });

        let nests = content_type.is_multipart() || content_type.is_embedded_message();
        if nests && depth >= self.options.max_depth {
            warn!(
                depth,
                content_type = %content_type.essence(),
                "Nesting limit reached, treating part as leaf"
            );
            return id;
        }

        if content_type.is_multipart() {
            self.parse_multipart(id, &content_type, body, depth);
        } else if content_type.is_embedded_message() {
            if !self.parts[id.0].transfer_encoding().is_identity() {
                debug!("Encoded message/rfc822 body kept as leaf");
                return id;
            }
            let child_type = ContentType::default_text(&self.options.default_charset);
            let child = self.parse_entity(body, Some(id), depth + 1, child_type);
            self.parts[id.0].children.push(child);
        }
        id
    }

    fn parse_multipart(
        &mut self,
        id: PartId,
        content_type: &ContentType,
        body: Range<usize>,
        depth: usize,
    ) {
        let Some(boundary) = content_type.boundary() else {
            debug!(content_type = %content_type.essence(), "Multipart without boundary, treating as leaf");
            return;
        };
        let split = split_multipart(self.data, body, boundary);
        if split.children.is_empty() {
            debug!(boundary, "No delimiter lines found, treating multipart as leaf");
            return;
        }
        if !split.terminated {
            warn!(boundary, "Multipart has no closing delimiter, last part runs to end");
        }

        self.parts[id.0].boundary = Some(boundary.to_string());
        let child_default = if content_type.sub_type == "digest" {
            ContentType::message_rfc822()
        } else {
            ContentType::default_text(&self.options.default_charset)
        };
        for range in split.children {
            let child = self.parse_entity(range, Some(id), depth + 1, child_default.clone());
            self.parts[id.0].children.push(child);
        }
    }

    fn content_type_of(&self, headers: &Headers, default_type: &ContentType) -> ContentType {
        headers
            .get("Content-Type")
            .and_then(|h| h.parsed(self.converter).as_parameterized())
            .and_then(ContentType::from_parameterized)
            .unwrap_or_else(|| default_type.clone())
    }
}

/// Child ranges of a multipart body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MultipartSplit {
    /// One range per child, excluding delimiter lines and the line break
    /// that precedes each delimiter.
    pub children: Vec<Range<usize>>,
    /// Whether a closing `--boundary--` line was found.
    pub terminated: bool,
}

struct Delimiter {
    line_start: usize,
    line_end: usize,
    closing: bool,
}

/// Split `data[body]` on the delimiter lines of `boundary`.
///
/// Only lines that begin with `--boundary` and carry nothing after it but
/// an optional `--` and trailing whitespace count. Preamble and epilogue
/// are dropped.
pub fn split_multipart(data: &[u8], body: Range<usize>, boundary: &str) -> MultipartSplit {
    let body_start = body.start;
    let hay = &data[body];
    let marker = format!("--{boundary}");

    let mut delimiters = Vec::new();
    for pos in memmem::find_iter(hay, marker.as_bytes()) {
        if pos != 0 && hay[pos - 1] != b'\n' {
            continue;
        }
        let after = pos + marker.len();
        let line_end = memchr(b'\n', &hay[after..]).map_or(hay.len(), |i| after + i + 1);
        let closing = match trim_trailing_ws(&hay[after..line_end]) {
            b"" => false,
            b"--" => true,
            _ => continue,
        };
        delimiters.push(Delimiter {
            line_start: pos,
            line_end,
            closing,
        });
        if closing {
            break;
        }
    }

    let mut split = MultipartSplit::default();
    for (i, delim) in delimiters.iter().enumerate() {
        if delim.closing {
            split.terminated = true;
            break;
        }
        let start = delim.line_end;
        let end = match delimiters.get(i + 1) {
            Some(next) => line_break_start(hay, next.line_start).max(start),
            None => hay.len(),
        };
        split.children.push(body_start + start..body_start + end);
    }
    split
}

/// Start of the CRLF or LF ending right before `pos`.
fn line_break_start(hay: &[u8], pos: usize) -> usize {
    if pos >= 2 && &hay[pos - 2..pos] == b"\r\n" {
        pos - 2
    } else if pos >= 1 && hay[pos - 1] == b'\n' {
        pos - 1
    } else {
        pos
    }
}

fn trim_trailing_ws(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::charset::EncodingRsConverter;

    fn tree(data: &[u8]) -> Vec<Part> {
        parse_tree(data, &ParseOptions::default(), &EncodingRsConverter)
    }

    fn child_bytes<'a>(data: &'a [u8], split: &MultipartSplit, i: usize) -> &'a [u8] {
        &data[split.children[i].clone()]
    }

    #[test]
    fn test_split_basic() {
        let body = b"preamble\r\n--b\r\nA: 1\r\n\r\none\r\n--b\r\n\r\ntwo\r\n--b--\r\nepilogue\r\n";
        let split = split_multipart(body, 0..body.len(), "b");
        assert!(split.terminated);
        assert_eq!(split.children.len(), 2);
        assert_eq!(child_bytes(body, &split, 0), b"A: 1\r\n\r\none");
        assert_eq!(child_bytes(body, &split, 1), b"\r\ntwo");
    }

    #[test]
    fn test_split_ignores_mid_line_and_longer_markers() {
        let body = b"--b\nx --b y\n--bb\n--b  \nsecond\n--b--\n";
        let split = split_multipart(body, 0..body.len(), "b");
        assert_eq!(split.children.len(), 2);
        assert_eq!(child_bytes(body, &split, 0), b"x --b y\n--bb");
        assert_eq!(child_bytes(body, &split, 1), b"second");
    }

    #[test]
    fn test_split_truncated() {
        let body = b"--b\r\n\r\nfirst\r\n--b\r\n\r\ncut off";
        let split = split_multipart(body, 0..body.len(), "b");
        assert!(!split.terminated);
        assert_eq!(child_bytes(body, &split, 1), b"\r\ncut off");
    }

    #[test]
    fn test_split_no_delimiters() {
        let split = split_multipart(b"nothing here", 0..12, "b");
        assert!(split.children.is_empty());
    }

    #[test]
    fn test_tree_shape() {
        let data = b"Content-Type: multipart/mixed; boundary=outer\r\n\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\r\n\
--inner\r\nContent-Type: text/plain\r\n\r\nplain\r\n\
--inner\r\nContent-Type: text/html\r\n\r\n<p>html</p>\r\n\
--inner--\r\n\
--outer\r\nContent-Type: image/png\r\n\r\nPNG\r\n\
--outer--\r\n";
        let parts = tree(data);
        let types: Vec<String> = parts.iter().map(|p| p.content_type().essence()).collect();
        assert_eq!(
            types,
            vec!["multipart/mixed", "multipart/alternative", "text/plain", "text/html", "image/png"]
        );
        assert_eq!(parts[0].children(), &[PartId(1), PartId(4)]);
        assert_eq!(parts[2].parent(), Some(PartId(1)));
        assert_eq!(parts[0].boundary(), Some("outer"));
        let html = parts[3].content_range().unwrap();
        assert_eq!(&data[html], b"<p>html</p>");
    }

    #[test]
    fn test_default_type() {
        let parts = tree(b"Subject: x\r\n\r\nbody");
        assert!(parts[0].content_type().is("text/plain"));
        assert_eq!(parts[0].content_type().charset(), Some("us-ascii"));
    }

    #[test]
    fn test_multipart_without_boundary_is_leaf() {
        let parts = tree(b"Content-Type: multipart/mixed\r\n\r\n--x\r\n\r\nbody\r\n--x--\r\n");
        assert_eq!(parts.len(), 1);
        assert!(parts[0].children().is_empty());
    }

    #[test]
    fn test_embedded_message() {
        let data = b"Content-Type: message/rfc822\r\n\r\nSubject: inner\r\n\r\nhello";
        let parts = tree(data);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].headers().value("subject").as_deref(), Some("inner"));
        assert_eq!(&data[parts[1].content_range().unwrap()], b"hello");
    }

    #[test]
    fn test_digest_children_default_to_message() {
        let data = b"Content-Type: multipart/digest; boundary=d\r\n\r\n--d\r\n\r\nSubject: one\r\n\r\nbody\r\n--d--\r\n";
        let parts = tree(data);
        assert!(parts[1].content_type().is("message/rfc822"));
        assert_eq!(parts[2].headers().value("subject").as_deref(), Some("one"));
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions {
            max_depth: 0,
            ..ParseOptions::default()
        };
        let data = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nx\r\n--b--\r\n";
        let parts = parse_tree(data, &options, &EncodingRsConverter);
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_sibling_ranges_ordered_and_enclosed() {
        let data = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\n1\r\n--b\r\n\r\n2\r\n--b\r\n\r\n3\r\n--b--\r\n";
        let parts = tree(data);
        let root = parts[0].source_range().unwrap();
        let mut last_end = 0;
        for child in parts[0].children() {
            let r = parts[child.index()].source_range().unwrap();
            assert!(r.start >= last_end && r.start >= root.start && r.end <= root.end);
            last_end = r.end;
        }
    }
}
